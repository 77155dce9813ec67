use std::path::PathBuf;

use anyhow::{Context, Result};
use mirror_renderer::{GpuPowerPreference, ShaderSources, SurfaceSize};
use serde::Serialize;

const BUNDLED_VERTEX: &str = include_str!("../shaders/mirror_room.vert");
const BUNDLED_FRAGMENT: &str = include_str!("../shaders/mirror_room.frag");

pub fn parse_surface_size(spec: &str) -> Result<SurfaceSize> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1024x768"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok(SurfaceSize::new(width, height))
}

pub fn parse_power(value: &str) -> Result<GpuPowerPreference> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" => Ok(GpuPowerPreference::High),
        other => anyhow::bail!("unknown GPU power preference '{other}' (expected low or high)"),
    }
}

pub fn power_name(power: GpuPowerPreference) -> &'static str {
    match power {
        GpuPowerPreference::Low => "low",
        GpuPowerPreference::High => "high",
    }
}

/// Where the two shader stages come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShaderOrigin {
    Files {
        vertex: PathBuf,
        fragment: PathBuf,
    },
    Page {
        page: PathBuf,
        vertex_id: String,
        fragment_id: String,
    },
    Bundled,
}

impl ShaderOrigin {
    pub fn load(&self) -> Result<ShaderSources> {
        match self {
            ShaderOrigin::Files { vertex, fragment } => ShaderSources::from_files(vertex, fragment)
                .context("failed to load shader stages"),
            ShaderOrigin::Page {
                page,
                vertex_id,
                fragment_id,
            } => ShaderSources::from_page(page, vertex_id, fragment_id)
                .context("failed to extract shader stages from page"),
            ShaderOrigin::Bundled => Ok(bundled_sources()),
        }
    }
}

/// The mirror-room demo compiled into the binary.
pub fn bundled_sources() -> ShaderSources {
    ShaderSources::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT)
}
