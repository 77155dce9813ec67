use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use mirror_renderer::{GpuPowerPreference, SurfaceSize};

use crate::bootstrap::{parse_power, parse_surface_size};

#[derive(Parser, Debug, Default)]
#[command(
    name = "mirrortrace",
    author,
    version,
    about = "Real-time mirror-room ray tracer driven by a GPU fragment shader"
)]
pub struct Args {
    /// Vertex stage source file (GLSL ES / WebGL style). Requires `--fragment`.
    #[arg(long, value_name = "PATH", requires = "fragment", conflicts_with = "page")]
    pub vertex: Option<PathBuf>,

    /// Fragment stage source file. Requires `--vertex`.
    #[arg(long, value_name = "PATH", requires = "vertex")]
    pub fragment: Option<PathBuf>,

    /// HTML page holding both stages in `<script id="...">` blocks.
    #[arg(long, value_name = "PATH")]
    pub page: Option<PathBuf>,

    /// Script id of the vertex stage inside `--page`.
    #[arg(long, value_name = "ID", requires = "page")]
    pub vertex_id: Option<String>,

    /// Script id of the fragment stage inside `--page`.
    #[arg(long, value_name = "ID", requires = "page")]
    pub fragment_id: Option<String>,

    /// Surface size in pixels (e.g. `1024x768`). The window is not resizable.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size_arg)]
    pub size: Option<SurfaceSize>,

    /// Initial text of the bounce-count field. Not validated; non-numeric
    /// text feeds NaN to the shader.
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub bounces: Option<String>,

    /// Period of the FPS readout (e.g. `300ms`, `1s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_arg)]
    pub display_interval: Option<Duration>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// GPU power preference: `low` or `high`.
    #[arg(long, value_name = "PREFERENCE", value_parser = parse_power_arg)]
    pub power: Option<GpuPowerPreference>,

    /// Also write every FPS readout to the log.
    #[arg(long)]
    pub echo_fps: bool,

    /// Name of the 2-float position attribute in the vertex stage.
    #[arg(long, value_name = "NAME")]
    pub position_attribute: Option<String>,

    /// Name of the scalar bounce-count uniform.
    #[arg(long, value_name = "NAME")]
    pub bounce_uniform: Option<String>,

    /// Configuration file; defaults to `config.toml` in the user config directory.
    #[arg(long, value_name = "PATH", env = "MIRRORTRACE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the resolved configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

fn parse_size_arg(value: &str) -> Result<SurfaceSize, String> {
    parse_surface_size(value).map_err(|err| err.to_string())
}

fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| format!("invalid duration '{value}': {err}"))
}

fn parse_power_arg(value: &str) -> Result<GpuPowerPreference, String> {
    parse_power(value).map_err(|err| err.to_string())
}
