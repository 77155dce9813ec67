use std::time::Duration;

use crate::sources::ShaderSources;

/// Name of the vertex input the clip quad is bound to.
pub const DEFAULT_POSITION_ATTRIBUTE: &str = "vPosition";

/// Name of the scalar uniform fed from the control field every tick.
pub const DEFAULT_BOUNCE_UNIFORM: &str = "num_bounces";

/// Period of the status updater.
pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_millis(300);

/// Pixel dimensions of the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Rectangle (in pixels) the rasteriser maps clip space onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// A viewport covering the whole surface.
    pub fn covering(size: SurfaceSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

/// Describes how a float vertex attribute is pulled from the bound buffer.
///
/// A `stride` of zero means tightly packed, i.e. `components * 4` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: u32,
    pub stride: u64,
    pub offset: u64,
}

impl AttributeLayout {
    pub fn packed(components: u32) -> Self {
        Self {
            components,
            stride: 0,
            offset: 0,
        }
    }

    pub fn effective_stride(&self) -> u64 {
        if self.stride == 0 {
            u64::from(self.components) * std::mem::size_of::<f32>() as u64
        } else {
            self.stride
        }
    }
}

/// Buffers reset at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearTargets {
    pub color: bool,
    pub depth: bool,
}

impl ClearTargets {
    pub const COLOR_AND_DEPTH: ClearTargets = ClearTargets {
        color: true,
        depth: true,
    };
    pub const NONE: ClearTargets = ClearTargets {
        color: false,
        depth: false,
    };
}

/// A vertex input exposed by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    pub name: String,
    pub location: u32,
    pub components: u32,
}

/// Reflection of the interface points a linked program exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    pub attributes: Vec<AttributeBinding>,
    pub uniforms: Vec<String>,
}

impl ProgramInterface {
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.location)
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|uniform| uniform == name)
    }
}

/// Adapter selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Presentation pacing of the swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VsyncMode {
    /// Present on vertical blank; ticks are display synchronised.
    #[default]
    On,
    /// Prefer immediate/mailbox presentation for uncapped frame rates.
    Off,
}

/// Immutable configuration passed to the harness at start-up.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Window title shown before the first status update.
    pub title: String,
    /// Surface size in physical pixels; the viewport is fixed to it.
    pub surface_size: SurfaceSize,
    /// Vertex and fragment stage text.
    pub sources: ShaderSources,
    /// Initial text of the bounce-count control field.
    pub initial_bounces: String,
    /// Period of the FPS status updater.
    pub display_interval: Duration,
    /// Also write every status line to the log.
    pub echo_status: bool,
    pub position_attribute: String,
    pub bounce_uniform: String,
    pub gpu_power: GpuPowerPreference,
    pub vsync: VsyncMode,
}

impl HarnessConfig {
    pub fn new(sources: ShaderSources) -> Self {
        Self {
            title: "mirrortrace".to_string(),
            surface_size: SurfaceSize::new(1024, 768),
            sources,
            initial_bounces: "3".to_string(),
            display_interval: DEFAULT_DISPLAY_INTERVAL,
            echo_status: false,
            position_attribute: DEFAULT_POSITION_ATTRIBUTE.to_string(),
            bounce_uniform: DEFAULT_BOUNCE_UNIFORM.to_string(),
            gpu_power: GpuPowerPreference::default(),
            vsync: VsyncMode::default(),
        }
    }
}
