use crate::error::{FrameError, HarnessError};
use crate::sources::ShaderSources;
use crate::types::{AttributeLayout, ClearTargets, ProgramInterface, SurfaceSize, Viewport};

/// GL-shaped view of an acquired rendering context.
///
/// The harness drives every GPU effect through this trait: the `wgpu`
/// backend lives in [`crate::gpu`], tests use a recording fake.
pub trait RenderDevice {
    /// Pixel size of the surface the context was acquired from.
    fn surface_size(&self) -> SurfaceSize;

    /// Compiles and links both stages and makes the result the active
    /// program. Returns the program's reflected interface.
    fn load_program(&mut self, sources: &ShaderSources) -> Result<ProgramInterface, HarnessError>;

    fn set_viewport(&mut self, viewport: Viewport);

    /// Allocates the vertex buffer and uploads `vertices` once, with a
    /// static usage hint.
    fn upload_static_vertices(&mut self, vertices: &[f32]) -> Result<(), HarnessError>;

    /// Enables the attribute at `location` and sources it from the vertex
    /// buffer with `layout`.
    fn enable_attribute(&mut self, location: u32, layout: AttributeLayout) -> Result<(), HarnessError>;

    /// Writes a scalar uniform on the active program. Unknown names are a
    /// no-op, like writing to a null uniform location.
    fn set_uniform_f32(&mut self, name: &str, value: f32);

    /// Marks buffers to be reset before the next draw.
    fn clear(&mut self, targets: ClearTargets);

    /// Draws `count` vertices starting at `first` as a triangle strip.
    fn draw_triangle_strip(&mut self, first: u32, count: u32) -> Result<(), FrameError>;

    /// Rebuilds presentation state after a lost or outdated surface.
    fn recover(&mut self);
}
