//! Frame-loop harness for GPU ray-tracing shaders.
//!
//! The crate drives an opaque shader program (the ray tracer itself) from a
//! native window: it acquires a `wgpu` context, uploads one full-viewport
//! quad, feeds a bounce-count control into the shader every frame and
//! reports an instantaneous frame rate. The overall flow is:
//!
//! ```text
//!   HarnessConfig
//!        │
//!        ▼
//!   window::run ──▶ Harness::initialize ──▶ winit event loop
//!                        │                     │ RedrawRequested
//!                        │                     ├─▶ Harness::tick ─▶ feed, clear, draw, reschedule
//!                        │                     │ AboutToWait
//!                        │                     └─▶ FpsDisplay::poll ─▶ window title
//!                        ▼
//!                  RenderDevice (wgpu)
//! ```
//!
//! The harness only talks to the GPU through [`RenderDevice`], to the
//! control through [`ControlSource`] and to the status line through
//! [`StatusSink`]; the render tick and the status updater share a single
//! [`FpsCell`].

mod compile;
mod device;
mod display;
mod error;
mod feed;
mod gpu;
mod harness;
mod quad;
mod schedule;
mod sources;
#[cfg(test)]
mod testing;
mod timing;
mod types;
mod window;

pub use device::RenderDevice;
pub use display::{format_fps, FpsDisplay, LogSink, StatusSink};
pub use error::{FrameError, HarnessError};
pub use feed::{parse_control_value, ControlEdit, ControlField, ControlSource, UniformFeed};
pub use gpu::WgpuDevice;
pub use harness::{Harness, HarnessPhase, HarnessPorts, ProgramBindings};
pub use quad::{StaticQuad, CLIP_QUAD, QUAD_COMPONENTS, QUAD_VERTEX_COUNT};
pub use schedule::{CancellationToken, QueuedScheduler, TickScheduler};
pub use sources::{ShaderSources, DEFAULT_FRAGMENT_ID, DEFAULT_VERTEX_ID};
pub use timing::{
    instantaneous_fps, Clock, FpsCell, FrameClock, FrameSample, ManualClock, SystemClock,
};
pub use types::{
    AttributeBinding, AttributeLayout, ClearTargets, GpuPowerPreference, HarnessConfig,
    ProgramInterface, SurfaceSize, Viewport, VsyncMode, DEFAULT_BOUNCE_UNIFORM,
    DEFAULT_DISPLAY_INTERVAL, DEFAULT_POSITION_ATTRIBUTE,
};
pub use window::run;
