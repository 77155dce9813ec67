//! `wgpu` backend for [`crate::device::RenderDevice`].
//!
//! - `context` owns instance/adapter/device/surface wiring, the depth target
//!   and present-mode selection.
//! - `pipeline` compiles the rewritten stages and builds the triangle-strip
//!   pipeline once the position attribute is enabled.
//! - `uniforms` mirrors the shader's parameter block on the CPU.
//! - `state` glues everything into [`WgpuDevice`].

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::WgpuDevice;
