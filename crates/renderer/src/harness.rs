//! The frame-loop harness.
//!
//! [`Harness::initialize`] runs the context initializer and the static
//! resource binder in order, then [`Harness::start`] enters the rendering
//! state. From there every [`Harness::tick`] measures the frame interval,
//! feeds the bounce uniform, clears, draws the quad and asks the scheduler
//! for the next tick.

use tracing::{debug, error, info, trace, warn};

use crate::device::RenderDevice;
use crate::error::{FrameError, HarnessError};
use crate::feed::{ControlSource, UniformFeed};
use crate::quad::{StaticQuad, QUAD_COMPONENTS};
use crate::schedule::{CancellationToken, TickScheduler};
use crate::sources::ShaderSources;
use crate::timing::{Clock, FpsCell, FrameClock, FrameSample};
use crate::types::{
    AttributeLayout, ClearTargets, Viewport, DEFAULT_BOUNCE_UNIFORM, DEFAULT_POSITION_ATTRIBUTE,
};

/// Lifecycle of the harness. `Rendering` has no exit transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessPhase {
    Uninitialized,
    ContextAcquired,
    ResourcesBound,
    Rendering,
}

/// Names of the two program interface points the harness drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBindings {
    pub position_attribute: String,
    pub bounce_uniform: String,
}

impl Default for ProgramBindings {
    fn default() -> Self {
        Self {
            position_attribute: DEFAULT_POSITION_ATTRIBUTE.to_string(),
            bounce_uniform: DEFAULT_BOUNCE_UNIFORM.to_string(),
        }
    }
}

/// External collaborators the harness polls.
pub struct HarnessPorts {
    pub clock: Box<dyn Clock>,
    pub control: Box<dyn ControlSource>,
}

pub struct Harness<D: RenderDevice> {
    device: D,
    phase: HarnessPhase,
    viewport: Viewport,
    quad: StaticQuad,
    feed: UniformFeed,
    clock: Box<dyn Clock>,
    frame_clock: FrameClock,
    cancel: CancellationToken,
    frames: u64,
}

impl<D: RenderDevice> Harness<D> {
    /// Acquires the context through `acquire`, loads the program and binds
    /// the static quad.
    ///
    /// Any error halts initialisation before later steps run; in
    /// particular a failed acquisition means no draw is ever issued.
    pub fn initialize<F>(
        acquire: F,
        sources: &ShaderSources,
        ports: HarnessPorts,
        bindings: &ProgramBindings,
    ) -> Result<Self, HarnessError>
    where
        F: FnOnce() -> Result<D, HarnessError>,
    {
        let mut phase = HarnessPhase::Uninitialized;
        trace!(?phase, "initialising harness");

        let mut device = acquire()?;
        let interface = device.load_program(sources)?;
        let viewport = Viewport::covering(device.surface_size());
        device.set_viewport(viewport);
        phase = HarnessPhase::ContextAcquired;
        debug!(
            ?phase,
            width = viewport.width,
            height = viewport.height,
            "rendering context acquired"
        );

        let quad = StaticQuad::new();
        device.upload_static_vertices(quad.vertices())?;
        let location = interface
            .attribute_location(&bindings.position_attribute)
            .ok_or_else(|| HarnessError::MissingAttribute {
                name: bindings.position_attribute.clone(),
            })?;
        device.enable_attribute(location, AttributeLayout::packed(QUAD_COMPONENTS))?;
        if !interface.has_uniform(&bindings.bounce_uniform) {
            warn!(
                uniform = %bindings.bounce_uniform,
                "program does not declare the bounce uniform; writes will be ignored"
            );
        }
        phase = HarnessPhase::ResourcesBound;
        debug!(?phase, attribute = %bindings.position_attribute, location, "static quad bound");

        let frame_clock = FrameClock::new(ports.clock.now_ms());
        Ok(Self {
            device,
            phase,
            viewport,
            quad,
            feed: UniformFeed::new(ports.control, bindings.bounce_uniform.clone()),
            clock: ports.clock,
            frame_clock,
            cancel: CancellationToken::new(),
            frames: 0,
        })
    }

    /// Enters the rendering state and requests the first tick.
    pub fn start(&mut self, scheduler: &mut dyn TickScheduler) {
        if self.phase == HarnessPhase::Rendering {
            return;
        }
        self.phase = HarnessPhase::Rendering;
        info!(
            width = self.viewport.width,
            height = self.viewport.height,
            "render loop started"
        );
        scheduler.schedule_next();
    }

    /// Runs one frame. Returns `None` without touching the device when the
    /// loop is not rendering or has been cancelled.
    pub fn tick(&mut self, scheduler: &mut dyn TickScheduler) -> Option<FrameSample> {
        if self.phase != HarnessPhase::Rendering || self.cancel.is_cancelled() {
            return None;
        }

        let sample = self.frame_clock.advance(self.clock.now_ms());
        let bounces = self.feed.push(&mut self.device);
        self.device.clear(ClearTargets::COLOR_AND_DEPTH);
        if let Err(err) = self
            .device
            .draw_triangle_strip(0, self.quad.vertex_count())
        {
            self.handle_frame_error(err);
        }
        self.frames += 1;
        trace!(
            frame = self.frames,
            delta_ms = sample.delta_ms,
            fps = sample.fps,
            bounces,
            "frame"
        );

        if !self.cancel.is_cancelled() {
            scheduler.schedule_next();
        }
        Some(sample)
    }

    fn handle_frame_error(&mut self, err: FrameError) {
        match err {
            FrameError::SurfaceLost | FrameError::SurfaceOutdated => {
                debug!(error = %err, "reconfiguring surface");
                self.device.recover();
            }
            FrameError::Timeout => {
                debug!("surface timeout; retrying next frame");
            }
            FrameError::OutOfMemory => {
                error!("surface out of memory; frame dropped");
            }
            other => {
                warn!(error = %other, "frame dropped; retrying next frame");
            }
        }
    }

    pub fn phase(&self) -> HarnessPhase {
        self.phase
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Reader handle for the latest instantaneous rate.
    pub fn fps(&self) -> FpsCell {
        self.frame_clock.fps()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
