use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::device::RenderDevice;
use crate::display::StatusSink;
use crate::error::{FrameError, HarnessError};
use crate::sources::ShaderSources;
use crate::types::{
    AttributeBinding, AttributeLayout, ClearTargets, ProgramInterface, SurfaceSize, Viewport,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceCall {
    LoadProgram,
    Viewport(Viewport),
    Upload(Vec<f32>),
    EnableAttribute(u32, AttributeLayout),
    Uniform(String, f32),
    Clear(ClearTargets),
    Draw { first: u32, count: u32 },
    Recover,
}

/// Device fake that records every call into a log shared by its clones.
#[derive(Debug, Clone)]
pub(crate) struct RecordingDevice {
    size: SurfaceSize,
    interface: ProgramInterface,
    log: Rc<RefCell<Vec<DeviceCall>>>,
    draw_results: Rc<RefCell<VecDeque<FrameError>>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::with_size(SurfaceSize::new(512, 512))
    }

    pub fn with_size(size: SurfaceSize) -> Self {
        Self {
            size,
            interface: ProgramInterface {
                attributes: vec![AttributeBinding {
                    name: "vPosition".into(),
                    location: 0,
                    components: 2,
                }],
                uniforms: vec!["num_bounces".into()],
            },
            log: Rc::default(),
            draw_results: Rc::default(),
        }
    }

    pub fn with_interface(mut self, interface: ProgramInterface) -> Self {
        self.interface = interface;
        self
    }

    /// Queues an error for the next draw call.
    pub fn fail_next_draw(&self, error: FrameError) {
        self.draw_results.borrow_mut().push_back(error);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.log.borrow().clone()
    }

    pub fn draw_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|call| matches!(call, DeviceCall::Draw { .. }))
            .count()
    }

    pub fn uniform_writes(&self, name: &str) -> Vec<f32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Uniform(uniform, value) if uniform == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: DeviceCall) {
        self.log.borrow_mut().push(call);
    }
}

impl RenderDevice for RecordingDevice {
    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn load_program(&mut self, _sources: &ShaderSources) -> Result<ProgramInterface, HarnessError> {
        self.record(DeviceCall::LoadProgram);
        Ok(self.interface.clone())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.record(DeviceCall::Viewport(viewport));
    }

    fn upload_static_vertices(&mut self, vertices: &[f32]) -> Result<(), HarnessError> {
        self.record(DeviceCall::Upload(vertices.to_vec()));
        Ok(())
    }

    fn enable_attribute(&mut self, location: u32, layout: AttributeLayout) -> Result<(), HarnessError> {
        self.record(DeviceCall::EnableAttribute(location, layout));
        Ok(())
    }

    fn set_uniform_f32(&mut self, name: &str, value: f32) {
        self.record(DeviceCall::Uniform(name.to_string(), value));
    }

    fn clear(&mut self, targets: ClearTargets) {
        self.record(DeviceCall::Clear(targets));
    }

    fn draw_triangle_strip(&mut self, first: u32, count: u32) -> Result<(), FrameError> {
        self.record(DeviceCall::Draw { first, count });
        match self.draw_results.borrow_mut().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn recover(&mut self) {
        self.record(DeviceCall::Recover);
    }
}

/// Status sink that keeps every line it was shown.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl StatusSink for RecordingSink {
    fn show(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}
