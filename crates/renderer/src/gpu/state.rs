use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::device::RenderDevice;
use crate::error::{FrameError, HarnessError};
use crate::sources::ShaderSources;
use crate::types::{
    AttributeLayout, ClearTargets, GpuPowerPreference, ProgramInterface, SurfaceSize, Viewport,
    VsyncMode,
};

use super::context::GpuContext;
use super::pipeline::{build_pipeline, EnabledAttribute, ProgramModules};
use super::uniforms::ParamBlock;

/// Clear value for the color target; GL's default clear color.
const CLEAR_COLOR: wgpu::Color = wgpu::Color::TRANSPARENT;

struct ParamBinding {
    block: ParamBlock,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// [`RenderDevice`] backed by a `wgpu` surface.
///
/// GL-style state calls (viewport, attribute enable, clear) are recorded
/// and folded into the render pass that `draw_triangle_strip` submits.
pub struct WgpuDevice {
    context: GpuContext,
    program: Option<ProgramModules>,
    params: Option<ParamBinding>,
    vertex_buffer: Option<wgpu::Buffer>,
    attributes: Vec<EnabledAttribute>,
    pipeline: Option<wgpu::RenderPipeline>,
    viewport: Viewport,
    pending_clear: ClearTargets,
}

impl WgpuDevice {
    /// Acquires a rendering context for `target`. Every failure here is
    /// reported as [`HarnessError::ContextUnavailable`].
    pub fn new<T>(
        target: &T,
        size: SurfaceSize,
        gpu_power: GpuPowerPreference,
        vsync: VsyncMode,
    ) -> Result<Self, HarnessError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, gpu_power, vsync).map_err(|err| {
            HarnessError::ContextUnavailable {
                reason: format!("{err:#}"),
            }
        })?;
        debug!(
            adapter = %context.adapter_profile.name,
            width = context.size.width,
            height = context.size.height,
            "rendering context ready"
        );
        let viewport = Viewport::covering(context.size);
        Ok(Self {
            context,
            program: None,
            params: None,
            vertex_buffer: None,
            attributes: Vec::new(),
            pipeline: None,
            viewport,
            pending_clear: ClearTargets::NONE,
        })
    }

    fn rebuild_pipeline(&mut self) -> Result<(), HarnessError> {
        let Some(modules) = self.program.as_ref() else {
            return Err(HarnessError::Pipeline {
                message: "no program loaded".to_string(),
            });
        };
        let pipeline = build_pipeline(
            &self.context.device,
            modules,
            &self.attributes,
            self.context.config.format,
            self.context.depth_format(),
        )?;
        self.pipeline = Some(pipeline);
        Ok(())
    }
}

impl RenderDevice for WgpuDevice {
    fn surface_size(&self) -> SurfaceSize {
        self.context.size
    }

    fn load_program(&mut self, sources: &ShaderSources) -> Result<ProgramInterface, HarnessError> {
        let modules = ProgramModules::new(&self.context.device, sources)?;
        let block = ParamBlock::new(self.viewport.size(), &modules.interface.uniforms);
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params buffer"),
            size: block.byte_len(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("params bind group"),
                layout: &modules.params_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
        let interface = modules.interface.clone();
        debug!(
            attributes = interface.attributes.len(),
            uniforms = ?interface.uniforms,
            "program linked"
        );
        self.params = Some(ParamBinding {
            block,
            buffer,
            bind_group,
        });
        self.program = Some(modules);
        self.attributes.clear();
        self.pipeline = None;
        Ok(interface)
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(params) = self.params.as_mut() {
            params.block.set_viewport(viewport.size());
        }
    }

    fn upload_static_vertices(&mut self, vertices: &[f32]) -> Result<(), HarnessError> {
        if self.vertex_buffer.is_some() {
            warn!("static vertex buffer already uploaded; keeping the first upload");
            return Ok(());
        }
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.vertex_buffer = Some(buffer);
        Ok(())
    }

    fn enable_attribute(&mut self, location: u32, layout: AttributeLayout) -> Result<(), HarnessError> {
        self.attributes.retain(|attribute| attribute.location != location);
        self.attributes.push(EnabledAttribute { location, layout });
        self.rebuild_pipeline()
    }

    fn set_uniform_f32(&mut self, name: &str, value: f32) {
        if let Some(params) = self.params.as_mut() {
            params.block.set(name, value);
        }
    }

    fn clear(&mut self, targets: ClearTargets) {
        self.pending_clear.color |= targets.color;
        self.pending_clear.depth |= targets.depth;
    }

    fn draw_triangle_strip(&mut self, first: u32, count: u32) -> Result<(), FrameError> {
        let (Some(pipeline), Some(params), Some(vertex_buffer)) = (
            self.pipeline.as_ref(),
            self.params.as_mut(),
            self.vertex_buffer.as_ref(),
        ) else {
            return Err(FrameError::NotReady);
        };

        if params.block.take_dirty() {
            self.context
                .queue
                .write_buffer(&params.buffer, 0, params.block.as_bytes());
        }

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        let color_load = if self.pending_clear.color {
            wgpu::LoadOp::Clear(CLEAR_COLOR)
        } else {
            wgpu::LoadOp::Load
        };
        let depth_load = if self.pending_clear.depth {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.context.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let viewport = self.viewport;
            render_pass.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &params.bind_group, &[]);
            render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            render_pass.draw(first..first + count, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.pending_clear = ClearTargets::NONE;
        Ok(())
    }

    fn recover(&mut self) {
        debug!(
            width = self.context.config.width,
            height = self.context.config.height,
            "reconfiguring surface"
        );
        self.context.reconfigure();
    }
}
