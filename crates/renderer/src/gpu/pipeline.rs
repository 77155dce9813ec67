use wgpu::naga::ShaderStage;

use crate::compile::{compile_stage, prepare_program, PreparedProgram};
use crate::error::HarnessError;
use crate::sources::ShaderSources;
use crate::types::{AttributeLayout, ProgramInterface};

/// Compiled stages of the active program plus the layout they share.
pub(crate) struct ProgramModules {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub interface: ProgramInterface,
    pub params_layout: wgpu::BindGroupLayout,
}

impl ProgramModules {
    pub fn new(device: &wgpu::Device, sources: &ShaderSources) -> Result<Self, HarnessError> {
        let PreparedProgram {
            vertex,
            fragment,
            interface,
        } = prepare_program(sources)?;
        tracing::trace!(%vertex, "rewritten vertex stage");
        tracing::trace!(%fragment, "rewritten fragment stage");

        let vertex = compile_stage(device, ShaderStage::Vertex, &vertex)?;
        let fragment = compile_stage(device, ShaderStage::Fragment, &fragment)?;

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("params layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        Ok(Self {
            vertex,
            fragment,
            interface,
            params_layout,
        })
    }
}

/// One enabled vertex attribute sourced from the static vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EnabledAttribute {
    pub location: u32,
    pub layout: AttributeLayout,
}

impl EnabledAttribute {
    fn format(&self) -> Result<wgpu::VertexFormat, HarnessError> {
        match self.layout.components {
            1 => Ok(wgpu::VertexFormat::Float32),
            2 => Ok(wgpu::VertexFormat::Float32x2),
            3 => Ok(wgpu::VertexFormat::Float32x3),
            4 => Ok(wgpu::VertexFormat::Float32x4),
            other => Err(HarnessError::Pipeline {
                message: format!(
                    "attribute at location {} has {other} components; expected 1 to 4",
                    self.location
                ),
            }),
        }
    }
}

/// Builds the triangle-strip pipeline for `modules`, reading every enabled
/// attribute from vertex buffer slot 0.
pub(crate) fn build_pipeline(
    device: &wgpu::Device,
    modules: &ProgramModules,
    attributes: &[EnabledAttribute],
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline, HarnessError> {
    let stride = attributes
        .iter()
        .map(|attribute| attribute.layout.effective_stride())
        .max()
        .unwrap_or(0);
    let vertex_attributes = attributes
        .iter()
        .map(|attribute| {
            Ok(wgpu::VertexAttribute {
                format: attribute.format()?,
                offset: attribute.layout.offset,
                shader_location: attribute.location,
            })
        })
        .collect::<Result<Vec<_>, HarnessError>>()?;
    let buffers = [wgpu::VertexBufferLayout {
        array_stride: stride,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &vertex_attributes,
    }];

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("harness pipeline layout"),
        bind_group_layouts: &[&modules.params_layout],
        push_constant_ranges: &[],
    });

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("harness pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &modules.vertex,
            entry_point: Some("main"),
            buffers: &buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &modules.fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(HarnessError::Pipeline {
            message: err.to_string(),
        });
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_format_follows_component_count() {
        let attribute = EnabledAttribute {
            location: 0,
            layout: AttributeLayout::packed(2),
        };
        assert_eq!(attribute.format().ok(), Some(wgpu::VertexFormat::Float32x2));

        let wide = EnabledAttribute {
            location: 1,
            layout: AttributeLayout::packed(5),
        };
        assert!(matches!(wide.format(), Err(HarnessError::Pipeline { .. })));
    }
}
