//! Render pipelines and the bind group layouts they share.
//!
//! Every pass renders into the same colour format (the surface's), with a
//! depth buffer, so one set of pipelines serves the offscreen targets and the
//! window alike.

use crate::{
    camera,
    data_structures::{model::Shading, texture::Texture},
};

pub mod basic;
pub mod crt;
pub mod light;
pub mod line;
pub mod standard;

pub struct Pipelines {
    pub material_layout: wgpu::BindGroupLayout,
    pub camera_layout: wgpu::BindGroupLayout,
    pub light_layout: wgpu::BindGroupLayout,
    pub crt_layout: wgpu::BindGroupLayout,
    pub standard: wgpu::RenderPipeline,
    pub basic: wgpu::RenderPipeline,
    pub crt: wgpu::RenderPipeline,
    /// Helpers that hide behind scene geometry.
    pub lines: wgpu::RenderPipeline,
    /// Gizmo handles drawn on top of everything.
    pub overlay_lines: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let material_layout = mk_material_bind_group_layout(device);
        let camera_layout = camera::mk_bind_group_layout(device);
        let light_layout = light::mk_bind_group_layout(device);
        let crt_layout = crt::mk_bind_group_layout(device);

        let standard =
            standard::mk_standard_pipeline(device, format, &material_layout, &camera_layout, &light_layout);
        let basic = basic::mk_basic_pipeline(device, format, &material_layout, &camera_layout);
        let crt = crt::mk_crt_pipeline(device, format, &material_layout, &camera_layout, &crt_layout);
        let lines = line::mk_line_pipeline(device, format, &camera_layout, false);
        let overlay_lines = line::mk_line_pipeline(device, format, &camera_layout, true);

        Self {
            material_layout,
            camera_layout,
            light_layout,
            crt_layout,
            standard,
            basic,
            crt,
            lines,
            overlay_lines,
        }
    }

    pub fn for_shading(&self, shading: Shading) -> &wgpu::RenderPipeline {
        match shading {
            Shading::Standard => &self.standard,
            Shading::Basic => &self.basic,
        }
    }
}

/// Material uniform, colour map and its sampler.
pub fn mk_material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Depth state of opaque geometry. Overlays skip the depth test and leave the
/// depth buffer untouched.
pub fn depth_state(overlay: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: Texture::DEPTH_FORMAT,
        depth_write_enabled: !overlay,
        depth_compare: if overlay {
            wgpu::CompareFunction::Always
        } else {
            wgpu::CompareFunction::Less
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    primitive: wgpu::PrimitiveState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive,
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// Back-face culled triangles, counter-clockwise front faces.
pub fn triangles() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: Some(wgpu::Face::Back),
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

pub const REPLACE: wgpu::BlendState = wgpu::BlendState {
    alpha: wgpu::BlendComponent::REPLACE,
    color: wgpu::BlendComponent::REPLACE,
};
