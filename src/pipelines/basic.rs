use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{depth_state, mk_render_pipeline, triangles, REPLACE},
};

/// Unlit materials: base colour times the optional map.
///
/// Whatever is bound to group 2 is not part of the layout and is ignored.
pub fn mk_basic_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    material_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Basic Pipeline Layout"),
        bind_group_layouts: &[material_layout, camera_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Basic Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("basic.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Basic Pipeline",
        &layout,
        format,
        Some(REPLACE),
        Some(depth_state(false)),
        triangles(),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
