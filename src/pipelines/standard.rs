use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{depth_state, mk_render_pipeline, triangles, REPLACE},
};

/// Lit materials: ambient light plus one point light with physical falloff.
pub fn mk_standard_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    material_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
    light_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Standard Pipeline Layout"),
        bind_group_layouts: &[material_layout, camera_layout, light_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Standard Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("standard.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Standard Pipeline",
        &layout,
        format,
        Some(REPLACE),
        Some(depth_state(false)),
        triangles(),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
