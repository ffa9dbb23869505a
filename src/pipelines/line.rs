use cgmath::Point3;

use crate::{
    data_structures::model::Vertex,
    pipelines::{depth_state, mk_render_pipeline, REPLACE},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub colour: [f32; 3],
}

impl LineVertex {
    pub fn new(position: Point3<f32>, colour: [f32; 3]) -> Self {
        Self {
            position: position.into(),
            colour,
        }
    }
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Coloured line lists in world space. `overlay` pipelines ignore the depth
/// buffer so the lines stay visible through geometry.
pub fn mk_line_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    overlay: bool,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Line Pipeline Layout"),
        bind_group_layouts: &[camera_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Line Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("line.wgsl").into()),
    };
    let primitive = wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::LineList,
        cull_mode: None,
        ..Default::default()
    };
    mk_render_pipeline(
        device,
        if overlay { "Overlay Line Pipeline" } else { "Line Pipeline" },
        &layout,
        format,
        Some(REPLACE),
        Some(depth_state(overlay)),
        primitive,
        &[LineVertex::desc()],
        shader,
    )
}
