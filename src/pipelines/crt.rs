//! CRT look for the virtual screen.
//!
//! Draws the screen quad like the basic pipeline but bends, splits and dims
//! the sampled picture the way an old tube television would.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{depth_state, mk_render_pipeline, triangles, REPLACE},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CrtUniform {
    /// Seconds since start, drives the flicker.
    pub time: f32,
    /// 0 leaves the picture untouched, 1 is the full effect.
    pub strength: f32,
    /// Size of the target in pixels, sets the scanline count.
    pub resolution: [f32; 2],
}

impl CrtUniform {
    pub fn new(resolution: [u32; 2]) -> Self {
        Self {
            time: 0.0,
            strength: 1.0,
            resolution: [resolution[0] as f32, resolution[1] as f32],
        }
    }
}

#[derive(Debug)]
pub struct CrtResources {
    pub uniform: CrtUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CrtResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, uniform: CrtUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("CRT Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("crt_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, time: f32) {
        self.uniform.time = time;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("crt_bind_group_layout"),
    })
}

pub fn mk_crt_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    material_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
    crt_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("CRT Pipeline Layout"),
        bind_group_layouts: &[material_layout, camera_layout, crt_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("CRT Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("crt.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "CRT Pipeline",
        &layout,
        format,
        Some(REPLACE),
        Some(depth_state(false)),
        triangles(),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crt_uniform_is_one_vec4() {
        assert_eq!(std::mem::size_of::<CrtUniform>(), 16);
        let uniform = CrtUniform::new([512, 256]);
        assert_eq!(uniform.resolution, [512.0, 256.0]);
    }
}
