use cgmath::Point3;
use wgpu::util::DeviceExt;

/// One point light and the ambient term, as the standard shader reads them.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    position: [f32; 3],
    intensity: f32,
    colour: [f32; 3],
    /// Range after which the light has no effect. Zero means unlimited.
    distance: f32,
    /// Ambient colour premultiplied with its intensity.
    ambient: [f32; 3],
    decay: f32,
}

impl LightUniform {
    pub fn point(position: Point3<f32>, colour: [f32; 3], intensity: f32, distance: f32) -> Self {
        Self {
            position: position.into(),
            intensity,
            colour,
            distance,
            ambient: [0.0; 3],
            decay: 2.0,
        }
    }

    pub fn with_ambient(mut self, colour: [f32; 3], intensity: f32) -> Self {
        self.ambient = colour.map(|c| c * intensity);
        self
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_uniform_matches_the_shader_layout() {
        // vec3 + f32 three times
        assert_eq!(std::mem::size_of::<LightUniform>(), 48);
    }

    #[test]
    fn ambient_is_premultiplied() {
        let light = LightUniform::point(Point3::new(0.0, 2.0, 2.0), [1.0; 3], 10.0, 100.0)
            .with_ambient([1.0; 3], 0.5);
        assert_eq!(light.ambient, [0.5; 3]);
        assert_eq!(light.decay, 2.0);
        assert_eq!(light.position, [0.0, 2.0, 2.0]);
    }
}
