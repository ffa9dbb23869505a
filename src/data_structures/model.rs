//! Meshes, materials and the draw helpers that bind them.

use wgpu::util::DeviceExt;

use crate::data_structures::{geometry::Geometry, texture::Texture};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Which pipeline a material is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Lit by the point and ambient light.
    Standard,
    /// Unlit: colour times map, nothing else.
    Basic,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    colour: [f32; 4],
    use_map: u32,
    // Uniform structs are padded to 16 bytes
    _padding: [u32; 3],
}

impl MaterialUniform {
    pub fn new(colour: [f32; 4], use_map: bool) -> Self {
        Self {
            colour,
            use_map: use_map as u32,
            _padding: [0; 3],
        }
    }
}

/// Converts a `0xRRGGBB` hex colour into linear RGBA.
///
/// Hex colours are authored in sRGB, the shaders work in linear space.
pub fn hex_colour(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0), 1.0]
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub shading: Shading,
    pub colour: [f32; 4],
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    /// Creates a material. Without a `map` the fallback texture is bound and
    /// ignored by the shaders.
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        shading: Shading,
        colour: [f32; 4],
        map: Option<&Texture>,
        fallback: &Texture,
    ) -> Self {
        let uniform = MaterialUniform::new(colour, map.is_some());
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(device, layout, name, &buffer, map.unwrap_or(fallback));
        Self {
            name: name.to_string(),
            shading,
            colour,
            buffer,
            bind_group,
        }
    }

    /// Points the material at a new texture, e.g. a render target's colour
    /// attachment.
    pub fn set_map(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        map: &Texture,
    ) {
        let uniform = MaterialUniform::new(self.colour, true);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
        self.bind_group = mk_bind_group(device, layout, &self.name, &self.buffer, map);
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    name: &str,
    buffer: &wgpu::Buffer,
    map: &Texture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&map.sampler),
            },
        ],
        label: Some(name),
    })
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: usize,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material,
        }
    }

    pub fn from_geometry(
        device: &wgpu::Device,
        name: &str,
        geometry: &Geometry,
        material: usize,
    ) -> Self {
        Self::new(device, name, &geometry.vertices, &geometry.indices, material)
    }
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// A model of a single mesh with a single material.
    pub fn single(device: &wgpu::Device, name: &str, geometry: &Geometry, material: Material) -> Self {
        Self {
            meshes: vec![Mesh::from_geometry(device, name, geometry, 0)],
            materials: vec![material],
        }
    }
}

pub trait DrawModel {
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instance: &wgpu::Buffer,
        camera_bind_group: &wgpu::BindGroup,
        third_bind_group: &wgpu::BindGroup,
    );
}

/// Group 0 is the material, group 1 the camera and group 2 either the light
/// or the post-process parameters.
impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instance: &wgpu::Buffer,
        camera_bind_group: &wgpu::BindGroup,
        third_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, instance.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, third_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn hex_colours_are_linearised() {
        let green = hex_colour(0x00ff00);
        assert_eq!(green[0], 0.0);
        assert_relative_eq!(green[1], 1.0, epsilon = 1e-6);
        assert_eq!(green[2], 0.0);

        let grey = hex_colour(0xadadad);
        // 0xad = 173 -> 0.678 sRGB -> ~0.418 linear
        assert_relative_eq!(grey[0], 0.418, epsilon = 1e-3);
        assert_eq!(grey[0], grey[1]);
        assert_eq!(grey[1], grey[2]);
    }

    #[test]
    fn material_uniform_is_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }
}
