//! glTF models flattened into a single [`Model`].
//!
//! Node transforms are baked into the vertices, so the loaded model is
//! positioned as a whole through its scene object's instance. Meshes whose
//! mesh or node name matches the screen name are drawn unlit with the
//! screen texture instead of their own material.

use anyhow::Context;
use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Transform, Vector3};

use crate::{
    data_structures::{
        model::{Material, Mesh, Model, ModelVertex, Shading},
        texture::Texture,
    },
    resources::{load_binary, load_texture},
};

/// Texture shown on the meshes named `name`.
pub struct ScreenMap<'a> {
    pub name: &'a str,
    pub texture: &'a Texture,
}

#[derive(Debug)]
pub struct GltfModel {
    pub model: Model,
    /// Index of the material showing the screen texture, if a mesh uses it.
    pub screen_material: Option<usize>,
}

pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    material_layout: &wgpu::BindGroupLayout,
    fallback: &Texture,
    screen: Option<ScreenMap<'_>>,
) -> anyhow::Result<GltfModel> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes).with_context(|| format!("Invalid glTF {file_name}"))?;

    // External buffers load concurrently
    let blob = gltf.blob.as_deref();
    let buffer_data: Vec<Vec<u8>> = futures::future::try_join_all(gltf.buffers().map(|buffer| async move {
        match buffer.source() {
            gltf::buffer::Source::Bin => blob
                .map(<[u8]>::to_vec)
                .with_context(|| format!("{file_name} has no binary chunk")),
            gltf::buffer::Source::Uri(uri) => load_binary(&resolve_uri(file_name, uri)?).await,
        }
    }))
    .await?;

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let name = material.name().unwrap_or("gltf material");
        let map = match pbr.base_color_texture().map(|info| info.texture().source().source()) {
            Some(gltf::image::Source::View { view, mime_type }) => {
                let start = view.offset();
                let end = start + view.length();
                let data = buffer_data
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                    .with_context(|| format!("Image view of {name} out of bounds"))?;
                Some(Texture::from_bytes(
                    device,
                    queue,
                    data,
                    name,
                    mime_type.split('/').next_back(),
                )?)
            }
            Some(gltf::image::Source::Uri { uri, mime_type }) => Some(
                load_texture(
                    &resolve_uri(file_name, uri)?,
                    device,
                    queue,
                    mime_type.and_then(|mt| mt.split('/').next_back()),
                )
                .await?,
            ),
            None => None,
        };
        materials.push(Material::new(
            device,
            material_layout,
            name,
            Shading::Standard,
            pbr.base_color_factor(),
            map.as_ref(),
            fallback,
        ));
    }
    // Primitives without a material
    let default_material = materials.len();
    materials.push(Material::new(
        device,
        material_layout,
        "gltf default",
        Shading::Standard,
        [1.0; 4],
        None,
        fallback,
    ));

    let screen_material = screen.as_ref().map(|screen| {
        materials.push(Material::new(
            device,
            material_layout,
            screen.name,
            Shading::Basic,
            [1.0; 4],
            Some(screen.texture),
            fallback,
        ));
        materials.len() - 1
    });

    let mut meshes = Vec::new();
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{file_name} contains no scene"))?;
    let mut stack: Vec<(gltf::Node, Matrix4<f32>)> =
        scene.nodes().map(|node| (node, Matrix4::identity())).collect();
    while let Some((node, parent)) = stack.pop() {
        let world = parent * Matrix4::from(node.transform().matrix());
        for child in node.children() {
            stack.push((child, world));
        }
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let mesh_name = mesh.name().or(node.name()).unwrap_or("gltf mesh").to_string();
        let is_screen = screen
            .as_ref()
            .is_some_and(|s| mesh.name() == Some(s.name) || node.name() == Some(s.name));

        for primitive in mesh.primitives() {
            let (vertices, indices) = read_primitive(&primitive, &buffer_data, world)
                .with_context(|| format!("Failed to read mesh {mesh_name} of {file_name}"))?;
            let material = match screen_material {
                Some(index) if is_screen => index,
                _ => primitive.material().index().unwrap_or(default_material),
            };
            meshes.push(Mesh::new(device, &mesh_name, &vertices, &indices, material));
        }
        if is_screen {
            log::info!("Showing the texture camera on mesh {}", mesh_name);
        }
    }

    let screen_material = screen_material.filter(|&index| meshes.iter().any(|m| m.material == index));
    if let (Some(screen), None) = (&screen, screen_material) {
        log::warn!("{} has no mesh named {}", file_name, screen.name);
    }

    Ok(GltfModel {
        model: Model { meshes, materials },
        screen_material,
    })
}

/// Resolves `uri` against the directory of the glTF file that references it.
fn resolve_uri(file_name: &str, uri: &str) -> anyhow::Result<String> {
    if uri.starts_with("data:") {
        anyhow::bail!("Embedded data URIs are not supported, use a .glb or external files");
    }
    Ok(match file_name.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{uri}"),
        None => uri.to_string(),
    })
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
    world: Matrix4<f32>,
) -> anyhow::Result<(Vec<ModelVertex>, Vec<u32>)> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .context("Primitive has no positions")?
        .collect();
    let mut normals = reader.read_normals();
    let mut tex_coords = reader.read_tex_coords(0).map(|t| t.into_f32());

    let normal_matrix = normal_matrix(world);
    let vertices = positions
        .iter()
        .map(|&position| {
            let normal = normals
                .as_mut()
                .and_then(Iterator::next)
                .unwrap_or([0.0, 1.0, 0.0]);
            let tex_coords = tex_coords
                .as_mut()
                .and_then(Iterator::next)
                .unwrap_or([0.0, 0.0]);
            let position = world.transform_point(Point3::from(position));
            let normal = (normal_matrix * Vector3::from(normal)).normalize();
            ModelVertex {
                position: position.into(),
                tex_coords,
                normal: normal.into(),
            }
        })
        .collect();

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    Ok((vertices, indices))
}

/// Inverse transpose of the upper 3x3 of `world`.
fn normal_matrix(world: Matrix4<f32>) -> Matrix3<f32> {
    let m = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    m.invert().map(|inv| inv.transpose()).unwrap_or(m)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Deg;

    use super::*;

    #[test]
    fn uris_resolve_next_to_the_gltf_file() {
        assert_eq!(resolve_uri("models/tv.gltf", "tv.bin").unwrap(), "models/tv.bin");
        assert_eq!(
            resolve_uri("models/tv.gltf", "textures/wood.png").unwrap(),
            "models/textures/wood.png"
        );
        assert_eq!(resolve_uri("tv.gltf", "tv.bin").unwrap(), "tv.bin");
    }

    #[test]
    fn data_uris_are_rejected() {
        let error = resolve_uri("tv.gltf", "data:application/octet-stream;base64,AAAA").unwrap_err();
        assert!(error.to_string().contains("data URIs"));
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_nonuniform_scale() {
        let world = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0) * Matrix4::from_angle_z(Deg(45.0));
        let tangent = world.transform_vector(Vector3::new(1.0, -1.0, 0.0));
        let normal = normal_matrix(world) * Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(tangent.dot(normal), 0.0, epsilon = 1e-5);
    }
}
