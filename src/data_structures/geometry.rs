//! CPU-side primitive geometry: boxes and planes.
//!
//! Faces wind counter-clockwise seen from the side their normal points to.
//! Texture coordinates start at the top-left corner of each face, matching
//! how wgpu lays out render target texels, so a plane showing an offscreen
//! image shows it upright.

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::ModelVertex;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Appends a rectangle centred at `centre` spanning `u` (right) and `v`
    /// (up). The face normal is `u x v`.
    fn push_quad(&mut self, centre: Vector3<f32>, u: Vector3<f32>, v: Vector3<f32>) {
        let normal = u.cross(v).normalize();
        let base = self.vertices.len() as u32;
        let corners = [
            (centre - u + v, [0.0, 0.0]),
            (centre + u + v, [1.0, 0.0]),
            (centre - u - v, [0.0, 1.0]),
            (centre + u - v, [1.0, 1.0]),
        ];
        for (position, tex_coords) in corners {
            self.vertices.push(ModelVertex {
                position: position.into(),
                tex_coords,
                normal: normal.into(),
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);
    }
}

/// An axis-aligned box centred at the origin.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    let half = Vector3::new(width, height, depth) / 2.0;
    let extent = |axis: Vector3<f32>| {
        axis.x.abs() * half.x + axis.y.abs() * half.y + axis.z.abs() * half.z
    };
    // (normal, right, up) per face with right x up == normal
    let faces = [
        (Vector3::unit_x(), -Vector3::unit_z(), Vector3::unit_y()),
        (-Vector3::unit_x(), Vector3::unit_z(), Vector3::unit_y()),
        (Vector3::unit_y(), Vector3::unit_x(), -Vector3::unit_z()),
        (-Vector3::unit_y(), Vector3::unit_x(), Vector3::unit_z()),
        (Vector3::unit_z(), Vector3::unit_x(), Vector3::unit_y()),
        (-Vector3::unit_z(), -Vector3::unit_x(), Vector3::unit_y()),
    ];

    let mut geometry = Geometry::default();
    for (normal, right, up) in faces {
        geometry.push_quad(
            normal * extent(normal),
            right * extent(right),
            up * extent(up),
        );
    }
    geometry
}

/// A rectangle in the XY plane facing +Z, centred at the origin.
pub fn plane(width: f32, height: f32) -> Geometry {
    let mut geometry = Geometry::default();
    geometry.push_quad(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::unit_x() * (width / 2.0),
        Vector3::unit_y() * (height / 2.0),
    );
    geometry
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    fn face_normal(geometry: &Geometry, triangle: usize) -> Vector3<f32> {
        let idx = &geometry.indices[triangle * 3..triangle * 3 + 3];
        let p = |i: u32| Vector3::from(geometry.vertices[i as usize].position);
        (p(idx[1]) - p(idx[0])).cross(p(idx[2]) - p(idx[0]))
    }

    #[test]
    fn cuboid_has_four_vertices_and_two_triangles_per_face() {
        let geometry = cuboid(1.0, 3.0, 1.0);
        assert_eq!(geometry.vertices.len(), 24);
        assert_eq!(geometry.indices.len(), 36);
    }

    #[test]
    fn cuboid_spans_its_extents() {
        let geometry = cuboid(1.0, 3.0, 1.0);
        let max_y = geometry
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        let min_x = geometry
            .vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MAX, f32::min);
        assert_eq!(max_y, 1.5);
        assert_eq!(min_x, -0.5);
    }

    #[test]
    fn cuboid_triangles_wind_towards_their_normals() {
        let geometry = cuboid(2.0, 2.0, 2.0);
        for triangle in 0..geometry.indices.len() / 3 {
            let winding = face_normal(&geometry, triangle);
            let stored = Vector3::from(
                geometry.vertices[geometry.indices[triangle * 3] as usize].normal,
            );
            assert!(winding.dot(stored) > 0.0, "triangle {triangle} is back-facing");
        }
    }

    #[test]
    fn plane_faces_positive_z_with_top_left_uv_origin() {
        let geometry = plane(2.0, 2.0);
        assert_eq!(geometry.vertices.len(), 4);
        assert!(face_normal(&geometry, 0).z > 0.0);
        assert!(face_normal(&geometry, 1).z > 0.0);

        let top_left = geometry
            .vertices
            .iter()
            .find(|v| v.tex_coords == [0.0, 0.0])
            .expect("uv origin");
        assert_eq!(top_left.position, [-1.0, 1.0, 0.0]);
    }
}
