//! Cameras, projections and the uniforms that feed them to the shaders.
//!
//! A [`Camera`] is a position and a rotation plus a [`Projection`]. It looks
//! down its local -Z axis with +Y up. Three cameras exist at runtime: the
//! orbit-controlled main camera, the gizmo-driven texture camera and the
//! orthographic camera that views the screen quad.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Quaternion, Rad, SquareMatrix, Vector3, Vector4};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalPosition;

use crate::controls::transform::Transformable;

/// wgpu uses a 0..1 depth range, cgmath produces OpenGL's -1..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        fovy: Rad<f32>,
        aspect: f32,
        znear: f32,
        zfar: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        znear: f32,
        zfar: f32,
    },
}

impl Projection {
    pub fn perspective<F: Into<Rad<f32>>>(fovy: F, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self::Perspective {
            fovy: fovy.into(),
            aspect,
            znear,
            zfar,
        }
    }

    pub fn orthographic(left: f32, right: f32, top: f32, bottom: f32, znear: f32, zfar: f32) -> Self {
        Self::Orthographic {
            left,
            right,
            top,
            bottom,
            znear,
            zfar,
        }
    }

    /// Keeps a perspective projection's aspect in line with its viewport.
    /// Orthographic frusta are fixed.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Self::Perspective { aspect, .. } = self {
            if width > 0 && height > 0 {
                *aspect = width as f32 / height as f32;
            }
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        let gl = match *self {
            Self::Perspective {
                fovy,
                aspect,
                znear,
                zfar,
            } => cgmath::perspective(fovy, aspect, znear, zfar),
            Self::Orthographic {
                left,
                right,
                top,
                bottom,
                znear,
                zfar,
            } => cgmath::ortho(left, right, bottom, top, znear, zfar),
        };
        OPENGL_TO_WGPU_MATRIX * gl
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: Quaternion<f32>,
    pub projection: Projection,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, projection: Projection) -> Self {
        Self {
            position: position.into(),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            projection,
        }
    }

    /// Direction the camera looks at in world space.
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::unit_z()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::unit_y()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::unit_x()
    }

    /// Turns the camera towards `target` keeping world +Y up.
    pub fn look_at(&mut self, target: Point3<f32>) {
        let forward = target - self.position;
        if forward.magnitude2() < f32::EPSILON {
            return;
        }
        let z_axis = -forward.normalize();
        let mut x_axis = Vector3::unit_y().cross(z_axis);
        if x_axis.magnitude2() < 1e-8 {
            // Looking straight up or down
            x_axis = Vector3::unit_x();
        }
        let x_axis = x_axis.normalize();
        let y_axis = z_axis.cross(x_axis);
        self.rotation = Quaternion::from(cgmath::Matrix3::from_cols(x_axis, y_axis, z_axis)).normalize();
    }

    /// World to view space: the inverse of the camera's own transform.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.rotation.conjugate())
            * Matrix4::from_translation(-self.position.to_vec())
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.matrix() * self.view_matrix()
    }

    /// Unprojects a cursor position into a world space ray.
    ///
    /// Works for both projections: the ray starts on the near plane and
    /// points towards the far plane.
    pub fn cast_ray(&self, cursor: PhysicalPosition<f64>, width: f32, height: f32) -> Ray {
        let x = 2.0 * cursor.x as f32 / width.max(1.0) - 1.0;
        let y = 1.0 - 2.0 * cursor.y as f32 / height.max(1.0);
        let inverse = self
            .view_proj()
            .invert()
            .unwrap_or_else(Matrix4::identity);
        let unproject = |z: f32| {
            let p = inverse * Vector4::new(x, y, z, 1.0);
            Point3::from_homogeneous(p)
        };
        let near = unproject(0.0);
        let far = unproject(1.0);
        Ray::new(near, far - near)
    }

    /// World space corners of the view frustum at normalised depth `z`
    /// (0 = near, 1 = far), ordered top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn frustum_corners(&self, z: f32) -> [Point3<f32>; 4] {
        let inverse = self
            .view_proj()
            .invert()
            .unwrap_or_else(Matrix4::identity);
        [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)]
            .map(|(x, y)| Point3::from_homogeneous(inverse * Vector4::new(x, y, z, 1.0)))
    }

    /// Unprojects a normalised device coordinate.
    pub fn unproject(&self, ndc: Vector3<f32>) -> Point3<f32> {
        let inverse = self
            .view_proj()
            .invert()
            .unwrap_or_else(Matrix4::identity);
        Point3::from_homogeneous(inverse * ndc.extend(1.0))
    }
}

impl Transformable for Camera {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation.normalize();
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Always normalised.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the plane through `point` with `normal`, if
    /// the plane lies in front of the origin.
    pub fn intersect_plane(&self, point: Point3<f32>, normal: Vector3<f32>) -> Option<f32> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = normal.dot(point - self.origin) / denom;
        (t >= 0.0).then_some(t)
    }

    /// Closest approach between the ray and the segment `a`-`b`.
    ///
    /// Returns the distance along the ray and the gap between the two
    /// closest points.
    pub fn closest_to_segment(&self, a: Point3<f32>, b: Point3<f32>) -> (f32, f32) {
        let d2 = b - a;
        let r = self.origin - a;
        let e = d2.magnitude2();
        let c = self.direction.dot(r);
        if e < 1e-12 {
            let t = (-c).max(0.0);
            return (t, (self.at(t) - a).magnitude());
        }
        let f = d2.dot(r);
        let b_ = self.direction.dot(d2);
        let denom = e - b_ * b_;

        let mut t = if denom.abs() > 1e-8 {
            ((b_ * f - c * e) / denom).max(0.0)
        } else {
            0.0
        };
        let mut s = (b_ * t + f) / e;
        if s < 0.0 {
            s = 0.0;
            t = (-c).max(0.0);
        } else if s > 1.0 {
            s = 1.0;
            t = (b_ - c).max(0.0);
        }
        let gap = (self.at(t) - (a + d2 * s)).magnitude();
        (t, gap)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
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
        label: Some("camera_bind_group_layout"),
    })
}

/// Uniform buffer and bind group of one camera.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera: &Camera,
        label: &str,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(camera);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        self.uniform.update_view_proj(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Deg, Transform};

    use super::*;

    fn perspective_camera() -> Camera {
        Camera::new(
            (0.0, 0.0, 5.0),
            Projection::perspective(Deg(75.0), 1.0, 0.1, 1000.0),
        )
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut camera = perspective_camera();
        camera.position = Point3::new(3.0, 4.0, 0.0);
        camera.look_at(Point3::new(0.0, 0.0, 0.0));

        let expected = Vector3::new(-3.0, -4.0, 0.0).normalize();
        let forward = camera.forward();
        assert_relative_eq!(forward.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(forward.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(forward.z, expected.z, epsilon = 1e-5);
        assert!(camera.up().y > 0.0);
    }

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let mut camera = perspective_camera();
        camera.look_at(Point3::new(0.0, 0.0, 0.0));
        let eye = camera.view_matrix().transform_point(camera.position);
        assert_relative_eq!(eye.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.z, 0.0, epsilon = 1e-5);

        let target = camera.view_matrix().transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(target.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn centre_ray_follows_view_direction() {
        let camera = perspective_camera();
        let ray = camera.cast_ray(PhysicalPosition::new(400.0, 300.0), 800.0, 600.0);
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-4);
        assert_relative_eq!(ray.origin.z, 4.9, epsilon = 1e-3);
    }

    #[test]
    fn corner_ray_leans_towards_corner() {
        let camera = perspective_camera();
        let ray = camera.cast_ray(PhysicalPosition::new(0.0, 0.0), 800.0, 600.0);
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let camera = Camera::new(
            (0.0, 0.0, 1.0),
            Projection::orthographic(-1.0, 1.0, 1.0, -1.0, 0.1, 10.0),
        );
        let a = camera.cast_ray(PhysicalPosition::new(10.0, 10.0), 100.0, 100.0);
        let b = camera.cast_ray(PhysicalPosition::new(90.0, 50.0), 100.0, 100.0);
        assert_relative_eq!(a.direction.z, b.direction.z, epsilon = 1e-5);
        assert_relative_eq!(a.direction.z, -1.0, epsilon = 1e-5);
        // Top-left pixel maps onto the top-left of the -1..1 window
        assert_relative_eq!(a.origin.x, -0.8, epsilon = 1e-4);
        assert_relative_eq!(a.origin.y, 0.8, epsilon = 1e-4);
    }

    #[test]
    fn resize_updates_only_perspective_aspect() {
        let mut perspective = Projection::perspective(Deg(75.0), 1.0, 0.1, 1000.0);
        perspective.resize(1600, 900);
        match perspective {
            Projection::Perspective { aspect, .. } => assert_relative_eq!(aspect, 16.0 / 9.0),
            _ => unreachable!(),
        }

        let mut ortho = Projection::orthographic(-1.0, 1.0, 1.0, -1.0, 0.1, 10.0);
        let before = ortho;
        ortho.resize(1600, 900);
        assert_eq!(ortho, before);
    }

    #[test]
    fn frustum_near_corners_surround_view_axis() {
        let camera = perspective_camera();
        let [top_left, top_right, bottom_left, bottom_right] = camera.frustum_corners(0.0);
        assert!(top_left.x < 0.0 && top_left.y > 0.0);
        assert!(top_right.x > 0.0 && top_right.y > 0.0);
        assert!(bottom_left.x < 0.0 && bottom_left.y < 0.0);
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);
        assert_relative_eq!(top_left.z, 4.9, epsilon = 1e-3);
    }

    #[test]
    fn ray_hits_plane_in_front_only() {
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        let t = ray.intersect_plane(Point3::new(0.0, -1.0, 0.0), Vector3::unit_y());
        assert_relative_eq!(t.unwrap(), 2.0);

        let behind = ray.intersect_plane(Point3::new(0.0, 2.0, 0.0), Vector3::unit_y());
        assert!(behind.is_none());
    }

    #[test]
    fn segment_distance_for_crossing_and_missing_rays() {
        let ray = Ray::new(Point3::new(0.5, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let (t, gap) = ray.closest_to_segment(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);
        assert_relative_eq!(gap, 0.0, epsilon = 1e-5);

        let (_, gap) = ray.closest_to_segment(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(gap, (0.5f32 * 0.5 + 1.0).sqrt(), epsilon = 1e-5);
    }
}
