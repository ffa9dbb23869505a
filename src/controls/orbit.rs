//! Orbit controls for the main camera.
//!
//! The camera circles a target point on a sphere. Dragging with the left
//! button rotates, dragging with the right button pans the target, the wheel
//! zooms. Input only accumulates deltas; [`OrbitControls::update`] applies
//! them once per frame. With damping the deltas decay by `1 - damping_factor`
//! per update instead of being applied at once, which gives the motion its
//! inertia.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Vector3, Zero};
use winit::dpi::PhysicalPosition;

use crate::camera::{Camera, Projection};

const EPS: f32 = 1e-6;

/// Spherical coordinates: `theta` is the azimuth around +Y measured from
/// +Z, `phi` the polar angle measured from +Y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_vector(v: Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius < EPS {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_vector(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// What a pressed pointer button does while dragging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrbitAction {
    Rotate,
    Pan,
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Disabled controls ignore input. Deltas already accumulated still
    /// settle through damping.
    pub enabled: bool,
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    action: Option<OrbitAction>,
    last_pointer: Option<PhysicalPosition<f64>>,
    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vector3<f32>,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            enabled: true,
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            action: None,
            last_pointer: None,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vector3::zero(),
        }
    }

    pub fn with_damping(mut self, factor: f32) -> Self {
        self.enable_damping = true;
        self.damping_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn pointer_down(&mut self, action: OrbitAction, position: PhysicalPosition<f64>) {
        if !self.enabled {
            return;
        }
        self.action = Some(action);
        self.last_pointer = Some(position);
    }

    pub fn pointer_up(&mut self) {
        self.action = None;
        self.last_pointer = None;
    }

    /// Accumulates rotation or pan for a pointer move of a pressed button.
    ///
    /// `viewport_height` scales the drag so a full-height drag turns the
    /// camera by a full circle.
    pub fn pointer_move(
        &mut self,
        position: PhysicalPosition<f64>,
        viewport_height: f32,
        camera: &Camera,
    ) {
        if !self.enabled {
            return;
        }
        let (Some(action), Some(last)) = (self.action, self.last_pointer) else {
            return;
        };
        self.last_pointer = Some(position);
        let dx = (position.x - last.x) as f32;
        let dy = (position.y - last.y) as f32;
        let height = viewport_height.max(1.0);

        match action {
            OrbitAction::Rotate => {
                self.rotate_left(2.0 * PI * dx / height * self.rotate_speed);
                self.rotate_up(2.0 * PI * dy / height * self.rotate_speed);
            }
            OrbitAction::Pan => self.pan(dx, dy, height, camera),
        }
    }

    /// Positive `delta` zooms in.
    pub fn wheel(&mut self, delta: f32) {
        if !self.enabled || delta == 0.0 {
            return;
        }
        let zoom_scale = 0.95f32.powf(self.zoom_speed * delta.abs());
        if delta > 0.0 {
            self.scale *= zoom_scale;
        } else {
            self.scale /= zoom_scale;
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    fn pan(&mut self, dx: f32, dy: f32, height: f32, camera: &Camera) {
        let distance = (camera.position - self.target).magnitude();
        // Pixels to world units at the target's depth
        let world_per_pixel = match camera.projection {
            Projection::Perspective { fovy, .. } => {
                2.0 * distance * (fovy.0 / 2.0).tan() / height
            }
            Projection::Orthographic { top, bottom, .. } => (top - bottom) / height,
        };
        let left = camera.right() * (-dx * world_per_pixel * self.pan_speed);
        let up = camera.up() * (dy * world_per_pixel * self.pan_speed);
        self.pan_offset += left + up;
    }

    /// Applies the accumulated input to `camera`. Returns whether the camera
    /// moved noticeably.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_vector(offset);
        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        spherical.theta += self.spherical_delta.theta * factor;
        spherical.phi += self.spherical_delta.phi * factor;
        spherical.phi = spherical.phi.clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * factor;

        let old_position = camera.position;
        camera.position = self.target + spherical.to_vector();
        camera.look_at(self.target);

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.position - old_position).magnitude2() > EPS
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Deg, Rad};

    use super::*;

    fn camera() -> Camera {
        let mut camera = Camera::new(
            (0.0, 0.0, 5.0),
            Projection::perspective(Deg(75.0), 1.0, 0.1, 1000.0),
        );
        camera.look_at(Point3::new(0.0, 0.0, 0.0));
        camera
    }

    /// Azimuth of `camera` around `target`, measured from +Z.
    fn azimuth_of(camera: &Camera, target: Point3<f32>) -> Rad<f32> {
        Rad(Spherical::from_vector(camera.position - target).theta)
    }

    fn drag(controls: &mut OrbitControls, camera: &Camera, action: OrbitAction, dx: f64, dy: f64) {
        controls.pointer_down(action, PhysicalPosition::new(100.0, 100.0));
        controls.pointer_move(PhysicalPosition::new(100.0 + dx, 100.0 + dy), 500.0, camera);
        controls.pointer_up();
    }

    #[test]
    fn spherical_round_trips_offsets() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let back = Spherical::from_vector(v).to_vector();
        assert_relative_eq!(back.x, v.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-5);
    }

    #[test]
    fn undamped_rotation_applies_at_once() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        drag(&mut controls, &camera, OrbitAction::Rotate, 125.0, 0.0);
        assert!(controls.update(&mut camera));

        // A quarter of the viewport height turns the camera a quarter circle
        assert_relative_eq!(azimuth_of(&camera, controls.target).0, -PI / 2.0, epsilon = 1e-4);
        assert_relative_eq!((camera.position - controls.target).magnitude(), 5.0, epsilon = 1e-4);
        // Nothing left to apply
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut camera = camera();
        let mut controls = OrbitControls::default().with_damping(0.05);
        drag(&mut controls, &camera, OrbitAction::Rotate, 100.0, 0.0);
        let total = -2.0 * PI * 100.0 / 500.0;

        controls.update(&mut camera);
        let first = azimuth_of(&camera, controls.target).0;
        assert_relative_eq!(first, total * 0.05, epsilon = 1e-4);

        for _ in 0..600 {
            controls.update(&mut camera);
        }
        assert_relative_eq!(azimuth_of(&camera, controls.target).0, total, epsilon = 1e-3);
        // Settled
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn disabled_controls_ignore_input() {
        let mut camera = camera();
        let before = camera.position;
        let mut controls = OrbitControls::default();
        controls.enabled = false;

        drag(&mut controls, &camera, OrbitAction::Rotate, 200.0, 50.0);
        controls.wheel(3.0);
        controls.update(&mut camera);

        assert_relative_eq!(camera.position.x, before.x, epsilon = 1e-5);
        assert_relative_eq!(camera.position.y, before.y, epsilon = 1e-5);
        assert_relative_eq!(camera.position.z, before.z, epsilon = 1e-5);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        // Dragging far down lifts the camera over the target and stops there
        drag(&mut controls, &camera, OrbitAction::Rotate, 0.0, 2000.0);
        controls.update(&mut camera);

        assert!(camera.position.y > 4.99);
        assert!(camera.position.x.is_finite() && camera.position.z.is_finite());
        assert!(camera.forward().y < -0.99);
    }

    #[test]
    fn wheel_zooms_within_distance_limits() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        controls.wheel(1.0);
        controls.update(&mut camera);
        assert_relative_eq!((camera.position - controls.target).magnitude(), 4.75, epsilon = 1e-4);

        controls.min_distance = 4.5;
        for _ in 0..10 {
            controls.wheel(1.0);
            controls.update(&mut camera);
        }
        assert_relative_eq!((camera.position - controls.target).magnitude(), 4.5, epsilon = 1e-4);
    }

    #[test]
    fn pan_moves_target_with_camera() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        drag(&mut controls, &camera, OrbitAction::Pan, -50.0, 0.0);
        controls.update(&mut camera);

        // Dragging left moves the view right
        assert!(controls.target.x > 0.0);
        assert_relative_eq!(camera.position.x, controls.target.x, epsilon = 1e-4);
        assert_relative_eq!(camera.forward().z, -1.0, epsilon = 1e-4);
    }
}
