//! A translate/rotate gizmo that drags an object along or around the world
//! axes.
//!
//! The gizmo is pure geometry: it takes world space rays built from the
//! cursor (see [`crate::camera::Camera::cast_ray`]) and reports what happened
//! through [`GizmoEvent`]s. Drawing happens through the line vertices from
//! [`TransformGizmo::lines`].

use std::f32::consts::TAU;

use cgmath::{InnerSpace, Point3, Quaternion, Rad, Rotation3, Vector3};
use serde::Deserialize;

use crate::{camera::Ray, pipelines::line::LineVertex};

/// Anything the gizmo can move.
pub trait Transformable {
    fn position(&self) -> Point3<f32>;
    fn rotation(&self) -> Quaternion<f32>;
    fn set_position(&mut self, position: Point3<f32>);
    fn set_rotation(&mut self, rotation: Quaternion<f32>);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn vector(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::unit_x(),
            Axis::Y => Vector3::unit_y(),
            Axis::Z => Vector3::unit_z(),
        }
    }

    /// Two unit vectors spanning the plane perpendicular to the axis.
    fn basis(self) -> (Vector3<f32>, Vector3<f32>) {
        match self {
            Axis::X => (Vector3::unit_y(), Vector3::unit_z()),
            Axis::Y => (Vector3::unit_z(), Vector3::unit_x()),
            Axis::Z => (Vector3::unit_x(), Vector3::unit_y()),
        }
    }

    fn colour(self) -> [f32; 3] {
        match self {
            Axis::X => [1.0, 0.2, 0.2],
            Axis::Y => [0.2, 1.0, 0.2],
            Axis::Z => [0.2, 0.4, 1.0],
        }
    }
}

const HIGHLIGHT: [f32; 3] = [1.0, 1.0, 0.0];
const RING_SEGMENTS: usize = 48;
/// Pick tolerance relative to the handle size.
const PICK_TOLERANCE: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GizmoEvent {
    /// The target moved or the gizmo's look changed.
    Change,
    /// A drag started (`true`) or ended (`false`).
    DraggingChanged(bool),
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    axis: Axis,
    start_position: Point3<f32>,
    start_rotation: Quaternion<f32>,
    plane_normal: Vector3<f32>,
    start_hit: Point3<f32>,
}

#[derive(Clone, Debug)]
pub struct TransformGizmo {
    pub mode: GizmoMode,
    /// Multiplies the on-screen size of the handles.
    pub size: f32,
    hovered: Option<Axis>,
    drag: Option<Drag>,
}

impl TransformGizmo {
    pub fn new(mode: GizmoMode) -> Self {
        Self {
            mode,
            size: 1.0,
            hovered: None,
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Switches between translating and rotating. Has no effect mid-drag.
    pub fn set_mode(&mut self, mode: GizmoMode) -> Option<GizmoEvent> {
        if self.mode == mode || self.drag.is_some() {
            return None;
        }
        log::debug!("Gizmo mode {:?}", mode);
        self.mode = mode;
        self.hovered = None;
        Some(GizmoEvent::Change)
    }

    /// World space length of the handles so they keep roughly the same size
    /// on screen.
    pub fn handle_scale(&self, eye: Point3<f32>, position: Point3<f32>) -> f32 {
        ((position - eye).magnitude() * 0.2).max(0.25) * self.size
    }

    /// Grabs the handle under the cursor, if any.
    pub fn pointer_down(
        &mut self,
        ray: &Ray,
        eye: Point3<f32>,
        target: &impl Transformable,
    ) -> Option<GizmoEvent> {
        if self.drag.is_some() {
            return None;
        }
        let position = target.position();
        let axis = self.pick(ray, eye, position)?;

        let plane_normal = match self.mode {
            GizmoMode::Translate => {
                // Plane containing the axis that faces the viewer the most
                let view = (position - eye).normalize();
                let normal = view - axis.vector() * view.dot(axis.vector());
                if normal.magnitude2() < 1e-6 {
                    return None;
                }
                normal.normalize()
            }
            GizmoMode::Rotate => axis.vector(),
        };
        let t = ray.intersect_plane(position, plane_normal)?;

        self.drag = Some(Drag {
            axis,
            start_position: position,
            start_rotation: target.rotation(),
            plane_normal,
            start_hit: ray.at(t),
        });
        self.hovered = Some(axis);
        Some(GizmoEvent::DraggingChanged(true))
    }

    /// Drags the target while a handle is held, otherwise tracks which
    /// handle the cursor hovers.
    pub fn pointer_move(
        &mut self,
        ray: &Ray,
        eye: Point3<f32>,
        target: &mut impl Transformable,
    ) -> Option<GizmoEvent> {
        let Some(drag) = self.drag else {
            let hovered = self.pick(ray, eye, target.position());
            if hovered != self.hovered {
                self.hovered = hovered;
                return Some(GizmoEvent::Change);
            }
            return None;
        };

        let t = ray.intersect_plane(drag.start_position, drag.plane_normal)?;
        let hit = ray.at(t);
        match self.mode {
            GizmoMode::Translate => {
                let axis = drag.axis.vector();
                let offset = axis * (hit - drag.start_hit).dot(axis);
                target.set_position(drag.start_position + offset);
            }
            GizmoMode::Rotate => {
                let v0 = drag.start_hit - drag.start_position;
                let v1 = hit - drag.start_position;
                if v0.magnitude2() < 1e-12 || v1.magnitude2() < 1e-12 {
                    return None;
                }
                let axis = drag.axis.vector();
                let angle = axis.dot(v0.cross(v1)).atan2(v0.dot(v1));
                let rotation = Quaternion::from_axis_angle(axis, Rad(angle)) * drag.start_rotation;
                target.set_rotation(rotation);
            }
        }
        Some(GizmoEvent::Change)
    }

    pub fn pointer_up(&mut self) -> Option<GizmoEvent> {
        self.drag
            .take()
            .map(|_| GizmoEvent::DraggingChanged(false))
    }

    /// The handle closest to the ray within the pick tolerance.
    fn pick(&self, ray: &Ray, eye: Point3<f32>, position: Point3<f32>) -> Option<Axis> {
        let scale = self.handle_scale(eye, position);
        let tolerance = PICK_TOLERANCE * scale;
        let mut best: Option<(Axis, f32)> = None;

        for axis in Axis::ALL {
            let gap = match self.mode {
                GizmoMode::Translate => {
                    let (_, gap) = ray.closest_to_segment(position, position + axis.vector() * scale);
                    gap
                }
                GizmoMode::Rotate => {
                    let Some(t) = ray.intersect_plane(position, axis.vector()) else {
                        continue;
                    };
                    ((ray.at(t) - position).magnitude() - scale).abs()
                }
            };
            if gap <= tolerance && best.is_none_or(|(_, best_gap)| gap < best_gap) {
                best = Some((axis, gap));
            }
        }
        best.map(|(axis, _)| axis)
    }

    fn axis_colour(&self, axis: Axis) -> [f32; 3] {
        let active = self.drag.map(|d| d.axis).or(self.hovered);
        if active == Some(axis) {
            HIGHLIGHT
        } else {
            axis.colour()
        }
    }

    /// Line list vertices of the handles around `position`.
    pub fn lines(&self, eye: Point3<f32>, position: Point3<f32>) -> Vec<LineVertex> {
        let scale = self.handle_scale(eye, position);
        let mut lines = Vec::new();
        let mut push = |a: Point3<f32>, b: Point3<f32>, colour: [f32; 3]| {
            lines.push(LineVertex::new(a, colour));
            lines.push(LineVertex::new(b, colour));
        };

        for axis in Axis::ALL {
            let colour = self.axis_colour(axis);
            let dir = axis.vector();
            let (u, v) = axis.basis();
            match self.mode {
                GizmoMode::Translate => {
                    let tip = position + dir * scale;
                    push(position, tip, colour);
                    // Arrow head
                    let back = tip - dir * (scale * 0.15);
                    for side in [u, -u, v, -v] {
                        push(tip, back + side * (scale * 0.06), colour);
                    }
                }
                GizmoMode::Rotate => {
                    let ring = |i: usize| {
                        let angle = TAU * i as f32 / RING_SEGMENTS as f32;
                        position + (u * angle.cos() + v * angle.sin()) * scale
                    };
                    for i in 0..RING_SEGMENTS {
                        push(ring(i), ring(i + 1), colour);
                    }
                }
            }
        }
        lines
    }
}

impl Default for TransformGizmo {
    fn default() -> Self {
        Self::new(GizmoMode::default())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{One, Rotation};

    use super::*;

    #[derive(Debug)]
    struct Target {
        position: Point3<f32>,
        rotation: Quaternion<f32>,
    }

    impl Transformable for Target {
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
            self.rotation = rotation;
        }
    }

    fn target() -> Target {
        Target {
            position: Point3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
        }
    }

    fn eye() -> Point3<f32> {
        Point3::new(0.0, 0.0, 10.0)
    }

    fn ray_to(x: f32, y: f32, z: f32) -> Ray {
        Ray::new(eye(), Point3::new(x, y, z) - eye())
    }

    #[test]
    fn handles_keep_a_minimum_size() {
        let gizmo = TransformGizmo::default();
        assert_relative_eq!(gizmo.handle_scale(eye(), Point3::new(0.0, 0.0, 0.0)), 2.0);
        assert_relative_eq!(gizmo.handle_scale(eye(), eye()), 0.25);
    }

    #[test]
    fn translate_picks_the_axis_under_the_ray() {
        let mut gizmo = TransformGizmo::default();
        let mut target = target();
        assert_eq!(
            gizmo.pointer_move(&ray_to(1.0, 0.0, 0.0), eye(), &mut target),
            Some(GizmoEvent::Change)
        );
        assert_eq!(gizmo.hovered, Some(Axis::X));

        gizmo.pointer_move(&ray_to(0.0, 1.0, 0.0), eye(), &mut target);
        assert_eq!(gizmo.hovered, Some(Axis::Y));

        gizmo.pointer_move(&ray_to(-1.5, -1.5, 0.0), eye(), &mut target);
        assert_eq!(gizmo.hovered, None);
    }

    #[test]
    fn translate_drag_follows_the_axis_only() {
        let mut gizmo = TransformGizmo::default();
        let mut target = target();
        assert_eq!(
            gizmo.pointer_down(&ray_to(1.0, 0.0, 0.0), eye(), &target),
            Some(GizmoEvent::DraggingChanged(true))
        );
        gizmo.pointer_move(&ray_to(1.5, 0.7, 0.0), eye(), &mut target);

        assert_relative_eq!(target.position.x, 0.5, epsilon = 1e-4);
        assert_relative_eq!(target.position.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(target.position.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn rotate_drag_turns_around_the_picked_ring() {
        let mut gizmo = TransformGizmo::new(GizmoMode::Rotate);
        let mut target = target();
        assert!(gizmo.pointer_down(&ray_to(2.0, 0.0, 0.0), eye(), &target).is_some());
        gizmo.pointer_move(&ray_to(0.0, 2.0, 0.0), eye(), &mut target);

        let turned = target.rotation.rotate_vector(Vector3::unit_x());
        assert_relative_eq!(turned.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(turned.y, 1.0, epsilon = 1e-4);
        assert_relative_eq!(turned.z, 0.0, epsilon = 1e-4);
        assert_eq!(target.position, Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn missing_every_handle_does_not_start_a_drag() {
        let mut gizmo = TransformGizmo::default();
        let target = target();
        assert_eq!(gizmo.pointer_down(&ray_to(-3.0, -3.0, 0.0), eye(), &target), None);
        assert!(!gizmo.is_dragging());
        assert_eq!(gizmo.pointer_up(), None);
    }

    #[test]
    fn drag_reports_start_change_and_end_in_order() {
        let mut gizmo = TransformGizmo::default();
        let mut target = target();
        let events = [
            gizmo.pointer_down(&ray_to(1.0, 0.0, 0.0), eye(), &target),
            gizmo.pointer_move(&ray_to(1.2, 0.0, 0.0), eye(), &mut target),
            gizmo.pointer_up(),
        ];
        assert_eq!(
            events,
            [
                Some(GizmoEvent::DraggingChanged(true)),
                Some(GizmoEvent::Change),
                Some(GizmoEvent::DraggingChanged(false)),
            ]
        );
    }

    #[test]
    fn mode_cannot_change_mid_drag() {
        let mut gizmo = TransformGizmo::default();
        let target = target();
        gizmo.pointer_down(&ray_to(1.0, 0.0, 0.0), eye(), &target);
        assert_eq!(gizmo.set_mode(GizmoMode::Rotate), None);
        gizmo.pointer_up();
        assert_eq!(gizmo.set_mode(GizmoMode::Rotate), Some(GizmoEvent::Change));
        assert_eq!(gizmo.mode, GizmoMode::Rotate);
    }

    #[test]
    fn line_counts_per_mode() {
        let mut gizmo = TransformGizmo::default();
        let origin = Point3::new(0.0, 0.0, 0.0);
        // Shaft plus four arrow head strokes per axis
        assert_eq!(gizmo.lines(eye(), origin).len(), 3 * 5 * 2);
        gizmo.set_mode(GizmoMode::Rotate);
        assert_eq!(gizmo.lines(eye(), origin).len(), 3 * RING_SEGMENTS * 2);
    }
}
