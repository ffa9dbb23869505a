//! The running demo: scene, cameras, controls and the frame loop body.
//!
//! Input goes to the gizmo first. Whatever the gizmo does not take drives
//! the orbit controls of the main camera.

use cgmath::{Deg, Point3};
use instant::Instant;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    camera::{Camera, Projection},
    context::Context,
    controls::{
        orbit::{OrbitAction, OrbitControls},
        transform::{GizmoEvent, GizmoMode, TransformGizmo},
    },
    render::{Renderer, Target},
    scene::Scene,
    settings::Settings,
};

// Pixels per wheel line on touchpads reporting pixel deltas
const PIXELS_PER_LINE: f64 = 100.0;

/// The mouse button that started the current gizmo or orbit drag. Only its
/// release ends the drag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct HeldButton(Option<MouseButton>);

impl HeldButton {
    fn is_held(&self) -> bool {
        self.0.is_some()
    }

    fn grab(&mut self, button: MouseButton) {
        self.0 = Some(button);
    }

    /// Returns true if releasing `button` ends the drag.
    fn release(&mut self, button: MouseButton) -> bool {
        if self.0 == Some(button) {
            self.0 = None;
            true
        } else {
            false
        }
    }
}

pub struct Demo {
    pub settings: Settings,
    pub renderer: Renderer,
    pub scene: Scene,
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub gizmo: TransformGizmo,
    pub crt: bool,
    viewport: [u32; 2],
    cursor: PhysicalPosition<f64>,
    held: HeldButton,
    start: Instant,
}

impl Demo {
    pub async fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        viewport: [u32; 2],
        settings: Settings,
    ) -> Self {
        let renderer = Renderer::new(
            device,
            queue,
            format,
            settings.render_target_size,
            settings.clear_colour(),
        );
        let [width, height] = [viewport[0].max(1), viewport[1].max(1)];
        let scene = Scene::new(
            device,
            queue,
            &renderer.pipelines.material_layout,
            &renderer.pipelines.light_layout,
            &renderer.fallback,
            &settings,
            [width, height],
        )
        .await;

        let mut camera = Camera::new(
            (0.0, 0.0, 5.0),
            Projection::perspective(Deg(75.0), width as f32 / height as f32, 0.1, 1000.0),
        );
        let target = Point3::new(0.0, 0.0, 0.0);
        camera.look_at(target);
        let orbit = OrbitControls::new(target).with_damping(settings.damping_factor);
        let gizmo = TransformGizmo::new(settings.gizmo_mode);
        log::info!(
            "Scene ready: {} objects, gizmo in {:?} mode, crt {}",
            scene.objects.len(),
            settings.gizmo_mode,
            settings.crt
        );

        Self {
            crt: settings.crt,
            settings,
            renderer,
            scene,
            camera,
            orbit,
            gizmo,
            viewport: [width, height],
            cursor: PhysicalPosition::new(0.0, 0.0),
            held: HeldButton::default(),
            start: Instant::now(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = [width, height];
        self.camera.projection.resize(width, height);
    }

    pub fn set_gizmo_mode(&mut self, queue: &wgpu::Queue, mode: GizmoMode) {
        let event = self.gizmo.set_mode(mode);
        self.on_gizmo_event(queue, event);
    }

    pub fn toggle_crt(&mut self) {
        self.crt = !self.crt;
        log::info!("CRT effect {}", if self.crt { "on" } else { "off" });
    }

    /// Routes a window event to the controls.
    pub fn window_event(&mut self, queue: &wgpu::Queue, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.pointer_moved(queue, *position),
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_input(queue, *button, *state == ElementState::Pressed)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.orbit.wheel(lines);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::KeyR => self.set_gizmo_mode(queue, GizmoMode::Rotate),
                KeyCode::KeyT => self.set_gizmo_mode(queue, GizmoMode::Translate),
                KeyCode::KeyC => self.toggle_crt(),
                _ => {}
            },
            _ => {}
        }
    }

    fn pointer_moved(&mut self, queue: &wgpu::Queue, position: PhysicalPosition<f64>) {
        self.cursor = position;
        let [width, height] = self.viewport;
        let ray = self.camera.cast_ray(position, width as f32, height as f32);
        let event = self
            .gizmo
            .pointer_move(&ray, self.camera.position, &mut self.scene.texture_camera);
        self.on_gizmo_event(queue, event);
        if !self.gizmo.is_dragging() {
            self.orbit.pointer_move(position, height as f32, &self.camera);
        }
    }

    fn mouse_input(&mut self, queue: &wgpu::Queue, button: MouseButton, pressed: bool) {
        if !pressed {
            if self.held.release(button) {
                let event = self.gizmo.pointer_up();
                self.on_gizmo_event(queue, event);
                self.orbit.pointer_up();
            }
            return;
        }
        if self.held.is_held() {
            return;
        }
        if button == MouseButton::Left {
            let [width, height] = self.viewport;
            let ray = self.camera.cast_ray(self.cursor, width as f32, height as f32);
            let event = self
                .gizmo
                .pointer_down(&ray, self.camera.position, &self.scene.texture_camera);
            if event.is_some() {
                self.held.grab(button);
                self.on_gizmo_event(queue, event);
                return;
            }
        }
        let action = match button {
            MouseButton::Left => OrbitAction::Rotate,
            MouseButton::Right | MouseButton::Middle => OrbitAction::Pan,
            _ => return,
        };
        self.held.grab(button);
        self.orbit.pointer_down(action, self.cursor);
    }

    fn on_gizmo_event(&mut self, queue: &wgpu::Queue, event: Option<GizmoEvent>) {
        match event {
            Some(GizmoEvent::Change) => self.scene.update_helper(queue),
            Some(GizmoEvent::DraggingChanged(dragging)) => {
                log::debug!("Gizmo dragging {}", dragging);
                self.orbit.enabled = !dragging;
                if dragging {
                    self.orbit.pointer_up();
                }
            }
            None => {}
        }
    }

    /// Per-frame state: orbit damping and gizmo handles facing the new eye.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.orbit.update(&mut self.camera);
        self.scene
            .update_gizmo(queue, &self.gizmo, self.camera.position);
    }

    pub fn render(&mut self, ctx: &Context) -> Result<(), wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.renderer.render_frame(
            &ctx.device,
            &ctx.queue,
            Target {
                colour: &view,
                depth: &ctx.depth_texture.view,
            },
            &mut self.scene,
            &self.camera,
            self.crt,
            self.start.elapsed().as_secs_f32(),
        );
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_grabbing_button_ends_a_drag() {
        let mut held = HeldButton::default();
        held.grab(MouseButton::Left);

        assert!(!held.release(MouseButton::Right));
        assert!(held.is_held());
        assert!(held.release(MouseButton::Left));
        assert!(!held.is_held());
    }

    #[test]
    fn release_without_a_drag_is_ignored() {
        let mut held = HeldButton::default();
        assert!(!held.release(MouseButton::Left));
        assert_eq!(held, HeldButton(None));
    }
}
