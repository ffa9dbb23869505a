//! Start-up settings read from `assets/telecam.toml`.
//!
//! Every field has a default, so the file may be partial or missing.

use anyhow::Context;
use serde::Deserialize;

use crate::{controls::transform::GizmoMode, resources::load_string};

pub const SETTINGS_FILE: &str = "telecam.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    /// Linear RGBA the surface and both render targets are cleared with.
    pub clear_colour: [f64; 4],
    /// Width and height of the offscreen targets in pixels.
    pub render_target_size: u32,
    pub crt: bool,
    pub gizmo_mode: GizmoMode,
    pub damping_factor: f32,
    /// Aspect ratio of the texture camera. Defaults to the window's aspect
    /// at start-up.
    pub texture_camera_aspect: Option<f32>,
    pub screen: ScreenSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "telecam".to_string(),
            clear_colour: [0.0, 0.0, 0.0, 1.0],
            render_target_size: 512,
            crt: false,
            gizmo_mode: GizmoMode::Translate,
            damping_factor: 0.05,
            texture_camera_aspect: None,
            screen: ScreenSettings::Plane,
        }
    }
}

/// What shows the texture camera's picture in the main scene.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScreenSettings {
    /// A floating unlit plane next to the cube.
    #[default]
    Plane,
    /// A glTF model whose mesh named `screen_mesh` gets the picture.
    Model {
        path: String,
        #[serde(default = "default_screen_mesh")]
        screen_mesh: String,
        #[serde(default)]
        position: [f32; 3],
        #[serde(default = "default_scale")]
        scale: f32,
        /// Degrees around +Y.
        #[serde(default)]
        rotation_y: f32,
    },
}

fn default_screen_mesh() -> String {
    "screen".to_string()
}

fn default_scale() -> f32 {
    1.0
}

impl Settings {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(text).context("Invalid settings")?;
        Ok(settings.sanitised())
    }

    /// Loads the settings file through the asset loader. A file that cannot
    /// be read yields the defaults, a file that cannot be parsed is an error.
    pub async fn load(file_name: &str) -> anyhow::Result<Self> {
        match load_string(file_name).await {
            Ok(text) => Self::from_toml(&text).with_context(|| format!("Failed to parse {file_name}")),
            Err(e) => {
                log::info!("No settings loaded from {}: {}. Using defaults", file_name, e);
                Ok(Self::default())
            }
        }
    }

    fn sanitised(mut self) -> Self {
        if self.render_target_size == 0 {
            log::warn!("render_target_size must be positive, using 512");
            self.render_target_size = 512;
        }
        self.damping_factor = self.damping_factor.clamp(0.0, 1.0);
        if let Some(aspect) = self.texture_camera_aspect {
            if !(aspect.is_finite() && aspect > 0.0) {
                log::warn!("Ignoring texture_camera_aspect {}", aspect);
                self.texture_camera_aspect = None;
            }
        }
        self
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_colour;
        wgpu::Color { r, g, b, a }
    }

    pub fn texture_camera_aspect(&self, viewport: [u32; 2]) -> f32 {
        let [width, height] = viewport;
        self.texture_camera_aspect
            .unwrap_or(width.max(1) as f32 / height.max(1) as f32)
    }
}
