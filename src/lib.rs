//! telecam
//!
//! A camera-in-camera demo on wgpu and winit. An orbit controlled main camera
//! looks at a small scene that contains a second camera. Whatever the second
//! camera sees is rendered into an offscreen texture and shown on a virtual
//! screen inside the scene, optionally through a CRT filter. The second
//! camera is moved and turned with a transform gizmo.
//!
//! High-level modules
//! - `camera`: cameras, projections, picking rays and their uniforms
//! - `context`: window, surface and GPU handles
//! - `controls`: orbit controls and the transform gizmo
//! - `data_structures`: geometry, meshes, materials, textures and instances
//! - `demo`: input routing and the per-frame update
//! - `flow`: the winit event loop, native and web
//! - `pipelines`: lit, unlit, line and CRT render pipelines
//! - `render`: render batching and the three-pass frame
//! - `render_target`: offscreen colour and depth targets
//! - `resources`: loading of settings, glTF models and textures
//! - `scene`: the objects, lights and helpers of the demo scene
//! - `settings`: start-up settings from `assets/telecam.toml`

pub mod camera;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod demo;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod render_target;
pub mod resources;
pub mod scene;
pub mod settings;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    flow::run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
