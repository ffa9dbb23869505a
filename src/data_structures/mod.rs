//! Engine data structures: geometry, meshes, materials, textures and transforms.
//!
//! - `geometry` builds primitive shapes (box, plane) on the CPU
//! - `model` contains mesh and material definitions and GPU resources for them
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-object transformation data

pub mod geometry;
pub mod instance;
pub mod model;
pub mod texture;
