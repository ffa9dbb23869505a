//! User input that moves things in the scene.

pub mod orbit;
pub mod transform;
