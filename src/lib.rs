//! Animated ensō hero background: a hand-drawn brush circle that draws
//! itself in, then blooms, and reacts to page scroll.

pub mod config;
pub mod curve;
pub mod ribbon;
pub mod shading;

// Scene timing and state
pub mod animation;
pub mod schedule;
pub mod camera;
pub mod particles;
pub mod rings;
pub mod director;

pub mod gpu;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
