//! Camera model used by the free camera and the capture sequencer.
//!
//! This module provides:
//! - The pose type shared with the live camera (`CameraPose`)
//! - Relative, camera-local movement with normal and bokeh variants (`Camera`)
//! - The boundary to the game's own camera (`LiveCamera`)

pub mod live;
pub mod model;
pub mod pose;

pub use live::{LiveCamera, PoseMirror, DEFAULT_FOV, FOV_RANGE};
pub use model::{Camera, DefaultAngles, DEFAULT_MOVEMENT_SPEED, DEFAULT_ROTATION_SPEED};
pub use glam::Vec3;
pub use pose::CameraPose;
