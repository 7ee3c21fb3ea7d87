//! Multi-shot capture sequencing.
//!
//! This module provides:
//! - Panorama and lightfield step geometry (`panorama_geometry`, `shot_offset`)
//! - Session and state types (`ControllerState`, `ShotType`, `WaitPolicy`)
//! - The blocking capture sequencer shared with the frame producer
//!   (`ScreenshotController`)

pub mod controller;
pub mod geometry;
pub mod session;

pub use controller::{ControllerConfig, ScreenshotController};
pub use geometry::{panorama_geometry, shot_offset, start_offset, PanoramaGeometry};
pub use session::{CaptureSession, ControllerState, ShotType, WaitOutcome, WaitPolicy};
