//! Capture state machine types.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shared state between the control thread and the frame producer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControllerState {
    /// No capture in progress; configuration may change.
    #[default]
    Off,
    /// Frames are being grabbed.
    Grabbing,
    /// All frames are in; the waiting caller may persist them.
    SavingShots,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Off => write!(f, "Off"),
            ControllerState::Grabbing => write!(f, "Grabbing"),
            ControllerState::SavingShots => write!(f, "Saving shots"),
        }
    }
}

/// Kind of capture a session performs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    #[default]
    Single,
    HorizontalPanorama,
    Lightfield,
    Bokeh,
}

impl std::fmt::Display for ShotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShotType::Single => write!(f, "Single"),
            ShotType::HorizontalPanorama => write!(f, "Horizontal panorama"),
            ShotType::Lightfield => write!(f, "Lightfield"),
            ShotType::Bokeh => write!(f, "Bokeh"),
        }
    }
}

/// How long a `start_*` call waits for the frame producer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait until the frames arrive. A producer that never delivers stalls
    /// the caller forever.
    #[default]
    Indefinite,
    /// Give up and drop the session after this long.
    Timeout(Duration),
}

impl WaitPolicy {
    /// `None` or zero means [`WaitPolicy::Indefinite`].
    pub fn from_millis(timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) if ms > 0 => WaitPolicy::Timeout(Duration::from_millis(ms)),
            _ => WaitPolicy::Indefinite,
        }
    }
}

/// How a blocking wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Cancelled,
    TimedOut,
}

/// One capture operation.
#[derive(Clone, Debug)]
pub struct CaptureSession {
    /// Incremented for every new session and on cancel, so a waiter can tell
    /// that its session is gone.
    pub id: u64,
    pub shot_type: ShotType,
    /// Frames delivered while grabbing, including the completing one, so it
    /// ends at `total_steps + 1`. See [`CaptureSession::step_index`].
    pub shot_counter: u32,
    /// Frames to keep.
    pub total_steps: u32,
    /// Angle (panorama) or distance (lightfield) between shots.
    pub step_size: f32,
    pub is_test_run: bool,
    /// Presents left before the next frame may be grabbed.
    pub frames_to_wait: u32,
    pub started_at: DateTime<Local>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self {
            id: 0,
            shot_type: ShotType::default(),
            shot_counter: 0,
            total_steps: 0,
            step_size: 0.0,
            is_test_run: false,
            frames_to_wait: 0,
            started_at: Local::now(),
        }
    }
}

impl CaptureSession {
    /// Number of stored frames, never above `total_steps`.
    pub fn step_index(&self) -> u32 {
        self.shot_counter.min(self.total_steps)
    }

    /// True once the completing delivery has arrived.
    pub fn is_complete(&self) -> bool {
        self.shot_counter > self.total_steps
    }

    /// Replaces this session with a fresh one, keeping the id sequence.
    pub fn restart(&mut self, shot_type: ShotType, total_steps: u32, step_size: f32, is_test_run: bool) -> u64 {
        *self = CaptureSession {
            id: self.id + 1,
            shot_type,
            total_steps,
            step_size,
            is_test_run,
            ..Default::default()
        };
        self.id
    }
}
