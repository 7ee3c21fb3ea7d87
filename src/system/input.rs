//! Input boundary of the orchestration loop.
//!
//! Device polling and key binding live outside this crate; the loop only
//! asks whether an action fired this frame.

use std::collections::{HashSet, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    CameraEnable,
    CameraLock,
    TakeScreenshot,
    TakeMultiShot,
    TestMultiShotSetup,
    TakeBokehShot,
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    RotateUp,
    RotateDown,
    RotateLeft,
    RotateRight,
    TiltLeft,
    TiltRight,
    FovReset,
    FovDecrease,
    FovIncrease,
}

/// Speed modifier held while moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Modifier {
    #[default]
    None,
    Fast,
    Slow,
}

pub trait InputSource: Send {
    /// Polls devices. Called once at the start of every frame.
    fn begin_frame(&mut self) {}

    /// True when `action` fired this frame. With `continuous` set, a held
    /// binding counts every frame; otherwise only the initial press does.
    fn is_action_activated(&mut self, action: Action, continuous: bool) -> bool;

    /// Mouse movement since the last call, in raw counts.
    fn mouse_delta(&mut self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn modifier(&mut self) -> Modifier {
        Modifier::None
    }
}

/// Replays queued frames of actions, one frame per `advance`.
///
/// Held actions count for continuous queries only.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Vec<Action>>,
    pressed: HashSet<Action>,
    held: HashSet<Action>,
    mouse: (f32, f32),
    modifier: Modifier,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a frame in which `actions` are pressed.
    pub fn press(mut self, actions: &[Action]) -> Self {
        self.frames.push_back(actions.to_vec());
        self
    }

    /// Queues a frame with no input.
    pub fn idle(mut self) -> Self {
        self.frames.push_back(Vec::new());
        self
    }

    pub fn hold(&mut self, action: Action) {
        self.held.insert(action);
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn set_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.mouse = (dx, dy);
    }

    pub fn set_modifier(&mut self, modifier: Modifier) {
        self.modifier = modifier;
    }

    /// Advances to the next queued frame. Returns false when none is left.
    pub fn advance(&mut self) -> bool {
        match self.frames.pop_front() {
            Some(actions) => {
                self.pressed = actions.into_iter().collect();
                true
            }
            None => {
                self.pressed.clear();
                false
            }
        }
    }

    pub fn remaining_frames(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn begin_frame(&mut self) {
        self.advance();
    }

    fn is_action_activated(&mut self, action: Action, continuous: bool) -> bool {
        if self.pressed.remove(&action) {
            return true;
        }
        continuous && self.held.contains(&action)
    }

    fn mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse)
    }

    fn modifier(&mut self) -> Modifier {
        self.modifier
    }
}
