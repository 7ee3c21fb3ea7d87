//! Boundary to the camera the game actually renders with.

use std::sync::Mutex;

use super::model::Camera;
use super::pose::CameraPose;

/// Field of view reported when the live camera does not know better.
pub const DEFAULT_FOV: f32 = 1.34;

/// Narrowest and widest field of view a live camera is set to, in radians.
pub const FOV_RANGE: (f32, f32) = (0.01, 3.1);

/// The game-side camera the working [`Camera`] is pushed into.
///
/// Implementations are called from both the control thread and the frame
/// producer, and must not call back into the capture controller.
pub trait LiveCamera: Send + Sync {
    /// Applies the working camera to the live game state.
    fn apply(&self, camera: &Camera);

    /// Current horizontal field of view of the live camera, in radians.
    fn current_fov(&self) -> f32 {
        DEFAULT_FOV
    }

    /// Remembers the live camera before a multi-shot or the free camera starts.
    fn cache_original(&self) {}

    /// Puts back what [`LiveCamera::cache_original`] remembered.
    fn restore_original(&self) {}

    /// Widens (positive) or narrows (negative) the field of view by `delta` radians.
    fn change_fov(&self, _delta: f32) {}

    /// Returns the field of view to the game's own value.
    fn reset_fov(&self) {}
}

/// A live camera that keeps the last pose it was given.
#[derive(Debug, Default)]
pub struct PoseMirror {
    pose: Mutex<CameraPose>,
    cached: Mutex<Option<CameraPose>>,
    fov: Mutex<f32>,
    /// Value restored by `reset_fov`
    game_fov: f32,
}

impl PoseMirror {
    pub fn new(fov: f32) -> Self {
        Self {
            pose: Mutex::new(CameraPose { fov, ..Default::default() }),
            cached: Mutex::new(None),
            fov: Mutex::new(fov),
            game_fov: fov,
        }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose.lock().map(|p| *p).unwrap_or_default()
    }

    fn set_fov(&self, fov: f32) {
        if let Ok(mut current) = self.fov.lock() {
            *current = fov;
        }
        if let Ok(mut pose) = self.pose.lock() {
            pose.fov = fov;
        }
    }
}

impl LiveCamera for PoseMirror {
    fn apply(&self, camera: &Camera) {
        let fov = self.current_fov();
        if let Ok(mut pose) = self.pose.lock() {
            *pose = CameraPose { fov, ..*camera.pose() };
        }
    }

    fn current_fov(&self) -> f32 {
        let fov = self.fov.lock().map(|f| *f).unwrap_or_default();
        if fov > 0.0 { fov } else { DEFAULT_FOV }
    }

    fn change_fov(&self, delta: f32) {
        let (min, max) = FOV_RANGE;
        self.set_fov((self.current_fov() + delta).clamp(min, max));
    }

    fn reset_fov(&self) {
        self.set_fov(self.game_fov);
    }

    fn cache_original(&self) {
        let current = self.pose();
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(current);
        }
    }

    fn restore_original(&self) {
        let cached = self.cached.lock().ok().and_then(|mut c| c.take());
        if let (Some(original), Ok(mut pose)) = (cached, self.pose.lock()) {
            *pose = original;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_tracks_and_restores() {
        let mirror = PoseMirror::new(0.9);
        let mut camera = Camera::new(1.0, 1.0);

        mirror.cache_original();
        camera.move_right(2.0);
        mirror.apply(&camera);
        assert!((mirror.pose().position.x - 2.0).abs() < 1e-6);
        assert_eq!(mirror.pose().fov, 0.9);

        mirror.restore_original();
        assert_eq!(mirror.pose().position.x, 0.0);
    }

    #[test]
    fn test_fov_changes_clamp_and_reset() {
        let mirror = PoseMirror::new(1.0);

        mirror.change_fov(0.25);
        assert!((mirror.current_fov() - 1.25).abs() < 1e-6);
        assert!((mirror.pose().fov - 1.25).abs() < 1e-6);

        mirror.change_fov(-10.0);
        assert_eq!(mirror.current_fov(), FOV_RANGE.0);

        mirror.reset_fov();
        assert_eq!(mirror.current_fov(), 1.0);
        mirror.apply(&Camera::new(1.0, 1.0));
        assert_eq!(mirror.pose().fov, 1.0);
    }

    #[test]
    fn test_default_fov_fallback() {
        assert_eq!(PoseMirror::default().current_fov(), DEFAULT_FOV);
    }
}
