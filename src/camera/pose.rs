//! Camera pose in world space.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, orientation (radians) and field of view of a camera.
///
/// Camera-local axes: x = right, y = up, z = forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    /// Horizontal field of view in radians.
    pub fov: f32,
}

impl CameraPose {
    /// Rotation from camera-local to world space.
    ///
    /// Roll about forward, then pitch about right, then yaw about up.
    /// Positive yaw turns right, positive pitch looks up.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, self.roll)
    }

    /// Returns the camera-local (right, up, forward) axes in world space.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let rotation = self.rotation();
        (rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z)
    }

    /// Converts a camera-local offset to a world-space offset.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.rotation() * local
    }
}
