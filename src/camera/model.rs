//! Working camera with speed-scaled and unscaled relative movement.

use glam::Vec3;

use super::pose::CameraPose;

/// Default movement speed (world units per input unit).
pub const DEFAULT_MOVEMENT_SPEED: f32 = 0.03;
/// Default rotation speed (radians per input unit).
pub const DEFAULT_ROTATION_SPEED: f32 = 0.01;

/// Orientation applied by [`Camera::reset_angles`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DefaultAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// The camera the tool manipulates.
///
/// Every operation updates the absolute pose immediately. Translations are
/// also accumulated into a per-frame, camera-local delta which the live
/// camera can consume; [`Camera::reset_movement`] clears that delta only.
#[derive(Clone, Debug)]
pub struct Camera {
    pose: CameraPose,
    frame_delta: Vec3,
    movement_occurred: bool,
    movement_speed: f32,
    rotation_speed: f32,
    default_angles: DefaultAngles,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_MOVEMENT_SPEED, DEFAULT_ROTATION_SPEED)
    }
}

impl Camera {
    pub fn new(movement_speed: f32, rotation_speed: f32) -> Self {
        Self {
            pose: CameraPose::default(),
            frame_delta: Vec3::ZERO,
            movement_occurred: false,
            movement_speed,
            rotation_speed,
            default_angles: DefaultAngles::default(),
        }
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = pose;
    }

    /// Local translation accumulated since the last [`Camera::reset_movement`].
    pub fn frame_delta(&self) -> Vec3 {
        self.frame_delta
    }

    pub fn movement_occurred(&self) -> bool {
        self.movement_occurred
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    pub fn set_speeds(&mut self, movement_speed: f32, rotation_speed: f32) {
        self.movement_speed = movement_speed;
        self.rotation_speed = rotation_speed;
    }

    pub fn set_default_angles(&mut self, angles: DefaultAngles) {
        self.default_angles = angles;
    }

    pub fn move_forward(&mut self, amount: f32) {
        self.translate(Vec3::new(0.0, 0.0, amount * self.movement_speed));
    }

    pub fn move_right(&mut self, amount: f32) {
        self.translate(Vec3::new(amount * self.movement_speed, 0.0, 0.0));
    }

    pub fn move_up(&mut self, amount: f32) {
        self.translate(Vec3::new(0.0, amount * self.movement_speed, 0.0));
    }

    pub fn yaw(&mut self, amount: f32) {
        self.yaw_bokeh(amount * self.rotation_speed);
    }

    pub fn pitch(&mut self, amount: f32) {
        self.pitch_bokeh(amount * self.rotation_speed);
    }

    pub fn roll(&mut self, amount: f32) {
        self.roll_bokeh(amount * self.rotation_speed);
    }

    // Bokeh variants take raw world units / radians.

    pub fn move_forward_bokeh(&mut self, amount: f32) {
        self.translate(Vec3::new(0.0, 0.0, amount));
    }

    pub fn move_right_bokeh(&mut self, amount: f32) {
        self.translate(Vec3::new(amount, 0.0, 0.0));
    }

    pub fn move_up_bokeh(&mut self, amount: f32) {
        self.translate(Vec3::new(0.0, amount, 0.0));
    }

    pub fn yaw_bokeh(&mut self, radians: f32) {
        self.pose.yaw += radians;
        self.movement_occurred = true;
    }

    pub fn pitch_bokeh(&mut self, radians: f32) {
        self.pose.pitch += radians;
        self.movement_occurred = true;
    }

    pub fn roll_bokeh(&mut self, radians: f32) {
        self.pose.roll += radians;
        self.movement_occurred = true;
    }

    /// Zeroes the per-frame delta. The absolute pose is untouched.
    pub fn reset_movement(&mut self) {
        self.frame_delta = Vec3::ZERO;
        self.movement_occurred = false;
    }

    /// Restores the configured default orientation.
    pub fn reset_angles(&mut self) {
        self.pose.yaw = self.default_angles.yaw;
        self.pose.pitch = self.default_angles.pitch;
        self.pose.roll = self.default_angles.roll;
    }

    fn translate(&mut self, local: Vec3) {
        self.pose.position += self.pose.local_to_world(local);
        self.frame_delta += local;
        self.movement_occurred = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_moves_are_speed_scaled() {
        let mut camera = Camera::new(2.0, 0.5);
        camera.move_right(1.5);
        camera.yaw(1.0);

        assert!((camera.pose().position.x - 3.0).abs() < 1e-6);
        assert!((camera.pose().yaw - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bokeh_moves_are_unscaled() {
        let mut camera = Camera::new(2.0, 0.5);
        camera.move_up_bokeh(0.25);
        camera.pitch_bokeh(0.1);

        assert!((camera.pose().position.y - 0.25).abs() < 1e-6);
        assert!((camera.pose().pitch - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_reset_movement_keeps_pose() {
        let mut camera = Camera::new(1.0, 1.0);
        camera.move_forward(2.0);
        assert!(camera.movement_occurred());
        assert_eq!(camera.frame_delta(), Vec3::new(0.0, 0.0, 2.0));

        camera.reset_movement();

        assert_eq!(camera.frame_delta(), Vec3::ZERO);
        assert!(!camera.movement_occurred());
        assert!((camera.pose().position.z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_angles_restores_default() {
        let mut camera = Camera::new(1.0, 1.0);
        camera.set_default_angles(DefaultAngles { yaw: 0.0, pitch: 0.2, roll: 0.0 });
        camera.yaw(1.0);
        camera.roll(-0.3);
        camera.move_right(4.0);

        camera.reset_angles();

        assert_eq!(camera.pose().yaw, 0.0);
        assert_eq!(camera.pose().pitch, 0.2);
        assert_eq!(camera.pose().roll, 0.0);
        assert!((camera.pose().position.x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_translation_follows_orientation() {
        let mut camera = Camera::new(1.0, 1.0);
        camera.yaw_bokeh(std::f32::consts::FRAC_PI_2);
        camera.move_forward(1.0);

        let position = camera.pose().position;
        assert!((position.x - 1.0).abs() < 1e-5);
        assert!(position.z.abs() < 1e-5);
        // local delta stays in camera space
        assert_eq!(camera.frame_delta(), Vec3::new(0.0, 0.0, 1.0));
    }
}
