//! Settings for the camera, multi-shot captures and bokeh rendering.
//!
//! Loaded from config.json at startup and passed explicitly to the
//! orchestration loop. Missing fields take their defaults; out-of-range
//! values are clamped by [`Settings::sanitize`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::blend::{BlendPolicy, Gamma, GammaMode};
use crate::camera::{DEFAULT_MOVEMENT_SPEED, DEFAULT_ROTATION_SPEED};
use crate::capture::WaitPolicy;
use crate::output::ScreenshotFileType;

/// Which sequence `TakeMultiShot` runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiShotType {
    HorizontalPanorama,
    #[default]
    Lightfield,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    pub screenshot: ScreenshotSettings,
    pub bokeh: BokehSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub movement_speed: f32,
    pub rotation_speed: f32,
    /// Applied while the fast modifier is held
    pub fast_movement_multiplier: f32,
    /// Applied while the slow modifier is held
    pub slow_movement_multiplier: f32,
    /// Scales raw mouse deltas to rotation input
    pub mouse_speed_correction: f32,
    /// Radians the field of view changes per frame while a fov key is held
    pub fov_change_speed: f32,
}

/// Default and largest `fov_change_speed`.
pub const DEFAULT_FOV_CHANGE_SPEED: f32 = 0.005;

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            movement_speed: DEFAULT_MOVEMENT_SPEED,
            rotation_speed: DEFAULT_ROTATION_SPEED,
            fast_movement_multiplier: 10.0,
            slow_movement_multiplier: 0.1,
            mouse_speed_correction: 0.2,
            fov_change_speed: DEFAULT_FOV_CHANGE_SPEED,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotSettings {
    pub number_of_frames_to_wait_between_steps: u32,
    pub distance_between_lightfield_shots: f32,
    pub number_of_shots_to_take: u32,
    pub type_of_screenshot: MultiShotType,
    pub file_type: ScreenshotFileType,
    pub total_pano_angle_degrees: f32,
    pub overlap_percentage_per_pano_shot: f32,
    pub screenshot_folder: PathBuf,
    /// Give up on a capture after this many milliseconds. Absent or 0 waits forever.
    pub wait_timeout_ms: Option<u64>,
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            number_of_frames_to_wait_between_steps: 1,
            distance_between_lightfield_shots: 1.0,
            number_of_shots_to_take: 45,
            type_of_screenshot: MultiShotType::default(),
            file_type: ScreenshotFileType::default(),
            total_pano_angle_degrees: 110.0,
            overlap_percentage_per_pano_shot: 80.0,
            screenshot_folder: crate::paths::default_screenshots_dir(),
            wait_timeout_ms: None,
        }
    }
}

impl ScreenshotSettings {
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BokehSettings {
    /// 0.001 (near) to 1.0 (far)
    pub focusing_distance: f32,
    /// Aperture scale, multiplies `radius`
    pub shape_size: u32,
    pub gamma_correction: f32,
    pub gamma_mode: GammaMode,
    pub number_of_rings: u32,
    pub points_first_ring: u32,
    /// -1.0..=1.0, negative squeezes vertically, positive horizontally
    pub anamorphism: f32,
    /// Rotate each ring by `offset * ring` instead of `offset`
    pub offset_per_ring: bool,
    pub offset: f32,
    /// Capture only once, after the last sample position
    pub only_last_shot: bool,
    /// Aperture radius per unit of `shape_size`, in world units
    pub radius: f64,
}

impl Default for BokehSettings {
    fn default() -> Self {
        Self {
            focusing_distance: 1.0,
            shape_size: 1,
            gamma_correction: 2.2,
            gamma_mode: GammaMode::default(),
            number_of_rings: 12,
            points_first_ring: 8,
            anamorphism: 0.0,
            offset_per_ring: false,
            offset: 0.0,
            only_last_shot: true,
            radius: 0.001,
        }
    }
}

impl BokehSettings {
    pub fn blend_policy(&self) -> BlendPolicy {
        if self.only_last_shot {
            BlendPolicy::LastSampleOnly
        } else {
            BlendPolicy::AllSamples
        }
    }

    pub fn gamma(&self) -> Gamma {
        Gamma::new(self.gamma_correction, self.gamma_mode)
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        info!("Looking for config at: {}", path.display());

        if !path.exists() {
            info!("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    info!("Config loaded from {}", path.display());
                    settings.sanitize()
                }
                Err(e) => {
                    warn!("Failed to parse config.json: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config.json: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Clamps every value to the range the capture code supports.
    pub fn sanitize(mut self) -> Self {
        let camera = &mut self.camera;
        camera.movement_speed = camera.movement_speed.max(0.0);
        camera.rotation_speed = camera.rotation_speed.max(0.0);
        camera.fast_movement_multiplier = camera.fast_movement_multiplier.max(0.0);
        camera.slow_movement_multiplier = camera.slow_movement_multiplier.max(0.0);
        camera.fov_change_speed =
            clamp_or(camera.fov_change_speed, 0.0, DEFAULT_FOV_CHANGE_SPEED, DEFAULT_FOV_CHANGE_SPEED);

        let shot = &mut self.screenshot;
        shot.number_of_frames_to_wait_between_steps =
            shot.number_of_frames_to_wait_between_steps.clamp(1, 100);
        shot.distance_between_lightfield_shots =
            shot.distance_between_lightfield_shots.clamp(0.0, 100.0);
        shot.number_of_shots_to_take = shot.number_of_shots_to_take.min(45);
        shot.total_pano_angle_degrees = clamp_or(shot.total_pano_angle_degrees, 30.0, 360.0, 110.0);
        shot.overlap_percentage_per_pano_shot =
            clamp_or(shot.overlap_percentage_per_pano_shot, 0.1, 99.0, 80.0);

        let bokeh = &mut self.bokeh;
        bokeh.focusing_distance = bokeh.focusing_distance.clamp(0.001, 1.0);
        bokeh.shape_size = bokeh.shape_size.clamp(1, 100);
        bokeh.gamma_correction = bokeh.gamma_correction.clamp(1.0, 3.0);
        bokeh.number_of_rings = bokeh.number_of_rings.clamp(1, 100);
        bokeh.points_first_ring = bokeh.points_first_ring.max(1);
        bokeh.anamorphism = bokeh.anamorphism.clamp(-1.0, 1.0);
        bokeh.offset = bokeh.offset.clamp(0.0, 10.0);
        if !(bokeh.radius > 0.0) {
            bokeh.radius = BokehSettings::default().radius;
        }
        self
    }
}

/// Clamps `value` into `min..=max`, using `default` for NaN.
pub fn clamp_or(value: f32, min: f32, max: f32, default: f32) -> f32 {
    if value.is_nan() { default } else { value.clamp(min, max) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("config.json"));

        assert_eq!(settings.screenshot.number_of_shots_to_take, 45);
        assert_eq!(settings.bokeh.number_of_rings, 12);
        assert!(settings.bokeh.only_last_shot);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "screenshot": { "file_type": "png", "type_of_screenshot": "horizontal_panorama" },
                 "bokeh": { "only_last_shot": false, "gamma_mode": "fast" } }"#,
        )
        .unwrap();

        let settings = Settings::load(&path);

        assert_eq!(settings.screenshot.file_type, ScreenshotFileType::Png);
        assert_eq!(settings.screenshot.type_of_screenshot, MultiShotType::HorizontalPanorama);
        assert_eq!(settings.screenshot.total_pano_angle_degrees, 110.0);
        assert_eq!(settings.bokeh.blend_policy(), BlendPolicy::AllSamples);
        assert_eq!(settings.bokeh.gamma_mode, GammaMode::Fast);
    }

    #[test]
    fn test_invalid_json_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let settings = Settings::load(&path);

        assert_eq!(settings.screenshot.number_of_frames_to_wait_between_steps, 1);
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut settings = Settings::default();
        settings.screenshot.number_of_frames_to_wait_between_steps = 0;
        settings.screenshot.number_of_shots_to_take = 500;
        settings.screenshot.total_pano_angle_degrees = 720.0;
        settings.screenshot.overlap_percentage_per_pano_shot = f32::NAN;
        settings.bokeh.gamma_correction = 5.0;
        settings.bokeh.number_of_rings = 0;
        settings.bokeh.anamorphism = -3.0;
        settings.camera.fov_change_speed = 1.0;

        let settings = settings.sanitize();

        assert_eq!(settings.screenshot.number_of_frames_to_wait_between_steps, 1);
        assert_eq!(settings.screenshot.number_of_shots_to_take, 45);
        assert_eq!(settings.screenshot.total_pano_angle_degrees, 360.0);
        assert_eq!(settings.screenshot.overlap_percentage_per_pano_shot, 80.0);
        assert_eq!(settings.bokeh.gamma_correction, 3.0);
        assert_eq!(settings.bokeh.number_of_rings, 1);
        assert_eq!(settings.bokeh.anamorphism, -1.0);
        assert_eq!(settings.camera.fov_change_speed, DEFAULT_FOV_CHANGE_SPEED);
    }

    #[test]
    fn test_wait_policy_from_settings() {
        let mut settings = ScreenshotSettings::default();
        assert_eq!(settings.wait_policy(), WaitPolicy::Indefinite);
        settings.wait_timeout_ms = Some(1500);
        assert_eq!(
            settings.wait_policy(),
            WaitPolicy::Timeout(std::time::Duration::from_millis(1500))
        );
    }
}
