//! Step geometry for multi-shot sequences.

/// Step angle and shot count of a horizontal panorama.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanoramaGeometry {
    /// Yaw between two consecutive shots, in radians.
    pub angle_per_step: f32,
    pub shot_count: u32,
}

/// Computes the panorama steps for a sweep of `total_fov` radians taken with
/// a lens of `current_fov` radians, overlapping by `overlap_percent`.
///
/// `angle_per_step = current_fov * (100 - overlap) / 100` and
/// `shot_count = floor(total_fov / angle_per_step) + 1`.
pub fn panorama_geometry(total_fov: f32, overlap_percent: f32, current_fov: f32) -> PanoramaGeometry {
    let angle_per_step = current_fov * ((100.0 - overlap_percent) / 100.0);
    let shot_count = if angle_per_step > 0.0 {
        // the cast saturates, so a tiny step cannot wrap
        ((total_fov / angle_per_step).floor() as u32).saturating_add(1)
    } else {
        1
    };
    PanoramaGeometry { angle_per_step, shot_count }
}

/// Offset of the first shot: half the sequence before the starting pose.
pub fn start_offset(step_size: f32, shot_count: u32) -> f32 {
    -(0.5 * shot_count as f32) * step_size
}

/// Offset of shot `index` (0-based) relative to the starting pose.
pub fn shot_offset(step_size: f32, shot_count: u32, index: u32) -> f32 {
    start_offset(step_size, shot_count) + index as f32 * step_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_panorama_geometry() {
        let fov = 1.0;
        let geometry = panorama_geometry(110.0_f32.to_radians(), 70.0, fov);

        assert!((geometry.angle_per_step - 0.3).abs() < 1e-6);
        // 1.9199 / 0.3 = 6.4 -> 6 + 1
        assert_eq!(geometry.shot_count, 7);
    }

    #[test]
    fn test_panorama_geometry_over_overlap_range() {
        for overlap in [0.1_f32, 10.0, 50.0, 80.0, 99.0] {
            for fov in [0.2_f32, 0.9, 1.34, 3.0] {
                let total = PI;
                let g = panorama_geometry(total, overlap, fov);
                let expected_step = fov * ((100.0 - overlap) / 100.0);
                assert!((g.angle_per_step - expected_step).abs() < 1e-6);
                assert_eq!(g.shot_count, (total / expected_step).floor() as u32 + 1);
            }
        }
    }

    #[test]
    fn test_tiny_fov_saturates_shot_count() {
        let g = panorama_geometry(PI, 50.0, 1e-30);
        assert_eq!(g.shot_count, u32::MAX);
    }

    #[test]
    fn test_lightfield_offsets() {
        let offsets: Vec<f32> = (0..3).map(|i| shot_offset(1.0, 3, i)).collect();
        assert_eq!(offsets, vec![-1.5, -0.5, 0.5]);
    }

    #[test]
    fn test_last_offset_is_start_plus_steps() {
        let step = 0.25;
        let count = 9;
        let last = shot_offset(step, count, count - 1);
        assert!((last - (start_offset(step, count) + (count - 1) as f32 * step)).abs() < 1e-6);
    }
}
