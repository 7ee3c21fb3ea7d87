//! Walks the working camera through a bokeh sampling plan.

use tracing::debug;

use super::plan::{BokehSample, BokehSamplingPlan};
use crate::camera::Camera;

/// Moves the camera from one aperture sample to the next.
///
/// Each step first takes back the offsets of the previous sample, so the
/// camera never drifts from the pose it started at. All moves use the
/// unscaled bokeh operations.
#[derive(Clone, Debug)]
pub struct BokehSampler {
    samples: Vec<BokehSample>,
    next: usize,
    applied: Option<BokehSample>,
}

impl BokehSampler {
    pub fn new(plan: &BokehSamplingPlan) -> Self {
        let samples: Vec<_> = plan.samples().collect();
        debug!("Bokeh plan: {} rings, {} samples", plan.rings(), samples.len());
        Self {
            samples,
            next: 0,
            applied: None,
        }
    }

    pub fn total_samples(&self) -> u32 {
        self.samples.len() as u32
    }

    /// Samples visited so far.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.samples.len()
    }

    /// Moves `camera` to the next sample. Returns `None` once every sample
    /// has been visited; the last offsets stay applied until [`Self::undo`].
    pub fn step(&mut self, camera: &mut Camera) -> Option<BokehSample> {
        let sample = *self.samples.get(self.next)?;
        self.undo(camera);

        if sample.y != 0.0 {
            camera.move_right_bokeh(sample.y as f32);
        }
        if sample.x != 0.0 {
            camera.move_up_bokeh(sample.x as f32);
        }
        if sample.yaw != 0.0 {
            camera.yaw_bokeh(sample.yaw as f32);
        }
        if sample.pitch != 0.0 {
            camera.pitch_bokeh(sample.pitch as f32);
        }

        self.applied = Some(sample);
        self.next += 1;
        Some(sample)
    }

    /// Takes back the offsets of the current sample, if any.
    pub fn undo(&mut self, camera: &mut Camera) {
        let Some(previous) = self.applied.take() else {
            return;
        };
        // rotation first, so the moves run along the axes they were made on
        if previous.pitch != 0.0 {
            camera.pitch_bokeh(-previous.pitch as f32);
        }
        if previous.yaw != 0.0 {
            camera.yaw_bokeh(-previous.yaw as f32);
        }
        if previous.x != 0.0 {
            camera.move_up_bokeh(-previous.x as f32);
        }
        if previous.y != 0.0 {
            camera.move_right_bokeh(-previous.y as f32);
        }
    }
}
