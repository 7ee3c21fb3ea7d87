//! Storage for grabbed frames and the bokeh composite.
//!
//! Plain data: the controller decides when to store, when a session is
//! complete and who gets woken up. Nothing here locks or logs notifications.

use serde::{Deserialize, Serialize};

use super::gamma::{saturating_add, to_byte, Gamma, CHANNEL_MAX};

const CHANNELS: usize = 4;

/// How bokeh samples are folded into the composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendPolicy {
    /// Every sample is linearized, weighted by `1 / total` and summed.
    AllSamples,
    /// The composite is the most recent sample, unweighted.
    #[default]
    LastSampleOnly,
}

/// Parameters of the running bokeh blend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BokehBlend {
    pub policy: BlendPolicy,
    pub gamma: Gamma,
    /// Number of samples the composite is averaged over.
    pub total_samples: u32,
}

impl BokehBlend {
    fn weight(&self) -> f32 {
        1.0 / self.total_samples.max(1) as f32
    }
}

/// Collected frames for per-frame export plus the floating-point composite.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    frames: Vec<Vec<u8>>,
    composite: Vec<f32>,
    blend: Option<BokehBlend>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a grabbed frame, taking ownership of it.
    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.frames.push(frame);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Moves the collected frames out, in capture order.
    pub fn take_frames(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.frames)
    }

    /// Sets the blend used by [`FrameAccumulator::add_bokeh_sample`] and
    /// drops any previous composite.
    pub fn start_composite(&mut self, blend: BokehBlend) {
        self.composite.clear();
        self.blend = Some(blend);
    }

    pub fn blend(&self) -> Option<&BokehBlend> {
        self.blend.as_ref()
    }

    pub fn has_composite(&self) -> bool {
        !self.composite.is_empty()
    }

    pub fn composite(&self) -> &[f32] {
        &self.composite
    }

    /// Folds one RGBA8 sample into the composite.
    ///
    /// Returns false (and leaves the composite alone) when no blend was
    /// started, when the sample is not whole RGBA pixels, or when its size
    /// does not match the composite started by an earlier sample.
    pub fn add_bokeh_sample(&mut self, sample: &[u8]) -> bool {
        let Some(blend) = self.blend else {
            return false;
        };
        if sample.len() % CHANNELS != 0 {
            return false;
        }
        if !self.composite.is_empty() && self.composite.len() != sample.len() {
            return false;
        }

        match blend.policy {
            BlendPolicy::AllSamples => {
                if self.composite.is_empty() {
                    self.composite = vec![0.0; sample.len()];
                }
                let weight = blend.weight();
                for (acc, raw) in self
                    .composite
                    .chunks_exact_mut(CHANNELS)
                    .zip(sample.chunks_exact(CHANNELS))
                {
                    for c in 0..3 {
                        acc[c] = saturating_add(acc[c], blend.gamma.decode(raw[c]) * weight);
                    }
                    acc[3] = CHANNEL_MAX;
                }
            }
            BlendPolicy::LastSampleOnly => {
                self.composite.clear();
                self.composite
                    .extend(sample.iter().map(|&raw| raw as f32 / 255.0));
            }
        }
        true
    }

    /// Converts the composite back to RGBA8 with an opaque alpha channel.
    ///
    /// All-samples composites are gamma-encoded, last-sample composites are
    /// only rescaled. Returns `None` when no sample was added.
    pub fn composite_to_frame(&self) -> Option<Vec<u8>> {
        if self.composite.is_empty() {
            return None;
        }
        let blend = self.blend?;
        let mut frame = Vec::with_capacity(self.composite.len());
        for pixel in self.composite.chunks_exact(CHANNELS) {
            for &channel in &pixel[..3] {
                frame.push(match blend.policy {
                    BlendPolicy::AllSamples => blend.gamma.encode(channel),
                    BlendPolicy::LastSampleOnly => to_byte(channel),
                });
            }
            frame.push(u8::MAX);
        }
        Some(frame)
    }

    /// Drops frames, composite and blend parameters.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.composite.clear();
        self.blend = None;
    }
}
