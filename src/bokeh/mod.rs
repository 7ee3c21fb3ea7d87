//! Depth-of-field simulation by sampling a synthetic aperture.
//!
//! This module provides:
//! - The ring and point layout of the aperture (`BokehSamplingPlan`)
//! - Per-sample camera stepping with exact undo (`BokehSampler`)

pub mod plan;
pub mod sampler;

pub use plan::{anamorphic_factors, BokehSample, BokehSamples, BokehSamplingPlan};
pub use sampler::BokehSampler;
