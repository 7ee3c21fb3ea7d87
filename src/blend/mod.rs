//! Frame accumulation and gamma-correct blending.
//!
//! This module provides:
//! - Gamma decode/encode with an optional fast `pow` (`Gamma`, `fast_pow`)
//! - Ordered frame storage and the bokeh float composite (`FrameAccumulator`)

pub mod accumulator;
pub mod gamma;

pub use accumulator::{BlendPolicy, BokehBlend, FrameAccumulator};
pub use gamma::{fast_pow, saturating_add, Gamma, GammaMode, CHANNEL_MAX};
