//! Gamma decode/encode between 8-bit channels and linear floats.

use serde::{Deserialize, Serialize};

/// Linear value representing a fully saturated (255) channel.
pub const CHANNEL_MAX: f32 = 1.0;

/// Power function used for gamma conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GammaMode {
    /// `f32::powf`.
    #[default]
    Exact,
    /// Exponent-bit approximation of `pow`. Faster, a few percent off.
    Fast,
}

/// Approximates `a^b` by scaling the high word of the IEEE-754 double.
///
/// Returns 0.0 for non-positive `a` and exactly 1.0 for `a >= 1.0`.
pub fn fast_pow(a: f64, b: f64) -> f64 {
    const ONE_BIAS: f64 = 1_072_632_447.0;

    if a <= 0.0 {
        return 0.0;
    }
    if a >= 1.0 {
        return 1.0;
    }
    let high = (a.to_bits() >> 32) as i32 as f64;
    let scaled = (b * (high - ONE_BIAS) + ONE_BIAS) as i32;
    f64::from_bits((scaled as u32 as u64) << 32)
}

/// Gamma curve with a fixed exponent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gamma {
    gamma: f32,
    mode: GammaMode,
}

impl Gamma {
    pub fn new(gamma: f32, mode: GammaMode) -> Self {
        Self { gamma, mode }
    }

    pub fn value(&self) -> f32 {
        self.gamma
    }

    /// `(raw / 255)^gamma`, in `0.0..=1.0`.
    pub fn decode(&self, raw: u8) -> f32 {
        self.pow(raw as f32 / 255.0, self.gamma)
    }

    /// `linear^(1 / gamma) * 255`, rounded and clamped to a byte.
    pub fn encode(&self, linear: f32) -> u8 {
        to_byte(self.pow(linear, 1.0 / self.gamma))
    }

    fn pow(&self, base: f32, exponent: f32) -> f32 {
        let value = match self.mode {
            GammaMode::Exact => base.max(0.0).powf(exponent),
            GammaMode::Fast => fast_pow(base as f64, exponent as f64) as f32,
        };
        value.clamp(0.0, CHANNEL_MAX)
    }
}

/// Adds `contribution` to `accumulated`, saturating at [`CHANNEL_MAX`].
pub fn saturating_add(accumulated: f32, contribution: f32) -> f32 {
    (accumulated + contribution).min(CHANNEL_MAX)
}

/// Scales a linear value to a byte without gamma, clamped to 0..=255.
pub fn to_byte(linear: f32) -> u8 {
    (linear * 255.0).round().clamp(0.0, 255.0) as u8
}
