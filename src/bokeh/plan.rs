//! Ring and point layout of the synthetic aperture.
//!
//! Samples lie on `rings` concentric rings. Ring `n` (1-based) carries
//! `points_first_ring * n` points and has radius `n * radius_step`. The
//! angle keeps accumulating across rings, so each ring starts where the
//! previous one stopped.

use std::f64::consts::TAU;

use crate::config::BokehSettings;

/// Horizontal and vertical aperture stretch for an anamorphism in -1..=1.
///
/// Positive values squeeze the horizontal axis, negative values the vertical.
pub fn anamorphic_factors(anamorphism: f32) -> (f64, f64) {
    let a = f64::from(anamorphism.clamp(-1.0, 1.0));
    if a > 0.0 {
        (1.0 - a.abs(), 1.0)
    } else if a < 0.0 {
        (1.0, 1.0 - a.abs())
    } else {
        (1.0, 1.0)
    }
}

/// One camera offset of the aperture walk.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BokehSample {
    /// 1-based ring number
    pub ring: u32,
    /// 1-based point number within the ring
    pub point: u32,
    /// Vertical offset, applied with `move_up_bokeh`
    pub x: f64,
    /// Horizontal offset, applied with `move_right_bokeh`
    pub y: f64,
    /// Yaw that turns the camera back onto the focus point
    pub yaw: f64,
    /// Pitch that turns the camera back onto the focus point
    pub pitch: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BokehSamplingPlan {
    rings: u32,
    points_first_ring: u32,
    radius_step: f64,
    anamorph_x: f64,
    anamorph_y: f64,
    offset: f64,
    offset_per_ring: bool,
    focus: f64,
}

impl BokehSamplingPlan {
    pub fn from_settings(settings: &BokehSettings) -> Self {
        let rings = settings.number_of_rings.max(1);
        let (anamorph_x, anamorph_y) = anamorphic_factors(settings.anamorphism);
        Self {
            rings,
            points_first_ring: settings.points_first_ring.max(1),
            radius_step: settings.radius * f64::from(settings.shape_size) / f64::from(rings),
            anamorph_x,
            anamorph_y,
            offset: f64::from(settings.offset),
            offset_per_ring: settings.offset_per_ring,
            focus: f64::from(settings.focusing_distance),
        }
    }

    pub fn rings(&self) -> u32 {
        self.rings
    }

    pub fn radius_step(&self) -> f64 {
        self.radius_step
    }

    pub fn points_on_ring(&self, ring: u32) -> u32 {
        self.points_first_ring * ring
    }

    /// Number of samples the walk visits, `first * rings * (rings + 1) / 2`.
    pub fn total_samples(&self) -> u32 {
        (1..=self.rings).map(|ring| self.points_on_ring(ring)).sum()
    }

    fn ring_offset(&self, ring: u32) -> f64 {
        if self.offset_per_ring {
            self.offset * f64::from(ring)
        } else {
            self.offset
        }
    }

    /// Computes the offsets for one aperture position.
    pub fn sample_at(&self, ring: u32, point: u32, angle: f64) -> BokehSample {
        let radius = self.radius_step * f64::from(ring);
        let theta = angle + self.ring_offset(ring);
        let x = radius * self.anamorph_x * theta.sin();
        let y = radius * self.anamorph_y * theta.cos();
        let straight = self.focus.atan2(0.0);
        BokehSample {
            ring,
            point,
            x,
            y,
            yaw: straight - self.focus.atan2(-y),
            pitch: straight - self.focus.atan2(x),
        }
    }

    pub fn samples(&self) -> BokehSamples<'_> {
        let points = self.points_on_ring(1);
        let angle_per_point = TAU / f64::from(points);
        BokehSamples {
            plan: self,
            ring: 1,
            point: 1,
            points_on_ring: points,
            angle_per_point,
            angle: angle_per_point,
        }
    }
}

/// Iterator over the samples of a [`BokehSamplingPlan`], ring by ring.
#[derive(Clone, Debug)]
pub struct BokehSamples<'a> {
    plan: &'a BokehSamplingPlan,
    ring: u32,
    point: u32,
    points_on_ring: u32,
    angle_per_point: f64,
    angle: f64,
}

impl Iterator for BokehSamples<'_> {
    type Item = BokehSample;

    fn next(&mut self) -> Option<BokehSample> {
        if self.ring > self.plan.rings {
            return None;
        }
        let sample = self.plan.sample_at(self.ring, self.point, self.angle);

        self.angle += self.angle_per_point;
        self.point += 1;
        if self.point > self.points_on_ring {
            self.point = 1;
            self.ring += 1;
            self.points_on_ring += self.plan.points_first_ring;
            self.angle_per_point = TAU / f64::from(self.points_on_ring);
        }
        Some(sample)
    }
}
