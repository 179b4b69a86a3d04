//! Shared test utilities for synthetic-frame unit tests.
//!
//! Builds [`ThermalFrame`]s directly from HSV planes so threshold tests can
//! pin exact channel values without going through contrast normalization.

use image::{Rgb, RgbImage};

use crate::frame::ThermalFrame;
use crate::preprocess::hsv_pixel_to_rgb;

/// Builder for synthetic HSV frames.
pub(crate) struct FrameBuilder {
    width: u32,
    height: u32,
    hue: Vec<f32>,
    sat: Vec<f32>,
    val: Vec<f32>,
    baseline: Option<Vec<f32>>,
}

impl FrameBuilder {
    /// Start from a uniform `(hue, sat, val)` fill.
    pub(crate) fn new(width: u32, height: u32, fill: (f32, f32, f32)) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            hue: vec![fill.0; n],
            sat: vec![fill.1; n],
            val: vec![fill.2; n],
            baseline: None,
        }
    }

    /// Paint a rectangle with the given `(hue, sat, val)`.
    pub(crate) fn fill_rect(mut self, x: u32, y: u32, w: u32, h: u32, fill: (f32, f32, f32)) -> Self {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                let idx = (row * self.width + col) as usize;
                self.hue[idx] = fill.0;
                self.sat[idx] = fill.1;
                self.val[idx] = fill.2;
            }
        }
        self
    }

    /// Attach a uniform baseline value plane.
    pub(crate) fn with_uniform_baseline(mut self, val: f32) -> Self {
        self.baseline = Some(vec![val; self.width as usize * self.height as usize]);
        self
    }

    pub(crate) fn build(self) -> ThermalFrame {
        let mut rgb = RgbImage::new(self.width, self.height);
        for (i, px) in rgb.pixels_mut().enumerate() {
            *px = Rgb(hsv_pixel_to_rgb(self.hue[i], self.sat[i], self.val[i]));
        }
        ThermalFrame::new(rgb, self.hue, self.sat, self.val, self.baseline)
            .expect("builder planes are consistent")
    }
}
