//! Preprocessed thermal frame.

use image::RgbImage;

use crate::error::{AnalysisError, Result};

/// An aligned, contrast-normalized frame ready for thermal analysis.
///
/// Holds the preprocessed RGB buffer together with its derived normalized
/// HSV planes (each channel in `[0, 1]`, row-major; hue is circular, 0 and 1
/// both mean red) and, when a baseline frame was supplied, the baseline's
/// aligned value plane. Produced exclusively by [`crate::preprocess`];
/// immutable afterwards, so analysis stages may read it concurrently.
pub struct ThermalFrame {
    width: u32,
    height: u32,
    rgb: RgbImage,
    hue: Vec<f32>,
    sat: Vec<f32>,
    val: Vec<f32>,
    baseline_value: Option<Vec<f32>>,
}

impl ThermalFrame {
    pub(crate) fn new(
        rgb: RgbImage,
        hue: Vec<f32>,
        sat: Vec<f32>,
        val: Vec<f32>,
        baseline_value: Option<Vec<f32>>,
    ) -> Result<Self> {
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(AnalysisError::EmptyFrame { width, height });
        }
        let expected = width as usize * height as usize;
        for plane in [&hue, &sat, &val]
            .into_iter()
            .chain(baseline_value.as_ref())
        {
            if plane.len() != expected {
                return Err(AnalysisError::PlaneSizeMismatch {
                    len: plane.len(),
                    expected,
                    width,
                    height,
                });
            }
        }
        Ok(Self {
            width,
            height,
            rgb,
            hue,
            sat,
            val,
            baseline_value,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// The preprocessed RGB buffer the HSV planes were derived from.
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// Normalized hue plane in `[0, 1]`, circular.
    pub fn hue(&self) -> &[f32] {
        &self.hue
    }

    /// Normalized saturation plane in `[0, 1]`.
    pub fn sat(&self) -> &[f32] {
        &self.sat
    }

    /// Normalized value plane in `[0, 1]`.
    pub fn val(&self) -> &[f32] {
        &self.val
    }

    /// Aligned baseline value plane, when a baseline frame was supplied.
    pub fn baseline_value(&self) -> Option<&[f32]> {
        self.baseline_value.as_deref()
    }
}
