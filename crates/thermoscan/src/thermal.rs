//! Per-region thermal rule evaluation.
//!
//! One computation serves both the per-candidate analysis and the global
//! fallback pass: [`compute_region_thermal`] evaluates the warm/hot masks and
//! contrast deltas for an arbitrary [`RegionBounds`], and the whole frame is
//! just the full-frame bounds special case. Keeping a single parameterized
//! implementation keeps the two paths numerically identical.

use serde::Serialize;

use crate::classify::{classify, AnomalyClass, ShapeThresholds};
use crate::config::DetectionConfig;
use crate::frame::ThermalFrame;
use crate::preprocess;
use crate::region::{CandidateRegion, RegionBounds};

/// Median window for the background estimate.
pub(crate) const BACKGROUND_KERNEL_SIZE: u32 = 31;

/// Thermal extent metrics of a confirmed region.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThermalSignature {
    /// Pixels passing the warm color + contrast rules.
    pub warm_pixels: usize,
    /// Pixels passing the stricter hot-zone rules.
    pub hot_pixels: usize,
    /// `warm_pixels` normalized by frame area, in `[0, 1]`.
    pub area_fraction: f64,
    /// Bounding-box elongation, `>= 1`.
    pub aspect_ratio: f64,
}

/// A candidate region confirmed as a thermal anomaly.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyFinding {
    /// Clipped bounding box in frame coordinates.
    pub bounds: RegionBounds,
    pub class: AnomalyClass,
    /// Whether the hot-pixel count met the minimum-pixel floor.
    pub is_critical: bool,
    /// Confidence inherited from the candidate.
    pub confidence: f32,
    pub signature: ThermalSignature,
}

/// Color and contrast thresholds resolved from the configuration tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ThermalThresholds {
    pub saturation_min: f32,
    pub value_min: f32,
    pub delta_value_min: f32,
    pub delta_luminance_min: f32,
    pub saturation_min_hot: f32,
    pub value_min_hot: f32,
    pub delta_value_min_hot: f32,
    pub minimum_area_fraction: f64,
}

impl ThermalThresholds {
    pub(crate) fn from_config(config: &DetectionConfig) -> Self {
        Self {
            saturation_min: config
                .get_f64("thermal_analysis.color_thresholds.saturation_min", 0.35)
                as f32,
            value_min: config.get_f64("thermal_analysis.color_thresholds.value_min", 0.5) as f32,
            delta_value_min: config
                .get_f64("thermal_analysis.color_thresholds.delta_value_min", 0.12)
                as f32,
            delta_luminance_min: config
                .get_f64("thermal_analysis.color_thresholds.delta_luminance_min", 0.08)
                as f32,
            saturation_min_hot: config
                .get_f64("thermal_analysis.hot_zone_thresholds.saturation_min_hot", 0.45)
                as f32,
            value_min_hot: config
                .get_f64("thermal_analysis.hot_zone_thresholds.value_min_hot", 0.65)
                as f32,
            delta_value_min_hot: config
                .get_f64("thermal_analysis.hot_zone_thresholds.delta_value_min_hot", 0.18)
                as f32,
            minimum_area_fraction: config
                .get_f64("thermal_analysis.shape_analysis.minimum_area_fraction", 0.001),
        }
    }
}

/// Mask and delta output of the shared thermal computation.
pub(crate) struct RegionThermal {
    pub width: u32,
    pub height: u32,
    pub warm_mask: Vec<bool>,
    /// Value deviation from the background estimate, per pixel.
    pub delta_value: Vec<f32>,
    pub warm_pixels: usize,
    pub hot_pixels: usize,
}

/// Warm hues wrap around the circular hue origin (red/orange/yellow).
#[inline]
pub(crate) fn is_warm_hue(hue: f32) -> bool {
    hue <= 0.17 || hue >= 0.95
}

/// Evaluate warm/hot masks and contrast deltas over `bounds`.
///
/// The background of each pixel comes from a median filter over the region's
/// own value plane; when a baseline is present, `delta_value` is measured
/// against the filtered baseline instead, while `delta_luminance` always uses
/// the region's own background. This asymmetry is intentional and the
/// deltas must not be unified.
pub(crate) fn compute_region_thermal(
    frame: &ThermalFrame,
    bounds: RegionBounds,
    thresholds: &ThermalThresholds,
) -> RegionThermal {
    let frame_w = frame.width() as usize;
    let rw = bounds.width as usize;
    let rh = bounds.height as usize;
    let len = rw * rh;

    let extract = |plane: &[f32]| -> Vec<f32> {
        let mut out = Vec::with_capacity(len);
        for row in 0..rh {
            let base = (bounds.y as usize + row) * frame_w + bounds.x as usize;
            out.extend_from_slice(&plane[base..base + rw]);
        }
        out
    };

    let hue = extract(frame.hue());
    let sat = extract(frame.sat());
    let val = extract(frame.val());
    let baseline = frame.baseline_value().map(extract);

    let self_filtered =
        preprocess::background_filter(&val, bounds.width, bounds.height, BACKGROUND_KERNEL_SIZE);
    let baseline_filtered = baseline.as_ref().map(|plane| {
        preprocess::background_filter(plane, bounds.width, bounds.height, BACKGROUND_KERNEL_SIZE)
    });

    let mut warm_mask = vec![false; len];
    let mut delta_value = vec![0.0f32; len];
    let mut warm_pixels = 0usize;
    let mut hot_pixels = 0usize;

    for i in 0..len {
        let background = match &baseline_filtered {
            Some(filtered) => filtered[i],
            None => self_filtered[i],
        };
        let dv = val[i] - background;
        let dl = val[i] - self_filtered[i];
        delta_value[i] = dv;

        let hue_ok = is_warm_hue(hue[i]);
        let contrast = dv >= thresholds.delta_value_min || dl >= thresholds.delta_luminance_min;
        if hue_ok && sat[i] >= thresholds.saturation_min && val[i] >= thresholds.value_min && contrast
        {
            warm_mask[i] = true;
            warm_pixels += 1;
        }

        let hot_contrast =
            dv >= thresholds.delta_value_min_hot || dl >= thresholds.delta_luminance_min;
        if hue_ok
            && sat[i] >= thresholds.saturation_min_hot
            && val[i] >= thresholds.value_min_hot
            && hot_contrast
        {
            hot_pixels += 1;
        }
    }

    RegionThermal {
        width: bounds.width,
        height: bounds.height,
        warm_mask,
        delta_value,
        warm_pixels,
        hot_pixels,
    }
}

/// Minimum warm-pixel count for a region to register as a finding.
pub(crate) fn min_signature_pixels(frame: &ThermalFrame, thresholds: &ThermalThresholds) -> usize {
    let floor = (thresholds.minimum_area_fraction * frame.area() as f64).floor() as usize;
    floor.max(4)
}

/// Evaluate one candidate region against the thermal rules.
///
/// Returns `None` when the warm signature stays under the minimum-pixel
/// floor; that is a rejection, not an error.
pub(crate) fn analyze_region(
    frame: &ThermalFrame,
    candidate: &CandidateRegion,
    config: &DetectionConfig,
) -> Option<AnomalyFinding> {
    let thresholds = ThermalThresholds::from_config(config);
    let bounds = candidate.bbox.clip(frame.width(), frame.height());
    let thermal = compute_region_thermal(frame, bounds, &thresholds);
    let min_pixels = min_signature_pixels(frame, &thresholds);

    if thermal.warm_pixels < min_pixels {
        tracing::debug!(
            warm_pixels = thermal.warm_pixels,
            min_pixels,
            ?bounds,
            "candidate rejected: insufficient thermal signature"
        );
        return None;
    }

    let area_fraction = thermal.warm_pixels as f64 / frame.area() as f64;
    let aspect_ratio = bounds.aspect_ratio();
    let is_critical = thermal.hot_pixels >= min_pixels;
    let shape = ShapeThresholds::from_config(config);
    let class = classify(area_fraction, aspect_ratio, is_critical, &shape);

    Some(AnomalyFinding {
        bounds,
        class,
        is_critical,
        confidence: candidate.confidence,
        signature: ThermalSignature {
            warm_pixels: thermal.warm_pixels,
            hot_pixels: thermal.hot_pixels,
            area_fraction,
            aspect_ratio,
        },
    })
}
