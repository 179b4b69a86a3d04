//! Global fallback segmentation.
//!
//! When no externally-proposed candidate survives thermal confirmation, the
//! frame itself is scored for global thermal structure. If the squashed
//! score clears the configured threshold, warm connected components become
//! new candidate regions and are fed back through the regular region
//! analysis, subject to the same rejection rules.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::DetectionConfig;
use crate::frame::ThermalFrame;
use crate::region::{BoundingBox, CandidateRegion, RegionBounds};
use crate::thermal::{compute_region_thermal, RegionThermal, ThermalThresholds};

/// Logistic squashing; strictly inside (0, 1) for finite scores.
pub(crate) fn sigmoid(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

/// Discover candidate regions from global thermal structure.
pub(crate) fn discover_candidates(
    frame: &ThermalFrame,
    config: &DetectionConfig,
) -> Vec<CandidateRegion> {
    let thresholds = ThermalThresholds::from_config(config);
    let bounds = RegionBounds::full_frame(frame.width(), frame.height());
    let thermal = compute_region_thermal(frame, bounds, &thresholds);

    let warm_fraction = thermal.warm_pixels as f64 / frame.area() as f64;
    let delta95 = f64::from(percentile(
        thermal.delta_value.iter().map(|d| d.max(0.0)).collect(),
        0.95,
    ));
    let score = delta95 + 2.0 * warm_fraction;
    let probability = sigmoid(score);

    if probability < config.fallback_threshold() {
        tracing::debug!(
            probability,
            threshold = config.fallback_threshold(),
            "global thermal probability below fallback threshold"
        );
        return Vec::new();
    }

    let mask = binarize(&thermal);
    let opened = open(&mask, Norm::LInf, 1);
    let labels = connected_components(&opened, Connectivity::Eight, Luma([0u8]));

    let min_area = min_component_area(frame, &thresholds);
    let boxes = component_boxes(&labels, min_area);
    tracing::debug!(
        probability,
        components = boxes.len(),
        "fallback segmentation emitted candidates"
    );

    boxes
        .into_iter()
        .map(|bbox| CandidateRegion::fallback(bbox, probability as f32))
        .collect()
}

fn binarize(thermal: &RegionThermal) -> GrayImage {
    let raw: Vec<u8> = thermal
        .warm_mask
        .iter()
        .map(|&warm| if warm { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(thermal.width, thermal.height, raw)
        .expect("mask length matches dimensions")
}

fn min_component_area(frame: &ThermalFrame, thresholds: &ThermalThresholds) -> u64 {
    ((thresholds.minimum_area_fraction * frame.area() as f64) as u64).max(32)
}

/// Bounding boxes of 8-connected components with at least `min_area` pixels,
/// in label order.
fn component_boxes(labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>, min_area: u64) -> Vec<BoundingBox> {
    struct Extent {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        area: u64,
    }

    let mut extents: BTreeMap<u32, Extent> = BTreeMap::new();
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px.0[0];
        if label == 0 {
            continue;
        }
        extents
            .entry(label)
            .and_modify(|e| {
                e.min_x = e.min_x.min(x);
                e.min_y = e.min_y.min(y);
                e.max_x = e.max_x.max(x);
                e.max_y = e.max_y.max(y);
                e.area += 1;
            })
            .or_insert(Extent {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                area: 1,
            });
    }

    extents
        .values()
        .filter(|e| e.area >= min_area)
        .map(|e| {
            BoundingBox::new(
                e.min_x as i32,
                e.min_y as i32,
                (e.max_x - e.min_x + 1) as i32,
                (e.max_y - e.min_y + 1) as i32,
            )
        })
        .collect()
}

/// Linear-interpolated quantile of an unordered sample.
fn percentile(mut values: Vec<f32>, q: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(values.len() - 1);
    let frac = (pos - lo as f64) as f32;
    values[lo] + (values[hi] - values[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::CandidateOrigin;
    use crate::test_utils::FrameBuilder;
    use serde_json::json;

    const COLD: (f32, f32, f32) = (0.5, 0.1, 0.3);
    const WARM: (f32, f32, f32) = (0.0, 0.6, 0.8);

    #[test]
    fn sigmoid_stays_in_open_unit_interval() {
        for score in [-30.0, -1.0, 0.0, 0.3, 4.0, 30.0] {
            let p = sigmoid(score);
            assert!(p > 0.0 && p < 1.0, "sigmoid({score}) = {p}");
        }
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![0.0f32, 1.0, 2.0, 3.0, 4.0];
        assert!((percentile(values.clone(), 0.5) - 2.0).abs() < 1e-6);
        assert!((percentile(values.clone(), 0.95) - 3.8).abs() < 1e-6);
        assert!((percentile(vec![7.0], 0.95) - 7.0).abs() < 1e-6);
        assert_eq!(percentile(Vec::new(), 0.95), 0.0);
    }

    #[test]
    fn warm_component_becomes_fallback_candidate() {
        let frame = FrameBuilder::new(100, 100, COLD)
            .fill_rect(10, 10, 20, 20, WARM)
            .with_uniform_baseline(0.5)
            .build();
        let config = DetectionConfig::default();

        let candidates = discover_candidates(&frame, &config);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.origin, CandidateOrigin::Fallback);
        assert_eq!(c.bbox, BoundingBox::new(10, 10, 20, 20));
        assert!(c.confidence > 0.5 && c.confidence < 1.0);
    }

    #[test]
    fn isolated_speckles_are_opened_away() {
        let mut builder = FrameBuilder::new(100, 100, COLD).with_uniform_baseline(0.5);
        // Scatter single-pixel warm speckles; the 3x3 opening removes them.
        for i in 0..8u32 {
            builder = builder.fill_rect(10 + i * 10, 10 + i * 10, 1, 1, WARM);
        }
        let frame = builder.build();
        let config = DetectionConfig::default();
        assert!(discover_candidates(&frame, &config).is_empty());
    }

    #[test]
    fn component_below_minimum_area_is_dropped() {
        // 5x5 = 25 pixels survives opening but stays under the 32-pixel floor.
        let frame = FrameBuilder::new(100, 100, COLD)
            .fill_rect(40, 40, 5, 5, WARM)
            .with_uniform_baseline(0.5)
            .build();
        let config = DetectionConfig::default();
        assert!(discover_candidates(&frame, &config).is_empty());
    }

    #[test]
    fn probability_gate_suppresses_discovery() {
        let frame = FrameBuilder::new(100, 100, COLD)
            .fill_rect(10, 10, 20, 20, WARM)
            .with_uniform_baseline(0.5)
            .build();
        let config = DetectionConfig::default().with_overrides(&json!({
            "detection": { "fallback_probability_threshold": 0.99 },
        }));
        assert!(discover_candidates(&frame, &config).is_empty());
    }

    #[test]
    fn two_separate_components_emit_two_candidates() {
        let frame = FrameBuilder::new(120, 80, COLD)
            .fill_rect(10, 10, 12, 12, WARM)
            .fill_rect(80, 50, 14, 10, WARM)
            .with_uniform_baseline(0.5)
            .build();
        let config = DetectionConfig::default();

        let candidates = discover_candidates(&frame, &config);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].bbox, BoundingBox::new(10, 10, 12, 12));
        assert_eq!(candidates[1].bbox, BoundingBox::new(80, 50, 14, 10));
    }
}
