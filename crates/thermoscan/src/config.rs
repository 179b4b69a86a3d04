//! Detection parameter tree.
//!
//! Parameters live in a nested numeric tree addressed by dotted paths
//! (`"thermal_analysis.color_thresholds.saturation_min"`). Every lookup takes
//! a typed default so an absent or mistyped node never fails a request.
//!
//! The base configuration is immutable. Per-request tuning goes through
//! [`DetectionConfig::with_overrides`], which deep-merges the override tree
//! into a private copy; concurrent requests therefore never observe each
//! other's overrides.

use serde_json::{json, Value};

/// Immutable detection parameter tree with dotted-path access.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    params: Value,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            params: default_params(),
        }
    }
}

impl DetectionConfig {
    /// Wrap an already-parsed parameter tree.
    ///
    /// Reading the tree from disk or network is the caller's concern; the
    /// engine only consumes the parsed value.
    pub fn from_value(params: Value) -> Self {
        Self { params }
    }

    /// Access the underlying parameter tree.
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Look up a numeric parameter by dotted path, falling back to `default`
    /// when the path is absent or not a number.
    pub fn get_f64(&self, path: &str, default: f64) -> f64 {
        self.lookup(path).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Look up a boolean parameter by dotted path.
    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.lookup(path)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.params, |node, key| node.as_object()?.get(key))
    }

    /// Return a new configuration with `overrides` deep-merged on top of this
    /// one. Nested mappings merge key-by-key, scalars replace. `self` is left
    /// untouched.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Value) -> DetectionConfig {
        let mut merged = self.params.clone();
        deep_merge(&mut merged, overrides);
        Self { params: merged }
    }

    /// Minimum confidence for externally-proposed candidates.
    pub fn min_candidate_confidence(&self) -> f64 {
        self.get_f64("detection.min_candidate_confidence", 0.2)
    }

    /// Whether global fallback segmentation runs when no candidate confirms.
    pub fn enable_fallback(&self) -> bool {
        self.get_bool("detection.enable_fallback_detection", true)
    }

    /// Minimum global thermal probability for fallback candidate discovery.
    pub fn fallback_threshold(&self) -> f64 {
        self.get_f64("detection.fallback_probability_threshold", 0.4)
    }
}

fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (other, _) => *other = source.clone(),
    }
}

/// Map a 0–100 sensitivity percentage onto a threshold override tree.
///
/// Linear interpolation between the low-sensitivity and high-sensitivity
/// endpoints for the contrast thresholds, rounded to 4 decimal places.
/// Feed the returned tree to [`DetectionConfig::with_overrides`].
pub fn sensitivity_overrides(sensitivity_percent: u8) -> Value {
    let t = f64::from(sensitivity_percent.min(100)) / 100.0;
    let lerp = |low: f64, high: f64| ((low + t * (high - low)) * 1.0e4).round() / 1.0e4;

    json!({
        "thermal_analysis": {
            "color_thresholds": {
                "delta_value_min": lerp(0.08, 0.22),
                "delta_luminance_min": lerp(0.05, 0.14),
            },
            "hot_zone_thresholds": {
                "delta_value_min_hot": lerp(0.15, 0.30),
            },
        },
    })
}

fn default_params() -> Value {
    json!({
        "detection": {
            "min_candidate_confidence": 0.2,
            "enable_fallback_detection": true,
            "fallback_probability_threshold": 0.4,
        },
        "thermal_analysis": {
            "color_thresholds": {
                "saturation_min": 0.35,
                "value_min": 0.5,
                "delta_value_min": 0.12,
                "delta_luminance_min": 0.08,
            },
            "hot_zone_thresholds": {
                "saturation_min_hot": 0.45,
                "value_min_hot": 0.65,
                "delta_value_min_hot": 0.18,
            },
            "shape_analysis": {
                "minimum_area_fraction": 0.001,
                "loose_joint_area_threshold": 0.1,
                "wire_aspect_ratio_min": 2.2,
                "wire_area_max": 0.25,
            },
        },
    })
}
