//! Anomaly classification rule table.
//!
//! An ordered decision chain maps geometric and thermal metrics of a
//! confirmed region to one of four failure classes. Evaluation is strictly
//! top-down, first match wins: the threshold conditions overlap, so the
//! branch order is load-bearing and must not be rearranged.

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;

/// The four anomaly failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyClass {
    LooseJointCritical,
    LooseJointWarning,
    OverloadCritical,
    WireOverload,
}

/// Severity bucket of an anomaly class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl AnomalyClass {
    /// All classes, in display order.
    pub const ALL: [AnomalyClass; 4] = [
        AnomalyClass::LooseJointCritical,
        AnomalyClass::OverloadCritical,
        AnomalyClass::LooseJointWarning,
        AnomalyClass::WireOverload,
    ];

    /// Human-readable label, as emitted in result records.
    pub fn label(self) -> &'static str {
        match self {
            AnomalyClass::LooseJointCritical => "Loose Joint Critical",
            AnomalyClass::LooseJointWarning => "Loose Joint Warning",
            AnomalyClass::OverloadCritical => "Overload Critical",
            AnomalyClass::WireOverload => "Wire Overload",
        }
    }

    /// Static class-to-severity bucket.
    ///
    /// Independent of the triggering region's own hot-pixel flag: a
    /// `WireOverload` stays `warning` even when the region was thermally hot.
    pub fn severity(self) -> Severity {
        match self {
            AnomalyClass::LooseJointCritical | AnomalyClass::OverloadCritical => Severity::Critical,
            AnomalyClass::LooseJointWarning | AnomalyClass::WireOverload => Severity::Warning,
        }
    }

    /// Display color (RGB) for external renderers. Presentation only.
    pub fn display_color(self) -> [u8; 3] {
        match self {
            AnomalyClass::LooseJointCritical => [255, 0, 0],
            AnomalyClass::OverloadCritical => [255, 128, 0],
            AnomalyClass::LooseJointWarning => [255, 255, 0],
            AnomalyClass::WireOverload => [0, 0, 255],
        }
    }
}

/// Geometric thresholds feeding the rule table.
#[derive(Debug, Clone, Copy)]
pub struct ShapeThresholds {
    /// Area fraction at or above which a region reads as a loose joint.
    pub loose_joint_area_threshold: f64,
    /// Minimum bbox elongation for the wire-overload branch.
    pub wire_aspect_ratio_min: f64,
    /// Area fraction ceiling for the wire-overload branch.
    pub wire_area_max: f64,
}

impl ShapeThresholds {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            loose_joint_area_threshold: config
                .get_f64("thermal_analysis.shape_analysis.loose_joint_area_threshold", 0.1),
            wire_aspect_ratio_min: config
                .get_f64("thermal_analysis.shape_analysis.wire_aspect_ratio_min", 2.2),
            wire_area_max: config.get_f64("thermal_analysis.shape_analysis.wire_area_max", 0.25),
        }
    }
}

/// Classify a confirmed region from its warm-area fraction, bbox aspect
/// ratio, and hot-pixel flag.
pub fn classify(
    area_fraction: f64,
    aspect_ratio: f64,
    is_critical: bool,
    thresholds: &ShapeThresholds,
) -> AnomalyClass {
    if area_fraction >= thresholds.loose_joint_area_threshold {
        if is_critical {
            AnomalyClass::LooseJointCritical
        } else {
            AnomalyClass::LooseJointWarning
        }
    } else if aspect_ratio >= thresholds.wire_aspect_ratio_min
        && area_fraction < thresholds.wire_area_max
    {
        AnomalyClass::WireOverload
    } else if is_critical {
        AnomalyClass::OverloadCritical
    } else {
        AnomalyClass::LooseJointWarning
    }
}
