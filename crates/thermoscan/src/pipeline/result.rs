//! Result aggregation and the output record.

use serde::{Deserialize, Serialize};

use crate::thermal::AnomalyFinding;

const CRITICAL_WEIGHT: f64 = 1.0;
const WARNING_WEIGHT: f64 = 0.7;

/// Frame-level grade derived from the confirmed findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallAssessment {
    Normal,
    Warning,
    Critical,
}

impl OverallAssessment {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallAssessment::Normal => "normal",
            OverallAssessment::Warning => "warning",
            OverallAssessment::Critical => "critical",
        }
    }
}

/// Consumer-facing projection of one confirmed finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Human-readable anomaly class label.
    pub label: String,
    pub confidence: f32,
    /// Bounding-box pixel area (`width * height`).
    pub area: u64,
}

/// Full analysis result for a single maintenance frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub overall_assessment: OverallAssessment,
    /// Severity-weighted maximum confidence across findings, `0.0` if none.
    pub anomaly_score: f64,
    /// Confirmed findings in confirmation order.
    pub detections: Vec<Detection>,
    pub detection_count: usize,
    /// Frame dimensions `[width, height]`.
    pub image_size: [u32; 2],
}

impl DetectionResult {
    /// Construct an empty result for an image with the provided dimensions.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            overall_assessment: OverallAssessment::Normal,
            anomaly_score: 0.0,
            detections: Vec::new(),
            detection_count: 0,
            image_size: [width, height],
        }
    }

    /// Aggregate confirmed findings into the output record.
    ///
    /// The frame grade follows the per-finding hot flags: any critical
    /// finding grades the frame `critical`, any finding at all grades it
    /// `warning`, otherwise `normal`.
    pub(crate) fn from_findings(findings: Vec<AnomalyFinding>, width: u32, height: u32) -> Self {
        let has_critical = findings.iter().any(|f| f.is_critical);
        let overall_assessment = if has_critical {
            OverallAssessment::Critical
        } else if !findings.is_empty() {
            OverallAssessment::Warning
        } else {
            OverallAssessment::Normal
        };

        let anomaly_score = findings
            .iter()
            .map(|f| {
                let weight = if f.is_critical {
                    CRITICAL_WEIGHT
                } else {
                    WARNING_WEIGHT
                };
                weight * f64::from(f.confidence)
            })
            .fold(0.0, f64::max);

        let detections: Vec<Detection> = findings
            .iter()
            .map(|f| Detection {
                x: f.bounds.x,
                y: f.bounds.y,
                width: f.bounds.width,
                height: f.bounds.height,
                label: f.class.label().to_string(),
                confidence: f.confidence,
                area: f.bounds.area(),
            })
            .collect();

        Self {
            overall_assessment,
            anomaly_score,
            detection_count: detections.len(),
            detections,
            image_size: [width, height],
        }
    }
}
