//! High-level analysis API.
//!
//! [`Detector`] is the primary entry point. It wraps a base
//! [`DetectionConfig`] and provides convenience methods for the common
//! analysis scenarios (with/without baseline, with per-request overrides).

use image::RgbImage;
use serde_json::Value;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::pipeline::{self, DetectionResult};
use crate::preprocess;
use crate::region::CandidateRegion;

/// Primary analysis interface.
///
/// Holds the immutable base configuration. Create once, analyze many frames;
/// per-request overrides are merged into a private snapshot so concurrent
/// requests never share mutable parameters.
///
/// # Examples
///
/// ```no_run
/// use thermoscan::{BoundingBox, CandidateRegion, Detector};
/// use image::RgbImage;
///
/// let detector = Detector::new();
/// let frame = RgbImage::new(640, 480);
/// let candidates = [CandidateRegion::external(BoundingBox::new(100, 120, 60, 40), 0.85)];
/// let result = detector.detect(&frame, &candidates)?;
/// println!("{} findings", result.detection_count);
/// # Ok::<(), thermoscan::AnalysisError>(())
/// ```
#[derive(Debug, Default)]
pub struct Detector {
    config: DetectionConfig,
}

impl Detector {
    /// Create a detector with the default parameter tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with an explicit configuration.
    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Access the base configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Mutable access to the base configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut DetectionConfig {
        &mut self.config
    }

    /// Analyze a maintenance frame against externally-proposed candidates.
    pub fn detect(
        &self,
        maintenance: &RgbImage,
        candidates: &[CandidateRegion],
    ) -> Result<DetectionResult> {
        self.detect_inner(None, maintenance, candidates, None)
    }

    /// Analyze a maintenance frame against a baseline frame.
    ///
    /// The maintenance frame is resized and affine-registered into baseline
    /// coordinates; value deltas are then measured against the baseline.
    pub fn detect_with_baseline(
        &self,
        baseline: &RgbImage,
        maintenance: &RgbImage,
        candidates: &[CandidateRegion],
    ) -> Result<DetectionResult> {
        self.detect_inner(Some(baseline), maintenance, candidates, None)
    }

    /// Analyze with per-request configuration overrides.
    ///
    /// `overrides` is deep-merged into a request-local copy of the base
    /// configuration; the base is never mutated.
    pub fn detect_with_overrides(
        &self,
        baseline: Option<&RgbImage>,
        maintenance: &RgbImage,
        candidates: &[CandidateRegion],
        overrides: &Value,
    ) -> Result<DetectionResult> {
        self.detect_inner(baseline, maintenance, candidates, Some(overrides))
    }

    fn detect_inner(
        &self,
        baseline: Option<&RgbImage>,
        maintenance: &RgbImage,
        candidates: &[CandidateRegion],
        overrides: Option<&Value>,
    ) -> Result<DetectionResult> {
        let snapshot;
        let config = match overrides {
            Some(overrides) => {
                snapshot = self.config.with_overrides(overrides);
                &snapshot
            }
            None => &self.config,
        };

        let frame = match baseline {
            Some(baseline) => preprocess::prepare_frame_with_baseline(baseline, maintenance)?,
            None => preprocess::prepare_frame(maintenance)?,
        };
        Ok(pipeline::run(&frame, candidates, config))
    }
}
