//! Pipeline orchestrator: candidate pass, fallback pass, aggregation.

use crate::config::DetectionConfig;
use crate::fallback;
use crate::frame::ThermalFrame;
use crate::region::{CandidateOrigin, CandidateRegion};
use crate::thermal::{self, AnomalyFinding};

use super::DetectionResult;

/// Run the full analysis over a preprocessed frame.
///
/// Fallback segmentation runs only when the supplied candidates produce zero
/// findings and fallback is enabled; its candidates go through the same
/// confirmation rules and may still be rejected.
pub(crate) fn run(
    frame: &ThermalFrame,
    candidates: &[CandidateRegion],
    config: &DetectionConfig,
) -> DetectionResult {
    let mut findings = confirm_candidates(frame, candidates, config);

    if findings.is_empty() && config.enable_fallback() {
        tracing::info!("no candidate region confirmed; running global fallback segmentation");
        let discovered = fallback::discover_candidates(frame, config);
        findings = confirm_candidates(frame, &discovered, config);
    }

    DetectionResult::from_findings(findings, frame.width(), frame.height())
}

fn confirm_candidates(
    frame: &ThermalFrame,
    candidates: &[CandidateRegion],
    config: &DetectionConfig,
) -> Vec<AnomalyFinding> {
    let min_confidence = config.min_candidate_confidence();
    let mut findings = Vec::new();
    for candidate in candidates {
        // The confidence gate applies to the external provider only;
        // fallback candidates already carry the global probability.
        if candidate.origin == CandidateOrigin::External
            && f64::from(candidate.confidence) < min_confidence
        {
            tracing::debug!(
                confidence = candidate.confidence,
                min_confidence,
                "candidate dropped below confidence floor"
            );
            continue;
        }
        if let Some(finding) = thermal::analyze_region(frame, candidate, config) {
            findings.push(finding);
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::OverallAssessment;
    use crate::region::BoundingBox;
    use crate::test_utils::FrameBuilder;
    use serde_json::json;

    const COLD: (f32, f32, f32) = (0.5, 0.1, 0.3);
    const WARM: (f32, f32, f32) = (0.0, 0.6, 0.8);

    fn warm_frame() -> ThermalFrame {
        FrameBuilder::new(100, 100, COLD)
            .fill_rect(10, 10, 20, 20, WARM)
            .with_uniform_baseline(0.5)
            .build()
    }

    #[test]
    fn cold_frame_with_candidate_reports_normal() {
        // Uniformly cold frame: the candidate is rejected, fallback finds no
        // warm components, and the result grades normal with a zero score.
        let frame = FrameBuilder::new(100, 100, COLD).build();
        let config = DetectionConfig::default();
        let candidate = CandidateRegion::external(BoundingBox::new(10, 10, 20, 20), 0.9);

        let result = run(&frame, &[candidate], &config);
        assert_eq!(result.detection_count, 0);
        assert_eq!(result.overall_assessment, OverallAssessment::Normal);
        assert_eq!(result.anomaly_score, 0.0);
        assert_eq!(result.image_size, [100, 100]);
    }

    #[test]
    fn confirmed_candidate_suppresses_fallback() {
        let frame = warm_frame();
        let config = DetectionConfig::default();
        let candidate = CandidateRegion::external(BoundingBox::new(10, 10, 20, 20), 0.9);

        let result = run(&frame, &[candidate], &config);
        assert_eq!(result.detection_count, 1);
        // The finding carries the external confidence, not a fallback
        // probability.
        assert!((result.detections[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn fallback_runs_when_no_candidate_confirms() {
        let frame = warm_frame();
        let config = DetectionConfig::default();

        // A candidate pointing at a cold area is rejected, then fallback
        // rediscovers the warm block on its own.
        let cold_candidate = CandidateRegion::external(BoundingBox::new(60, 60, 20, 20), 0.9);
        let result = run(&frame, &[cold_candidate], &config);
        assert_eq!(result.detection_count, 1);
        assert_eq!(result.detections[0].x, 10);
        assert_eq!(result.detections[0].y, 10);
        assert!(result.detections[0].confidence < 0.9);
    }

    #[test]
    fn fallback_disabled_yields_empty_result() {
        let frame = warm_frame();
        let config = DetectionConfig::default()
            .with_overrides(&json!({ "detection": { "enable_fallback_detection": false } }));

        let result = run(&frame, &[], &config);
        assert_eq!(result.detection_count, 0);
        assert_eq!(result.overall_assessment, OverallAssessment::Normal);
        assert_eq!(result.anomaly_score, 0.0);
    }

    #[test]
    fn low_confidence_external_candidates_are_gated() {
        let frame = FrameBuilder::new(100, 100, COLD)
            .fill_rect(10, 10, 20, 20, WARM)
            .with_uniform_baseline(0.5)
            .build();
        let config = DetectionConfig::default()
            .with_overrides(&json!({ "detection": { "enable_fallback_detection": false } }));

        let weak = CandidateRegion::external(BoundingBox::new(10, 10, 20, 20), 0.1);
        let result = run(&frame, &[weak], &config);
        assert_eq!(result.detection_count, 0);
    }

    #[test]
    fn identical_inputs_yield_identical_results() {
        let frame = warm_frame();
        let config = DetectionConfig::default();
        let candidates = [CandidateRegion::external(BoundingBox::new(10, 10, 20, 20), 0.9)];

        let a = run(&frame, &candidates, &config);
        let b = run(&frame, &candidates, &config);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
