//! thermoscan — thermal signature classification for electrical-equipment
//! inspection imagery.
//!
//! Confirms or rejects candidate regions of a thermal maintenance frame as
//! equipment anomalies, classifies confirmed regions into failure types, and
//! falls back to frame-wide candidate discovery when nothing confirms. The
//! pipeline stages are:
//!
//! 1. **Preprocess** – contrast normalization, optional affine baseline
//!    alignment, RGB→normalized-HSV conversion.
//! 2. **Confirm** – per-candidate warm/hot mask evaluation against the
//!    configured thermal rules.
//! 3. **Fallback** – global thermal scoring and connected-component
//!    candidate discovery, only when no candidate confirmed.
//! 4. **Aggregate** – frame grade, scalar anomaly score, output record.
//!
//! Candidate boxes come from an external object detector; the engine only
//! trusts their confidence values and re-clips all geometry. The whole
//! computation is synchronous, deterministic and free of shared mutable
//! state: per-request configuration overrides are merged into private
//! snapshots.
//!
//! # Public API
//! - [`Detector`] as the primary entry point
//! - [`DetectionConfig`] and [`sensitivity_overrides`] for tuning
//! - [`DetectionResult`] and its projections as the output record
//! - [`preprocess`] for callers that need the individual image operations

mod api;
mod classify;
mod config;
mod error;
mod fallback;
mod frame;
mod pipeline;
pub mod preprocess;
mod region;
mod thermal;

#[cfg(test)]
mod test_utils;

pub use api::Detector;
pub use classify::{classify, AnomalyClass, Severity, ShapeThresholds};
pub use config::{sensitivity_overrides, DetectionConfig};
pub use error::{AnalysisError, Result};
pub use frame::ThermalFrame;
pub use pipeline::{Detection, DetectionResult, OverallAssessment};
pub use region::{BoundingBox, CandidateOrigin, CandidateRegion, RegionBounds};
pub use thermal::{AnomalyFinding, ThermalSignature};
