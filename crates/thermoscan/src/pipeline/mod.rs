//! High-level analysis pipeline.
//!
//! Internal glue layer wiring the stages together:
//! candidate confirmation -> fallback segmentation -> result aggregation.
//!
//! Algorithmic primitives live in `crate::thermal`, `crate::fallback` and
//! `crate::classify`; this layer owns stage order and data flow.

mod result;
mod run;

pub use result::{Detection, DetectionResult, OverallAssessment};

pub(crate) use run::run;
