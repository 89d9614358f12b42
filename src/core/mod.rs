//! Core functionality for gazemark.
//!
//! This module contains:
//! - Eye aperture tracking and blink detection
//! - Posture tracking against a calibrated reference
//! - The two-phase session orchestrator
//! - Agreement scoring against ground-truth labels
//! - Annotation report building for export

pub mod evaluation;
pub mod eye;
pub mod posture;
pub mod report;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use evaluation::{agreement_scores, AgreementScores, EvalError};
pub use eye::{aperture_ratio, EyeStatus, EyeStep, EyeTracker};
pub use posture::{PostureStatus, PostureStep, PostureTracker};
pub use report::{AnnotationReport, ReportBuilder, ReportProducer, PRODUCER_NAME};
pub use session::{
    PerFrameLabel, SessionError, SessionOrchestrator, SessionOutcome, SessionStats,
};
