//! Gazemark - landmark-driven eye and posture annotation.
//!
//! This library classifies a subject's eye-aperture state (open/closed,
//! with blink counting) and upper-body posture (straight/hunched) from a
//! per-frame stream of facial and body landmark coordinates, producing a
//! label for every frame of a recorded video plus aggregate session
//! statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Gazemark                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────┐   ┌─────────────┐      │
//! │  │  Landmarks  │──▶│   Trackers   │──▶│   Session   │      │
//! │  │  (cursor)   │   │ (eye/posture)│   │ (two-pass)  │      │
//! │  └─────────────┘   └──────────────┘   └─────────────┘      │
//! │                                              │              │
//! │                      ┌─────────────┐   ┌─────────────┐     │
//! │                      │ Evaluation  │◀──│   Report    │     │
//! │                      │ (macro F1)  │   │  (builder)  │     │
//! │                      └─────────────┘   └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A session is two sequential passes over the same frame cursor: a
//! warm-up/calibration pass that primes the eye tracker's rolling baseline
//! and the posture tracker's reference measurements, then a rewind and a
//! full classification pass with the same tracker instances.
//!
//! # Example
//!
//! ```no_run
//! use gazemark::{RecordedFrames, SessionConfig, SessionOrchestrator};
//!
//! let config = SessionConfig::default();
//! let mut cursor = RecordedFrames::new(Vec::new(), 30.0);
//!
//! let orchestrator = SessionOrchestrator::new(&config, 30.0);
//! match orchestrator.run(&mut cursor) {
//!     Ok(outcome) => println!("{} frames labeled", outcome.stats.total_frames),
//!     Err(e) => eprintln!("session failed: {e}"),
//! }
//! ```

pub mod config;
pub mod core;
pub mod landmarks;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{BlinkPolicy, EyeConfig, PostureConfig, SessionConfig};
pub use core::{
    agreement_scores, AgreementScores, AnnotationReport, EvalError, EyeStatus, EyeTracker,
    PerFrameLabel, PostureStatus, PostureTracker, ReportBuilder, SessionError,
    SessionOrchestrator, SessionOutcome, SessionStats,
};
pub use landmarks::{
    FaceLandmarks, FrameCursor, FrameObservation, FrameRecord, LandmarkError, PoseLandmarks,
    RecordedFrames,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
