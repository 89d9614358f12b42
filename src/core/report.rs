//! Annotation report builder.
//!
//! Assembles the consumer-facing JSON document for one processed video:
//! producer metadata, the per-frame label map, session statistics, and the
//! agreement block when ground truth was supplied.

use crate::core::evaluation::AgreementScores;
use crate::core::session::{PerFrameLabel, SessionOutcome, SessionStats};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "gazemark";

/// Producer metadata attached to every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique instance identifier (UUID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Host the report was generated on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// A complete annotation report for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationReport {
    pub source_name: String,
    /// When this report was assembled (RFC3339)
    pub generated_at_utc: String,
    pub producer: ReportProducer,
    pub total_frames: u64,
    pub labels_per_frame: BTreeMap<u64, PerFrameLabel>,
    pub stats: SessionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<AgreementScores>,
}

/// Builder for annotation reports.
pub struct ReportBuilder {
    instance_id: Uuid,
}

impl ReportBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
        }
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a report from a session outcome.
    pub fn build(
        &self,
        source_name: &str,
        outcome: SessionOutcome,
        agreement: Option<AgreementScores>,
    ) -> AnnotationReport {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok());

        AnnotationReport {
            source_name: source_name.to_string(),
            generated_at_utc: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: Some(self.instance_id.to_string()),
                host,
            },
            total_frames: outcome.stats.total_frames,
            labels_per_frame: outcome.labels,
            stats: outcome.stats,
            agreement,
        }
    }

    /// Build and serialize a report to JSON.
    pub fn build_json(
        &self,
        source_name: &str,
        outcome: SessionOutcome,
        agreement: Option<AgreementScores>,
    ) -> String {
        let report = self.build(source_name, outcome, agreement);
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::eye::EyeStatus;
    use crate::core::posture::PostureStatus;
    use chrono::Utc;

    fn sample_outcome() -> SessionOutcome {
        let mut labels = BTreeMap::new();
        labels.insert(
            0,
            PerFrameLabel {
                eye_state: EyeStatus::Open,
                posture: PostureStatus::Straight,
            },
        );
        labels.insert(
            1,
            PerFrameLabel {
                eye_state: EyeStatus::Closed,
                posture: PostureStatus::Hunched,
            },
        );

        let stats = SessionStats {
            total_frames: 2,
            blink_count: 1,
            warmed_up: true,
            calibrated: true,
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            posture_scores: vec![1.5, 1.1],
            avg_posture_score: Some(1.3),
            min_posture_score: Some(1.1),
            max_posture_score: Some(1.5),
        };

        SessionOutcome { labels, stats }
    }

    #[test]
    fn test_builder_instance_ids_are_unique() {
        assert_ne!(
            ReportBuilder::new().instance_id(),
            ReportBuilder::new().instance_id()
        );
    }

    #[test]
    fn test_report_structure() {
        let report = ReportBuilder::new().build("clip.mp4", sample_outcome(), None);
        assert_eq!(report.source_name, "clip.mp4");
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.total_frames, 2);
        assert_eq!(report.labels_per_frame.len(), 2);
        assert!(report.agreement.is_none());
    }

    #[test]
    fn test_report_json_frame_keys_are_strings() {
        let json = ReportBuilder::new().build_json("clip.mp4", sample_outcome(), None);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["labels_per_frame"]["0"]["eye_state"], "Open");
        assert_eq!(value["labels_per_frame"]["1"]["posture"], "Hunched");
        assert_eq!(value["total_frames"], 2);
        assert!(value.get("agreement").is_none());
    }

    #[test]
    fn test_report_includes_agreement_when_present() {
        let agreement = AgreementScores {
            eye_f1: 0.9,
            posture_f1: 0.8,
        };
        let report = ReportBuilder::new().build("clip.mp4", sample_outcome(), Some(agreement));
        assert_eq!(report.agreement.unwrap().eye_f1, 0.9);
    }
}
