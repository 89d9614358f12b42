//! Agreement scoring between generated labels and a ground-truth set.
//!
//! Computes a macro-averaged per-category F1 score for each label
//! dimension. The contract is strict: both mappings must cover the same
//! frame indices. A mismatch is a caller error and propagates; it is never
//! repaired by dropping or padding frames. An empty ground-truth set is
//! the one non-error degenerate case, reported as "undefined" rather than
//! a numeric score.

use crate::core::session::PerFrameLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Macro-averaged F1 per label dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgreementScores {
    pub eye_f1: f64,
    pub posture_f1: f64,
}

/// Evaluation contract violations.
#[derive(Debug)]
pub enum EvalError {
    FrameCountMismatch {
        ground_truth: usize,
        generated: usize,
    },
    MissingFrame {
        frame: u64,
    },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::FrameCountMismatch {
                ground_truth,
                generated,
            } => write!(
                f,
                "frame count mismatch: ground truth has {ground_truth} frames, generated has {generated}"
            ),
            EvalError::MissingFrame { frame } => {
                write!(f, "no generated label for frame {frame}")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Compare two frame-indexed label mappings.
///
/// Returns `Ok(None)` when the ground truth is empty; otherwise both
/// mappings must have identical frame-index sets.
pub fn agreement_scores(
    ground_truth: &BTreeMap<u64, PerFrameLabel>,
    generated: &BTreeMap<u64, PerFrameLabel>,
) -> Result<Option<AgreementScores>, EvalError> {
    if ground_truth.is_empty() {
        return Ok(None);
    }
    if ground_truth.len() != generated.len() {
        return Err(EvalError::FrameCountMismatch {
            ground_truth: ground_truth.len(),
            generated: generated.len(),
        });
    }

    let mut eye_pairs = Vec::with_capacity(ground_truth.len());
    let mut posture_pairs = Vec::with_capacity(ground_truth.len());
    for (&frame, truth) in ground_truth {
        let Some(predicted) = generated.get(&frame) else {
            return Err(EvalError::MissingFrame { frame });
        };
        eye_pairs.push((truth.eye_state, predicted.eye_state));
        posture_pairs.push((truth.posture, predicted.posture));
    }

    Ok(Some(AgreementScores {
        eye_f1: macro_f1(&eye_pairs),
        posture_f1: macro_f1(&posture_pairs),
    }))
}

/// Macro F1 over (truth, predicted) pairs: unweighted mean of per-category
/// F1 across every category present in either column, with categories
/// scoring 0 when they have no true positives.
fn macro_f1<T: PartialEq + Copy>(pairs: &[(T, T)]) -> f64 {
    let mut categories: Vec<T> = Vec::new();
    for &(truth, predicted) in pairs {
        if !categories.contains(&truth) {
            categories.push(truth);
        }
        if !categories.contains(&predicted) {
            categories.push(predicted);
        }
    }
    if categories.is_empty() {
        return 0.0;
    }

    let mut f1_sum = 0.0;
    for &category in &categories {
        let true_pos = pairs
            .iter()
            .filter(|&&(t, p)| t == category && p == category)
            .count() as f64;
        let false_pos = pairs
            .iter()
            .filter(|&&(t, p)| t != category && p == category)
            .count() as f64;
        let false_neg = pairs
            .iter()
            .filter(|&&(t, p)| t == category && p != category)
            .count() as f64;

        let precision = if true_pos + false_pos > 0.0 {
            true_pos / (true_pos + false_pos)
        } else {
            0.0
        };
        let recall = if true_pos + false_neg > 0.0 {
            true_pos / (true_pos + false_neg)
        } else {
            0.0
        };
        f1_sum += if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
    }

    f1_sum / categories.len() as f64
}
