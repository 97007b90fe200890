use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{Label, LabelSource};

/// Similarity scores for one usable record.
///
/// A `None` score means the pair could not be computed because one side was
/// missing. It is not a measured similarity of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureResult {
    pub label: Label,
    pub label_source: LabelSource,
    pub new_code_old_comment: Option<f64>,
    pub old_code_old_comment: Option<f64>,
    pub old_code_new_code: Option<f64>,
}

impl FeatureResult {
    pub fn get(&self, kind: SimilarityKind) -> Option<f64> {
        match kind {
            SimilarityKind::NewCodeOldComment => self.new_code_old_comment,
            SimilarityKind::OldCodeOldComment => self.old_code_old_comment,
            SimilarityKind::OldCodeNewCode => self.old_code_new_code,
        }
    }
}

/// The three pairwise similarities tracked per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    NewCodeOldComment,
    OldCodeOldComment,
    OldCodeNewCode,
}

impl SimilarityKind {
    pub const ALL: [SimilarityKind; 3] = [
        SimilarityKind::NewCodeOldComment,
        SimilarityKind::OldCodeOldComment,
        SimilarityKind::OldCodeNewCode,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::NewCodeOldComment => 0,
            Self::OldCodeOldComment => 1,
            Self::OldCodeNewCode => 2,
        }
    }
}

/// Why a record produced no feature row.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No label, so the record cannot be aggregated.
    Unlabeled,
    /// Fewer than two of newCode, oldComment and oldCode carry text.
    NotEnoughText { present: usize },
    /// The embedder failed or returned a malformed batch.
    Embedding(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlabeled => write!(f, "record has no label"),
            Self::NotEnoughText { present } => {
                write!(f, "only {present} text field(s) available, need 2")
            }
            Self::Embedding(msg) => write!(f, "embedding failed: {msg}"),
        }
    }
}
