use serde::{Deserialize, Serialize};

use super::feature::SimilarityKind;

/// Running statistics for the records of one label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateStats {
    /// Records folded in.
    pub count: u64,
    /// Running mean per similarity kind, indexed by `SimilarityKind::index`.
    pub means: [f64; 3],
    /// How many folded records had no value for each kind (counted as 0.0).
    pub uncomputed: [u64; 3],
}

impl AggregateStats {
    pub fn mean(&self, kind: SimilarityKind) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.means[kind.index()]
    }

    /// mean(newCode vs oldComment) - mean(oldCode vs oldComment).
    pub fn similarity_shift(&self) -> f64 {
        self.mean(SimilarityKind::NewCodeOldComment) - self.mean(SimilarityKind::OldCodeOldComment)
    }

    pub fn summary(&self) -> LabelSummary {
        LabelSummary {
            count: self.count,
            new_code_old_comment: self.mean(SimilarityKind::NewCodeOldComment),
            old_code_old_comment: self.mean(SimilarityKind::OldCodeOldComment),
            old_code_new_code: self.mean(SimilarityKind::OldCodeNewCode),
            similarity_shift: self.similarity_shift(),
            uncomputed: UncomputedCounts {
                new_code_old_comment: self.uncomputed[0],
                old_code_old_comment: self.uncomputed[1],
                old_code_new_code: self.uncomputed[2],
            },
        }
    }
}

/// Serializable view of one label's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub count: u64,
    pub new_code_old_comment: f64,
    pub old_code_old_comment: f64,
    pub old_code_new_code: f64,
    pub similarity_shift: f64,
    pub uncomputed: UncomputedCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncomputedCounts {
    pub new_code_old_comment: u64,
    pub old_code_old_comment: u64,
    pub old_code_new_code: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_report_zero_means() {
        let stats = AggregateStats::default();
        let summary = stats.summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.new_code_old_comment, 0.0);
        assert_eq!(summary.old_code_old_comment, 0.0);
        assert_eq!(summary.old_code_new_code, 0.0);
        assert_eq!(summary.similarity_shift, 0.0);
    }

    #[test]
    fn shift_is_difference_of_means() {
        let stats = AggregateStats {
            count: 2,
            means: [0.25, 0.75, 0.5],
            uncomputed: [0, 0, 1],
        };
        assert!((stats.similarity_shift() + 0.5).abs() < 1e-12);
        assert_eq!(stats.summary().uncomputed.old_code_new_code, 1);
    }
}
