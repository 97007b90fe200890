use std::collections::BTreeMap;

use crate::models::feature::{FeatureResult, SimilarityKind};
use crate::models::record::Label;
use crate::models::stats::{AggregateStats, LabelSummary};

/// Per-label statistics over a stream or batch of feature rows.
///
/// An uncomputed similarity is folded in as 0.0 and counted in
/// `AggregateStats::uncomputed`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregator {
    consistent: AggregateStats,
    stale: AggregateStats,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, label: Label) -> &AggregateStats {
        match label {
            Label::Consistent => &self.consistent,
            Label::Stale => &self.stale,
        }
    }

    fn stats_mut(&mut self, label: Label) -> &mut AggregateStats {
        match label {
            Label::Consistent => &mut self.consistent,
            Label::Stale => &mut self.stale,
        }
    }

    /// Fold one result into its label's running means:
    /// `mean = (mean * n + x) / (n + 1)`, then `n += 1`.
    pub fn update(&mut self, result: &FeatureResult) {
        let stats = self.stats_mut(result.label);
        let n = stats.count as f64;
        for kind in SimilarityKind::ALL {
            let i = kind.index();
            let x = match result.get(kind) {
                Some(v) => v,
                None => {
                    stats.uncomputed[i] += 1;
                    0.0
                }
            };
            stats.means[i] = (stats.means[i] * n + x) / (n + 1.0);
        }
        stats.count += 1;
    }

    /// Build statistics from a finished batch: per-label sums and counts,
    /// divided once at the end.
    pub fn reduce<'a>(results: impl IntoIterator<Item = &'a FeatureResult>) -> Self {
        let mut sums: [[f64; 3]; 2] = [[0.0; 3]; 2];
        let mut acc = Self::default();

        for result in results {
            let slot = result.label.as_u8() as usize;
            let stats = acc.stats_mut(result.label);
            for kind in SimilarityKind::ALL {
                let i = kind.index();
                match result.get(kind) {
                    Some(v) => sums[slot][i] += v,
                    None => stats.uncomputed[i] += 1,
                }
            }
            stats.count += 1;
        }

        for label in Label::ALL {
            let slot = label.as_u8() as usize;
            let stats = acc.stats_mut(label);
            if stats.count > 0 {
                let n = stats.count as f64;
                for i in 0..3 {
                    stats.means[i] = sums[slot][i] / n;
                }
            }
        }
        acc
    }

    /// Combine with statistics built independently from disjoint inputs.
    pub fn merge(&mut self, other: &Aggregator) {
        for label in Label::ALL {
            let theirs = *other.stats(label);
            merge_stats(self.stats_mut(label), &theirs);
        }
    }

    /// Statistics over both labels together.
    pub fn overall(&self) -> AggregateStats {
        let mut all = self.consistent;
        merge_stats(&mut all, &self.stale);
        all
    }

    pub fn summary(&self, label: Label) -> LabelSummary {
        self.stats(label).summary()
    }

    /// Label value ("0", "1") to summary.
    pub fn summaries(&self) -> BTreeMap<String, LabelSummary> {
        Label::ALL
            .iter()
            .map(|&label| (label.to_string(), self.summary(label)))
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.consistent.count + self.stale.count
    }
}

fn merge_stats(ours: &mut AggregateStats, theirs: &AggregateStats) {
    let total = ours.count + theirs.count;
    if total == 0 {
        return;
    }
    let (a, b) = (ours.count as f64, theirs.count as f64);
    for i in 0..3 {
        ours.means[i] = (ours.means[i] * a + theirs.means[i] * b) / total as f64;
        ours.uncomputed[i] += theirs.uncomputed[i];
    }
    ours.count = total;
}
