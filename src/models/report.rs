use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::stats::LabelSummary;

/// How the pipeline schedules files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// One file at a time on the calling thread, incremental means.
    Streaming,
    /// Worker pool, results reduced once at the end.
    #[default]
    Parallel,
}

/// Per-run bookkeeping of what happened to each discovered file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub files: u64,
    pub parsed: u64,
    pub parse_failures: u64,
    pub read_failures: u64,
    pub unlabeled: u64,
    pub not_enough_text: u64,
    pub embedding_failures: u64,
    pub worker_failures: u64,
    pub processed: u64,
    pub explicit_labels: u64,
    pub derived_labels: u64,
}

/// Structured result of an `analyze` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: PipelineMode,
    pub embedder: String,
    #[serde(flatten)]
    pub counters: RunCounters,
    /// Keyed by label value ("0", "1").
    pub labels: BTreeMap<String, LabelSummary>,
    /// Both labels combined.
    pub overall: LabelSummary,
}

impl AnalysisReport {
    /// Human-readable rendering.
    pub fn render_text(&self) -> String {
        let c = &self.counters;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Processed {} of {} files ({:?} mode, embedder: {})",
            c.processed, c.files, self.mode, self.embedder
        );
        let _ = writeln!(
            out,
            "  parse failures: {}, read failures: {}, unlabeled: {}, not enough text: {}, embedding failures: {}, worker failures: {}",
            c.parse_failures,
            c.read_failures,
            c.unlabeled,
            c.not_enough_text,
            c.embedding_failures,
            c.worker_failures
        );
        let _ = writeln!(
            out,
            "  labels: {} explicit, {} derived",
            c.explicit_labels, c.derived_labels
        );

        for (label, heading) in [("0", "consistent; expected high"), ("1", "stale; expected low")] {
            let _ = writeln!(out, "\n--- Label {label} ({heading}) ---");
            match self.labels.get(label) {
                Some(s) if s.count > 0 => write_summary(&mut out, s),
                _ => {
                    let _ = writeln!(out, "  not enough data");
                }
            }
        }

        let _ = writeln!(out, "\n--- All labels ---");
        write_summary(&mut out, &self.overall);
        out
    }
}

fn write_summary(out: &mut String, s: &LabelSummary) {
    let _ = writeln!(out, "  Records: {}", s.count);
    let _ = writeln!(
        out,
        "  Avg New Code to Old Comment: {:.4}",
        s.new_code_old_comment
    );
    let _ = writeln!(
        out,
        "  Avg Old Code to Old Comment: {:.4}",
        s.old_code_old_comment
    );
    let _ = writeln!(out, "  Avg Old Code to New Code: {:.4}", s.old_code_new_code);
    let _ = writeln!(
        out,
        "  Avg Difference (New Code-Old Comment - Old Code-Old Comment): {:.4}",
        s.similarity_shift
    );
    let u = &s.uncomputed;
    if u.new_code_old_comment + u.old_code_old_comment + u.old_code_new_code > 0 {
        let _ = writeln!(
            out,
            "  Uncomputed pairs (counted as 0): {} / {} / {}",
            u.new_code_old_comment, u.old_code_old_comment, u.old_code_new_code
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stats::AggregateStats;

    fn report() -> AnalysisReport {
        let stale = AggregateStats {
            count: 3,
            means: [0.4, 0.6, 0.9],
            uncomputed: [0, 0, 0],
        };
        let mut labels = BTreeMap::new();
        labels.insert("0".to_string(), AggregateStats::default().summary());
        labels.insert("1".to_string(), stale.summary());
        AnalysisReport {
            mode: PipelineMode::Streaming,
            embedder: "hashed-384".to_string(),
            counters: RunCounters {
                files: 4,
                processed: 3,
                parse_failures: 1,
                ..RunCounters::default()
            },
            labels,
            overall: stale.summary(),
        }
    }

    #[test]
    fn text_marks_empty_label() {
        let text = report().render_text();
        assert!(text.contains("Processed 3 of 4 files"));
        assert!(text.contains("--- Label 0"));
        assert!(text.contains("not enough data"));
        assert!(text.contains("Avg New Code to Old Comment: 0.4000"));
        assert!(text.contains("-0.2000"));
    }

    #[test]
    fn json_flattens_counters() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["mode"], "streaming");
        assert_eq!(json["files"], 4);
        assert_eq!(json["parse_failures"], 1);
        assert_eq!(json["labels"]["1"]["count"], 3);
    }
}
