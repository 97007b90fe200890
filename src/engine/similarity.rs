use tracing::warn;

use crate::embedding::Embedder;
use crate::models::feature::{FeatureResult, SkipReason};
use crate::models::record::{ChangeRecord, Label, LabelSource};

/// A record that passed the label and field checks and is ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    label: Label,
    label_source: LabelSource,
    texts: Vec<String>,
    /// Position in `texts` of newCode, oldComment and oldCode.
    index: [Option<usize>; 3],
}

/// Check a record without touching any embedder.
///
/// Fields considered are newCode, oldComment and oldCode; newComment is not
/// scored.
pub fn prepare(record: &ChangeRecord) -> Result<PreparedRecord, SkipReason> {
    let Some(label) = record.label else {
        return Err(SkipReason::Unlabeled);
    };

    let present = record.similarity_fields();
    if present < 2 {
        warn!(
            label = %label,
            present,
            "not enough text fields to compute similarity"
        );
        return Err(SkipReason::NotEnoughText { present });
    }

    let mut texts = Vec::with_capacity(present);
    let mut index: [Option<usize>; 3] = [None; 3];
    for (slot, text) in index.iter_mut().zip(record.similarity_texts()) {
        if let Some(text) = text {
            *slot = Some(texts.len());
            texts.push(text.to_string());
        }
    }

    Ok(PreparedRecord {
        label,
        label_source: record.label_source,
        texts,
        index,
    })
}

impl PreparedRecord {
    pub fn label(&self) -> Label {
        self.label
    }

    /// Embed the present fields in one batch and score each pair. A pair is
    /// filled only when both of its fields are present.
    pub fn score<E: Embedder + ?Sized>(&self, embedder: &E) -> Result<FeatureResult, SkipReason> {
        let label = self.label;
        let vectors = match embedder.embed(&self.texts) {
            Ok(v) if v.len() == self.texts.len() => v,
            Ok(v) => {
                let msg = format!("expected {} vectors, got {}", self.texts.len(), v.len());
                warn!(label = %label, error = %msg, "embedder returned a malformed batch");
                return Err(SkipReason::Embedding(msg));
            }
            Err(e) => {
                warn!(label = %label, error = %e, "embedding failed");
                return Err(SkipReason::Embedding(e.to_string()));
            }
        };

        let matrix = similarity_matrix(embedder, &vectors);
        let pair = |a: Option<usize>, b: Option<usize>| Some(matrix[a?][b?]);
        let [new_code, old_comment, old_code] = self.index;

        Ok(FeatureResult {
            label,
            label_source: self.label_source,
            new_code_old_comment: pair(new_code, old_comment),
            old_code_old_comment: pair(old_code, old_comment),
            old_code_new_code: pair(old_code, new_code),
        })
    }
}

/// `prepare` then `score`.
pub fn extract<E: Embedder + ?Sized>(
    embedder: &E,
    record: &ChangeRecord,
) -> Result<FeatureResult, SkipReason> {
    prepare(record)?.score(embedder)
}

/// Full pairwise similarity matrix.
fn similarity_matrix<E: Embedder + ?Sized>(embedder: &E, vectors: &[Vec<f32>]) -> Vec<Vec<f64>> {
    vectors
        .iter()
        .map(|a| {
            vectors
                .iter()
                .map(|b| f64::from(embedder.similarity(a, b)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashedEmbedder};
    use crate::models::record::{Label, LabelSource};
    use std::sync::Mutex;

    fn record(
        old_comment: Option<&str>,
        old_code: Option<&str>,
        new_code: Option<&str>,
        label: Option<Label>,
    ) -> ChangeRecord {
        ChangeRecord {
            old_comment: old_comment.map(String::from),
            old_code: old_code.map(String::from),
            new_comment: None,
            new_code: new_code.map(String::from),
            label,
            label_source: LabelSource::Explicit,
            missing: Vec::new(),
        }
    }

    /// Records each batch and returns fixed axis vectors.
    struct AxisEmbedder {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Embedder for AxisEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "x" => vec![1.0, 0.0],
                    "y" => vec![0.0, 1.0],
                    _ => vec![std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2],
                })
                .collect())
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::new("service unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![vec![1.0]])
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[test]
    fn all_fields_populate_all_pairs() {
        let e = HashedEmbedder::new(64);
        let r = record(Some("user name"), Some("get user"), Some("get name"), Some(Label::Stale));
        let f = extract(&e, &r).unwrap();
        assert_eq!(f.label, Label::Stale);
        assert!(f.new_code_old_comment.is_some());
        assert!(f.old_code_old_comment.is_some());
        assert!(f.old_code_new_code.is_some());
    }

    #[test]
    fn pairs_map_to_the_right_fields() {
        let e = AxisEmbedder {
            calls: Mutex::new(Vec::new()),
        };
        // newCode = x, oldComment = x, oldCode = y
        let r = record(Some("x"), Some("y"), Some("x"), Some(Label::Consistent));
        let f = extract(&e, &r).unwrap();
        assert!((f.new_code_old_comment.unwrap() - 1.0).abs() < 1e-6);
        assert!(f.old_code_old_comment.unwrap().abs() < 1e-6);
        assert!(f.old_code_new_code.unwrap().abs() < 1e-6);

        let calls = e.calls.lock().unwrap();
        assert_eq!(calls.len(), 1, "texts are embedded in one batch");
        assert_eq!(calls[0], vec!["x", "x", "y"]);
    }

    #[test]
    fn absent_field_leaves_pairs_uncomputed() {
        let e = HashedEmbedder::new(64);
        let r = record(Some("comment"), None, Some("code"), Some(Label::Consistent));
        let f = extract(&e, &r).unwrap();
        assert!(f.new_code_old_comment.is_some());
        assert_eq!(f.old_code_old_comment, None);
        assert_eq!(f.old_code_new_code, None);
    }

    #[test]
    fn single_field_is_unusable() {
        let e = HashedEmbedder::new(64);
        let r = record(Some("comment"), None, None, Some(Label::Stale));
        assert_eq!(
            extract(&e, &r).unwrap_err(),
            SkipReason::NotEnoughText { present: 1 }
        );
    }

    #[test]
    fn unlabeled_is_skipped_before_embedding() {
        let e = AxisEmbedder {
            calls: Mutex::new(Vec::new()),
        };
        let r = record(Some("x"), Some("y"), Some("x"), None);
        assert_eq!(extract(&e, &r).unwrap_err(), SkipReason::Unlabeled);
        assert!(e.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn prepare_checks_without_an_embedder() {
        let blank = record(Some("  "), Some("code"), None, Some(Label::Stale));
        assert_eq!(prepare(&blank).unwrap_err(), SkipReason::NotEnoughText { present: 1 });
        assert_eq!(
            prepare(&record(Some("a"), Some("b"), None, None)).unwrap_err(),
            SkipReason::Unlabeled
        );

        let ready = prepare(&record(Some("a"), None, Some("c"), Some(Label::Consistent))).unwrap();
        assert_eq!(ready.label(), Label::Consistent);
    }

    #[test]
    fn embedder_error_is_reported() {
        let r = record(Some("a"), Some("b"), Some("c"), Some(Label::Stale));
        match extract(&FailingEmbedder, &r) {
            Err(SkipReason::Embedding(msg)) => assert!(msg.contains("unavailable")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn short_batch_is_reported() {
        let r = record(Some("a"), Some("b"), Some("c"), Some(Label::Stale));
        assert!(matches!(
            extract(&ShortEmbedder, &r),
            Err(SkipReason::Embedding(_))
        ));
    }
}
