use std::collections::BTreeMap;

use super::{Embedder, EmbeddingError};

/// Deterministic feature-hashing embedder.
///
/// Terms are hashed into a fixed number of buckets and weighted by term
/// frequency and length, then L2-normalized. It carries no learned semantics
/// but needs no model files, which makes it the default backend and the one
/// used in tests.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimensions: usize,
    name: String,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            name: format!("hashed-{dimensions}"),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// FNV-1a bucket for a term.
    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % self.dimensions as u64) as usize
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut tf: BTreeMap<String, f32> = BTreeMap::new();
        let mut total = 0.0f32;
        for tok in Self::tokenize(text) {
            *tf.entry(tok).or_default() += 1.0;
            total += 1.0;
        }

        let mut vec = vec![0.0f32; self.dimensions];
        if total == 0.0 {
            return vec;
        }
        for (term, count) in &tf {
            let weight = (count / total) * (1.0 + (term.chars().count() as f32).ln());
            vec[self.bucket(term)] += weight;
        }

        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

impl Embedder for HashedEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    fn embed_one(e: &HashedEmbedder, text: &str) -> Vec<f32> {
        e.embed(&[text.to_string()]).unwrap().remove(0)
    }

    #[test]
    fn output_is_unit_norm() {
        let e = HashedEmbedder::new(128);
        let v = embed_one(&e, "return the user name");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashedEmbedder::new(32);
        assert!(embed_one(&e, "  ;; ").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn batch_matches_single() {
        let e = HashedEmbedder::new(64);
        let texts = vec!["get User Name".to_string(), "x = 1".to_string()];
        let batch = e.embed(&texts).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embed_one(&e, "get User Name"));
    }

    #[test]
    fn overlapping_text_scores_higher() {
        let e = HashedEmbedder::new(256);
        let comment = embed_one(&e, "returns the user name");
        let close = embed_one(&e, "String get User Name() { return user.name; }");
        let far = embed_one(&e, "void flush Buffer() { stream.close(); }");
        assert!(cosine_similarity(&comment, &close) > cosine_similarity(&comment, &far));
    }

    #[test]
    fn zero_dimensions_is_clamped() {
        let e = HashedEmbedder::new(0);
        assert_eq!(e.dimensions(), 1);
        assert_eq!(embed_one(&e, "a").len(), 1);
    }
}
