//! Offline embedder based on feature hashing of character n-grams.
//!
//! Works without a model server and gives stable vectors for the same text,
//! which also makes it the embedder of choice in tests. Texts that share
//! many characters and character pairs land close together, which is a
//! reasonable lexical proxy for short Chinese policy queries.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::provider::{reject_empty, EmbeddingProvider};
use crate::core::errors::RagError;

const UNIGRAM_WEIGHT: f32 = 0.5;
const BIGRAM_WEIGHT: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, RagError> {
        reject_empty(text)?;

        let chars: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        let mut vector = vec![0.0f32; self.dimension];
        for c in &chars {
            self.accumulate(&mut vector, &c.to_string(), UNIGRAM_WEIGHT);
        }
        for pair in chars.windows(2) {
            let feature: String = pair.iter().collect();
            self.accumulate(&mut vector, &feature, BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_sync(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::cosine_similarity;

    #[test]
    fn same_text_same_vector() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_sync("科技计划申报").expect("embed");
        let b = embedder.embed_sync("科技计划申报").expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn output_is_unit_length() {
        let embedder = HashEmbedder::new(128);
        let v = embedder.embed_sync("关于科技计划申报的通知").expect("embed");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn overlapping_texts_score_higher() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed_sync("科技计划申报").expect("embed");
        let related = embedder.embed_sync("关于科技计划申报的通知").expect("embed");
        let unrelated = embedder.embed_sync("港澳居民社保缴费办法").expect("embed");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn empty_text_is_rejected() {
        let embedder = HashEmbedder::new(8);
        let err = embedder.embed_sync("   ").expect_err("empty");
        assert!(matches!(err, RagError::Embedding { retryable: false, .. }));
    }
}
