//! Text-to-vector embedding (§6.5).
//!
//! Grounded on `app/domain/services/embedding_service.py`. The trait seam
//! lets `vdb-api` plug in a remote provider while keeping a deterministic
//! local fallback available everywhere, including tests.

use crate::index::normalize;

/// Produces an embedding for a chunk of text at a fixed target dimension.
///
/// Implementors must be infallible: a remote provider that fails should
/// fall back to [`LocalHashEmbedder`] rather than propagate an error, since
/// embedding failures would otherwise take down writes entirely (§6.5).
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str, target_dimension: usize) -> Vec<f32>;
}

/// Deterministic MD5 token-hash embedding requiring no network access.
///
/// Ported from `_local_hash_embedding`/`_fit_dimension`: each whitespace
/// token hashes to an index/sign pair per 4-byte window of its MD5 digest,
/// accumulated into a fixed-size vector, then L2-normalized.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalHashEmbedder;

impl LocalHashEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn raw_embed(&self, text: &str, dim: usize) -> Vec<f32> {
        if dim == 0 {
            return Vec::new();
        }
        let mut acc = vec![0.0f32; dim];
        for token in text.to_lowercase().split_whitespace() {
            let digest = md5::compute(token.as_bytes());
            let h = digest.0;
            let window = (4 * (dim / 8).max(1)).min(h.len());
            let mut i = 0;
            while i + 3 < window {
                let idx = (u16::from_be_bytes([h[i], h[i + 1]]) as usize) % dim;
                let sgn = if h[i + 2] % 2 == 0 { 1.0 } else { -1.0 };
                acc[idx] += sgn;
                i += 4;
            }
        }
        acc
    }
}

impl EmbeddingProvider for LocalHashEmbedder {
    fn embed(&self, text: &str, target_dimension: usize) -> Vec<f32> {
        normalize(&self.raw_embed(text, target_dimension))
    }
}

/// Truncate or zero-pad `vec` to exactly `target_dimension` entries.
///
/// Used by remote providers whose native output dimension may not match
/// the library's configured `embedding_dimension`.
pub fn fit_dimension(mut vec: Vec<f32>, target_dimension: usize) -> Vec<f32> {
    match vec.len().cmp(&target_dimension) {
        std::cmp::Ordering::Equal => vec,
        std::cmp::Ordering::Greater => {
            vec.truncate(target_dimension);
            vec
        }
        std::cmp::Ordering::Less => {
            vec.resize(target_dimension, 0.0);
            vec
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_and_dimension_is_deterministic() {
        let embedder = LocalHashEmbedder::new();
        let a = embedder.embed("hello world", 16);
        let b = embedder.embed("hello world", 16);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn different_text_usually_differs() {
        let embedder = LocalHashEmbedder::new();
        let a = embedder.embed("the quick brown fox", 32);
        let b = embedder.embed("totally different words here", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn zero_dimension_is_empty() {
        let embedder = LocalHashEmbedder::new();
        assert!(embedder.embed("anything", 0).is_empty());
    }

    #[test]
    fn fit_dimension_truncates_and_pads() {
        assert_eq!(fit_dimension(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_dimension(vec![1.0], 3), vec![1.0, 0.0, 0.0]);
        assert_eq!(fit_dimension(vec![1.0, 2.0], 2), vec![1.0, 2.0]);
    }
}
