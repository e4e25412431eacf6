//! Vector index variants (C4): brute-force, kd-tree, and random-hyperplane
//! LSH, unified behind one capability set.
//!
//! Grounded on `app/domain/indexes/{base,brute_force,kd_tree,lsh}.py`.
//! All variants L2-normalize vectors on insert and queries on search, and
//! report similarity as cosine similarity in `[-1, 1]` regardless of the
//! underlying distance representation (§4.4).

pub mod brute_force;
pub mod kd_tree;
pub mod lsh;

pub use brute_force::BruteForceIndex;
pub use kd_tree::KdTreeIndex;
pub use lsh::LshIndex;

use vdb_common::config::IndexType;
use vdb_common::error::{Error, Result};

/// A single scored match returned by [`VectorIndex::search`].
pub type ScoredId = (String, f32);

/// The capability set shared by every index variant (§4.4).
pub trait VectorIndex: Send + Sync {
    /// Atomically replace the contents of the index.
    fn build(&mut self, vectors: &[Vec<f32>], ids: &[String]);

    /// Insert a single vector. Fails with `Conflict` if `id` is already present.
    fn add(&mut self, vector: &[f32], id: &str) -> Result<()>;

    /// Remove a single vector. Fails with `NotFound` if `id` is absent.
    fn remove(&mut self, id: &str) -> Result<()>;

    /// Replace the stored vector for `id`. Fails with `NotFound` if absent.
    fn update(&mut self, id: &str, new_vector: &[f32]) -> Result<()>;

    /// Return up to `k` `(id, score)` pairs sorted by descending score.
    /// Empty input or `k == 0` returns an empty vector.
    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId>;

    /// Number of vectors currently held.
    fn size(&self) -> usize;
}

/// Construct a fresh, empty index of the requested variant.
pub fn new_index(index_type: IndexType) -> Result<Box<dyn VectorIndex>> {
    match index_type {
        IndexType::BruteForce => Ok(Box::new(BruteForceIndex::new())),
        IndexType::KdTree => Ok(Box::new(KdTreeIndex::new())),
        IndexType::Lsh => Ok(Box::new(LshIndex::new(24, 42))),
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// L2-normalize `v`. A zero-norm vector maps to an all-zeros vector of the
/// same length (its similarity to anything is then 0).
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        vec![0.0; v.len()]
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}

/// Cosine similarity between two vectors. Either operand being the zero
/// vector yields similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot(a, b) / (na * nb)
    }
}

pub(crate) fn duplicate_id_err(id: &str) -> Error {
    Error::conflict(format!("duplicate vector id: {id}"))
}

pub(crate) fn not_found_id_err(id: &str) -> Error {
    Error::not_found(format!("vector id not found: {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_idempotent() {
        let v = vec![3.0, 4.0, 0.0];
        let n1 = normalize(&v);
        let n2 = normalize(&n1);
        for (a, b) in n1.iter().zip(n2.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_vector_normalizes_to_zero() {
        let v = vec![0.0, 0.0, 0.0];
        assert_eq!(normalize(&v), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn cosine_similarity_of_identical_unit_vectors_is_one() {
        let a = normalize(&[1.0, 2.0, 3.0]);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-5);
    }
}
