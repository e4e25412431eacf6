//! Flat, exact brute-force index (§4.4.1).
//!
//! Grounded on `app/domain/indexes/brute_force.py`: parallel arrays plus
//! an id -> position map, with swap-with-last removal for O(1) deletes at
//! the cost of unspecified ordering.

use std::collections::HashMap;

use super::{cosine_similarity, duplicate_id_err, normalize, not_found_id_err, ScoredId, VectorIndex};
use vdb_common::error::Result;

#[derive(Default)]
pub struct BruteForceIndex {
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    pos: HashMap<String, usize>,
}

impl BruteForceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for BruteForceIndex {
    fn build(&mut self, vectors: &[Vec<f32>], ids: &[String]) {
        self.vectors = vectors.iter().map(|v| normalize(v)).collect();
        self.ids = ids.to_vec();
        self.pos = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
    }

    fn add(&mut self, vector: &[f32], id: &str) -> Result<()> {
        if self.pos.contains_key(id) {
            return Err(duplicate_id_err(id));
        }
        self.pos.insert(id.to_string(), self.ids.len());
        self.ids.push(id.to_string());
        self.vectors.push(normalize(vector));
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let idx = *self.pos.get(id).ok_or_else(|| not_found_id_err(id))?;
        let last = self.ids.len() - 1;
        if idx != last {
            self.ids.swap(idx, last);
            self.vectors.swap(idx, last);
            let moved_id = self.ids[idx].clone();
            self.pos.insert(moved_id, idx);
        }
        self.ids.pop();
        self.vectors.pop();
        self.pos.remove(id);
        Ok(())
    }

    fn update(&mut self, id: &str, new_vector: &[f32]) -> Result<()> {
        let idx = *self.pos.get(id).ok_or_else(|| not_found_id_err(id))?;
        self.vectors[idx] = normalize(new_vector);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        if k == 0 || self.ids.is_empty() {
            return Vec::new();
        }
        let q = normalize(query);
        let mut pairs: Vec<ScoredId> = self
            .ids
            .iter()
            .zip(self.vectors.iter())
            .map(|(id, v)| (id.clone(), cosine_similarity(&q, v)))
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs.truncate(k);
        pairs
    }

    fn size(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(&str, [f32; 3])]) -> BruteForceIndex {
        let mut idx = BruteForceIndex::new();
        let ids: Vec<String> = pairs.iter().map(|(id, _)| id.to_string()).collect();
        let vecs: Vec<Vec<f32>> = pairs.iter().map(|(_, v)| v.to_vec()).collect();
        idx.build(&vecs, &ids);
        idx
    }

    #[test]
    fn exact_top2_matches_spec_scenario_1() {
        let idx = build(&[
            ("A", [1.0, 0.0, 0.0]),
            ("B", [0.0, 1.0, 0.0]),
            ("C", [0.9, 0.1, 0.0]),
        ]);
        let results = idx.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "A");
        assert!((results[0].1 - 1.0).abs() < 1e-5);
        assert_eq!(results[1].0, "C");
        assert!((results[1].1 - 0.9939).abs() < 1e-3);
    }

    #[test]
    fn add_duplicate_fails() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0])]);
        let err = idx.add(&[0.0, 1.0, 0.0], "A").unwrap_err();
        assert!(matches!(err, vdb_common::Error::Conflict(_)));
    }

    #[test]
    fn remove_absent_fails() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0])]);
        assert!(idx.remove("B").is_err());
    }

    #[test]
    fn remove_then_readd_is_noop_on_membership() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0]), ("B", [0.0, 1.0, 0.0])]);
        idx.remove("A").unwrap();
        assert_eq!(idx.size(), 1);
        idx.add(&[1.0, 0.0, 0.0], "A").unwrap();
        assert_eq!(idx.size(), 2);
        let ids: std::collections::HashSet<_> = idx.ids.iter().cloned().collect();
        assert!(ids.contains("A") && ids.contains("B"));
    }

    #[test]
    fn update_then_search_finds_unique_closest() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0]), ("B", [0.0, 1.0, 0.0])]);
        idx.update("B", &[0.9, 0.0, 0.1]).unwrap();
        let results = idx.search(&[0.9, 0.0, 0.1], 1);
        assert_eq!(results[0].0, "B");
    }

    #[test]
    fn k_zero_or_empty_returns_empty() {
        let idx = build(&[("A", [1.0, 0.0, 0.0])]);
        assert!(idx.search(&[1.0, 0.0, 0.0], 0).is_empty());
        let empty = BruteForceIndex::new();
        assert!(empty.search(&[1.0, 0.0, 0.0], 5).is_empty());
    }
}
