//! Random-hyperplane LSH index (§4.4.3).
//!
//! Grounded on `app/domain/indexes/lsh.py`. Bucket key is the
//! concatenation of sign bits of `<v, plane_i>`; an empty target bucket
//! falls back to an exhaustive scan, guaranteeing a non-empty result
//! whenever the index is non-empty. Planes are re-seeded whenever the
//! vector dimension changes, and otherwise persist across `build` calls.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use super::{cosine_similarity, duplicate_id_err, normalize, not_found_id_err, ScoredId, VectorIndex};
use vdb_common::error::Result;

pub struct LshIndex {
    num_planes: usize,
    seed: u64,
    planes: Vec<Vec<f32>>,
    dim: usize,
    buckets: HashMap<String, Vec<String>>,
    vectors: HashMap<String, Vec<f32>>,
}

impl LshIndex {
    pub fn new(num_planes: usize, seed: u64) -> Self {
        Self {
            num_planes,
            seed,
            planes: Vec::new(),
            dim: 0,
            buckets: HashMap::new(),
            vectors: HashMap::new(),
        }
    }

    fn init_planes(&mut self, dim: usize) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        self.planes = (0..self.num_planes)
            .map(|_| {
                let raw: Vec<f32> = (0..dim)
                    .map(|_| StandardNormal.sample(&mut rng))
                    .collect();
                normalize(&raw)
            })
            .collect();
        self.dim = dim;
    }

    fn hash(&self, v: &[f32]) -> String {
        self.planes
            .iter()
            .map(|p| if super::dot(v, p) >= 0.0 { '1' } else { '0' })
            .collect()
    }
}

impl VectorIndex for LshIndex {
    fn build(&mut self, vectors: &[Vec<f32>], ids: &[String]) {
        self.buckets.clear();
        self.vectors.clear();
        if vectors.is_empty() {
            self.planes.clear();
            self.dim = 0;
            return;
        }
        let dim = vectors[0].len();
        if self.planes.is_empty() || self.dim != dim {
            self.init_planes(dim);
        }
        for (v, id) in vectors.iter().zip(ids.iter()) {
            let vn = normalize(v);
            let key = self.hash(&vn);
            self.vectors.insert(id.clone(), vn);
            self.buckets.entry(key).or_default().push(id.clone());
        }
    }

    fn add(&mut self, vector: &[f32], id: &str) -> Result<()> {
        if self.vectors.contains_key(id) {
            return Err(duplicate_id_err(id));
        }
        let vn = normalize(vector);
        if self.planes.is_empty() || self.dim != vn.len() {
            self.init_planes(vn.len());
        }
        let key = self.hash(&vn);
        self.vectors.insert(id.to_string(), vn);
        self.buckets.entry(key).or_default().push(id.to_string());
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let vn = self.vectors.remove(id).ok_or_else(|| not_found_id_err(id))?;
        let key = self.hash(&vn);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.retain(|x| x != id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
        Ok(())
    }

    fn update(&mut self, id: &str, new_vector: &[f32]) -> Result<()> {
        if !self.vectors.contains_key(id) {
            return Err(not_found_id_err(id));
        }
        self.remove(id)?;
        self.add(new_vector, id)?;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        if k == 0 || self.vectors.is_empty() {
            return Vec::new();
        }
        let q = normalize(query);
        let mut candidates: Vec<&String> = if !self.planes.is_empty() {
            let key = self.hash(&q);
            self.buckets.get(&key).map(|b| b.iter().collect()).unwrap_or_default()
        } else {
            Vec::new()
        };
        if candidates.is_empty() {
            candidates = self.vectors.keys().collect();
        }
        let mut pairs: Vec<ScoredId> = candidates
            .into_iter()
            .map(|id| (id.clone(), cosine_similarity(&q, &self.vectors[id])))
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs.truncate(k);
        pairs
    }

    fn size(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(&str, [f32; 3])], num_planes: usize, seed: u64) -> LshIndex {
        let mut idx = LshIndex::new(num_planes, seed);
        let ids: Vec<String> = pairs.iter().map(|(id, _)| id.to_string()).collect();
        let vecs: Vec<Vec<f32>> = pairs.iter().map(|(_, v)| v.to_vec()).collect();
        idx.build(&vecs, &ids);
        idx
    }

    #[test]
    fn bucket_miss_fallback_finds_closest_scenario_3() {
        let idx = build(
            &[
                ("A", [1.0, 0.0, 0.0]),
                ("B", [0.0, 1.0, 0.0]),
                ("C", [0.9, 0.1, 0.0]),
            ],
            8,
            123,
        );
        let results = idx.search(&[1.0, 0.0, 0.0], 2);
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"A"));
        assert!(results[0].1 >= 0.5);
    }

    #[test]
    fn add_duplicate_fails() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0])], 8, 1);
        assert!(idx.add(&[0.0, 1.0, 0.0], "A").is_err());
    }

    #[test]
    fn remove_then_search_excludes_id() {
        let mut idx = build(
            &[("A", [1.0, 0.0, 0.0]), ("B", [0.0, 1.0, 0.0])],
            8,
            1,
        );
        idx.remove("A").unwrap();
        let results = idx.search(&[1.0, 0.0, 0.0], 2);
        assert!(results.iter().all(|(id, _)| id != "A"));
    }

    #[test]
    fn dimension_change_reseeds_planes() {
        let mut idx = LshIndex::new(4, 7);
        idx.build(&[vec![1.0, 0.0]], &["A".to_string()]);
        let dim2 = idx.dim;
        idx.build(&[vec![1.0, 0.0, 0.0]], &["A".to_string()]);
        assert_ne!(dim2, idx.dim);
        assert_eq!(idx.dim, 3);
    }

    #[test]
    fn empty_index_search_is_empty() {
        let idx = LshIndex::new(8, 1);
        assert!(idx.search(&[1.0, 0.0], 3).is_empty());
    }
}
