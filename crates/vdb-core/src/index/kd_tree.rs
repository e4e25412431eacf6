//! Balanced median-split kd-tree index (§4.4.2).
//!
//! Grounded on `app/domain/indexes/kd_tree.py`. `add`/`remove`/`update`
//! are full rebuilds — acceptable because index maintenance always runs
//! under the library write lock and the kd-tree targets low-dimension
//! workloads, not high-churn ones. Unlike the original, `add` checks for
//! a duplicate id first (REDESIGN FLAGS, §9): all three index variants
//! share the same *Duplicate* contract.

use std::collections::HashMap;

use super::{duplicate_id_err, normalize, not_found_id_err, ScoredId, VectorIndex};
use vdb_common::error::Result;

struct Node {
    point: Vec<f32>,
    id: String,
    axis: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

#[derive(Default)]
pub struct KdTreeIndex {
    root: Option<Box<Node>>,
    size: usize,
    points: HashMap<String, Vec<f32>>,
}

impl KdTreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_recursive(items: &mut [(Vec<f32>, String)], depth: usize) -> Option<Box<Node>> {
        if items.is_empty() {
            return None;
        }
        let dim = items[0].0.len();
        let axis = if dim == 0 { 0 } else { depth % dim };
        items.sort_by(|a, b| {
            a.0[axis]
                .partial_cmp(&b.0[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = items.len() / 2;
        let (point, id) = items[mid].clone();
        let (left_items, rest) = items.split_at_mut(mid);
        let right_items = &mut rest[1..];
        Some(Box::new(Node {
            point,
            id,
            axis,
            left: Self::build_recursive(left_items, depth + 1),
            right: Self::build_recursive(right_items, depth + 1),
        }))
    }

    fn rebuild_from_points(&mut self) {
        let mut items: Vec<(Vec<f32>, String)> = self
            .points
            .iter()
            .map(|(id, p)| (p.clone(), id.clone()))
            .collect();
        self.size = items.len();
        self.root = Self::build_recursive(&mut items, 0);
    }

    fn search_node(node: &Node, q: &[f32], k: usize, best: &mut Vec<(f32, String)>) {
        let dist_sq: f32 = q
            .iter()
            .zip(node.point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        best.push((dist_sq, node.id.clone()));
        best.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        if best.len() > k {
            best.pop();
        }

        let axis = node.axis;
        let delta = q[axis] - node.point[axis];
        let (first, second) = if delta < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };
        if let Some(first) = first {
            Self::search_node(first, q, k, best);
        }
        if best.len() < k || (delta * delta) < best.last().map(|x| x.0).unwrap_or(f32::MAX) {
            if let Some(second) = second {
                Self::search_node(second, q, k, best);
            }
        }
    }
}

impl VectorIndex for KdTreeIndex {
    fn build(&mut self, vectors: &[Vec<f32>], ids: &[String]) {
        self.points = vectors
            .iter()
            .zip(ids.iter())
            .map(|(v, id)| (id.clone(), normalize(v)))
            .collect();
        self.rebuild_from_points();
    }

    fn add(&mut self, vector: &[f32], id: &str) -> Result<()> {
        if self.points.contains_key(id) {
            return Err(duplicate_id_err(id));
        }
        self.points.insert(id.to_string(), normalize(vector));
        self.rebuild_from_points();
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        if self.points.remove(id).is_none() {
            return Err(not_found_id_err(id));
        }
        self.rebuild_from_points();
        Ok(())
    }

    fn update(&mut self, id: &str, new_vector: &[f32]) -> Result<()> {
        if !self.points.contains_key(id) {
            return Err(not_found_id_err(id));
        }
        self.points.insert(id.to_string(), normalize(new_vector));
        self.rebuild_from_points();
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        let q = normalize(query);
        let mut best: Vec<(f32, String)> = Vec::new();
        Self::search_node(root, &q, k, &mut best);
        best.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        best.truncate(k);
        best.into_iter()
            .map(|(dist_sq, id)| (id, 1.0 - dist_sq / 2.0))
            .collect()
    }

    fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(&str, [f32; 3])]) -> KdTreeIndex {
        let mut idx = KdTreeIndex::new();
        let ids: Vec<String> = pairs.iter().map(|(id, _)| id.to_string()).collect();
        let vecs: Vec<Vec<f32>> = pairs.iter().map(|(_, v)| v.to_vec()).collect();
        idx.build(&vecs, &ids);
        idx
    }

    #[test]
    fn parity_with_brute_force_scenario_2() {
        let idx = build(&[
            ("A", [1.0, 0.0, 0.0]),
            ("B", [0.0, 1.0, 0.0]),
            ("C", [0.9, 0.1, 0.0]),
        ]);
        let results = idx.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "A");
        assert_eq!(results[1].0, "C");
    }

    #[test]
    fn add_duplicate_fails() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0])]);
        assert!(idx.add(&[0.0, 1.0, 0.0], "A").is_err());
    }

    #[test]
    fn remove_and_update_maintain_membership() {
        let mut idx = build(&[("A", [1.0, 0.0, 0.0]), ("B", [0.0, 1.0, 0.0])]);
        idx.remove("A").unwrap();
        assert_eq!(idx.size(), 1);
        assert!(idx.remove("A").is_err());
        idx.update("B", &[0.0, 0.0, 1.0]).unwrap();
        let results = idx.search(&[0.0, 0.0, 1.0], 1);
        assert_eq!(results[0].0, "B");
    }

    #[test]
    fn empty_tree_search_is_empty() {
        let idx = KdTreeIndex::new();
        assert!(idx.search(&[1.0, 0.0], 3).is_empty());
    }
}
