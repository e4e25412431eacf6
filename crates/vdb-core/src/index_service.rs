//! Per-library vector index lifecycle: builds, incremental maintenance,
//! and search (C6).
//!
//! Grounded on `app/domain/services/index_service.py`. A full build reads
//! a chunk snapshot under the library's read lock, builds the new index
//! off-lock (the expensive part), then swaps it in and syncs the version
//! under the write lock — so readers and the writer-preferring lock (§4.1)
//! never block on index construction itself. Background builds run on a
//! dedicated OS thread rather than a `tokio::spawn` task, since building is
//! CPU-bound and would otherwise starve the async executor; concurrency
//! across libraries is capped with a `tokio::sync::Semaphore`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use vdb_common::config::IndexType;

use crate::index::{new_index, ScoredId, VectorIndex};
use crate::lock::LockRegistry;
use crate::model::Chunk;
use crate::version::VersionManager;

pub struct IndexService {
    locks: Arc<LockRegistry>,
    versions: Arc<VersionManager>,
    indexes: Mutex<HashMap<String, Box<dyn VectorIndex>>>,
    index_types: Mutex<HashMap<String, IndexType>>,
    building: Mutex<HashMap<String, bool>>,
    build_semaphore: Arc<Semaphore>,
    runtime: tokio::runtime::Handle,
}

impl IndexService {
    pub fn new(
        locks: Arc<LockRegistry>,
        versions: Arc<VersionManager>,
        max_concurrent_index_builds: usize,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            locks,
            versions,
            indexes: Mutex::new(HashMap::new()),
            index_types: Mutex::new(HashMap::new()),
            building: Mutex::new(HashMap::new()),
            build_semaphore: Arc::new(Semaphore::new(max_concurrent_index_builds.max(1))),
            runtime,
        }
    }

    /// Build (or rebuild) `library_id`'s index from `chunks`, synchronously.
    pub fn build_index(&self, library_id: &str, index_type: IndexType, chunks: &[Chunk]) {
        let lock = self.locks.get(library_id);
        let (vectors, ids) = lock.with_read(|| {
            let vectors: Vec<Vec<f32>> = chunks.iter().map(|c| c.embedding.clone()).collect();
            let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
            (vectors, ids)
        });

        let mut index = new_index(index_type).expect("index_type is always supported");
        index.build(&vectors, &ids);

        lock.with_write(|| {
            self.indexes.lock().insert(library_id.to_string(), index);
            self.index_types.lock().insert(library_id.to_string(), index_type);
            let vi = self.versions.get(library_id);
            self.versions.set_index_version(library_id, vi.data_version as i64);
            self.building.lock().insert(library_id.to_string(), false);
        });
    }

    /// Schedule a background build, skipping if one is already in flight
    /// for this library. Returns immediately.
    pub fn build_index_async(self: &Arc<Self>, library_id: &str, index_type: IndexType, chunks: Vec<Chunk>) {
        {
            let mut building = self.building.lock();
            if *building.get(library_id).unwrap_or(&false) {
                return;
            }
            building.insert(library_id.to_string(), true);
        }
        let this = Arc::clone(self);
        let library_id = library_id.to_string();
        std::thread::spawn(move || {
            let permit = this.runtime.block_on(this.build_semaphore.clone().acquire_owned());
            vdb_common::metrics::record_index_build_started();
            info!(library_id = %library_id, "index build started");
            this.build_index(&library_id, index_type, &chunks);
            drop(permit);
            vdb_common::metrics::record_index_build_completed();
            info!(library_id = %library_id, "index build completed");
        });
    }

    pub fn rebuild_async_using_existing_type(self: &Arc<Self>, library_id: &str, chunks: Vec<Chunk>) {
        let itype = self
            .index_types
            .lock()
            .get(library_id)
            .copied()
            .unwrap_or_default();
        self.build_index_async(library_id, itype, chunks);
    }

    pub fn is_building(&self, library_id: &str) -> bool {
        *self.building.lock().get(library_id).unwrap_or(&false)
    }

    pub fn get_index_type(&self, library_id: &str) -> Option<IndexType> {
        self.index_types.lock().get(library_id).copied()
    }

    /// Number of vectors in `library_id`'s resident index, or 0 if none
    /// exists. Used by the index:status endpoint.
    pub fn index_size(&self, library_id: &str) -> usize {
        self.indexes.lock().get(library_id).map(|idx| idx.size()).unwrap_or(0)
    }

    /// Incrementally add `chunk` to its library's resident index, if one
    /// exists, and re-sync the index version (the index just caught up
    /// with the data it was handed). Caller must hold the library write
    /// lock.
    pub fn add_chunk(&self, library_id: &str, chunk: &Chunk) {
        let mut indexes = self.indexes.lock();
        if let Some(idx) = indexes.get_mut(library_id) {
            if idx.add(&chunk.embedding, &chunk.id).is_err() {
                warn!(library_id, chunk_id = %chunk.id, "index add rejected a duplicate id");
                return;
            }
            let vi = self.versions.get(library_id);
            self.versions.set_index_version(library_id, vi.data_version as i64);
        }
    }

    pub fn remove_chunk(&self, library_id: &str, chunk_id: &str) {
        let mut indexes = self.indexes.lock();
        if let Some(idx) = indexes.get_mut(library_id) {
            if idx.remove(chunk_id).is_err() {
                return;
            }
            let vi = self.versions.get(library_id);
            self.versions.set_index_version(library_id, vi.data_version as i64);
        }
    }

    pub fn update_chunk(&self, library_id: &str, chunk: &Chunk) {
        let mut indexes = self.indexes.lock();
        if let Some(idx) = indexes.get_mut(library_id) {
            if idx.update(&chunk.id, &chunk.embedding).is_err() {
                return;
            }
            let vi = self.versions.get(library_id);
            self.versions.set_index_version(library_id, vi.data_version as i64);
        }
    }

    pub fn search(&self, library_id: &str, query: &[f32], k: usize) -> Vec<ScoredId> {
        self.indexes
            .lock()
            .get(library_id)
            .map(|idx| idx.search(query, k))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    fn chunk(id: &str, v: Vec<f32>) -> Chunk {
        let mut c = Chunk::new("lib1", "doc1", "text", v, Metadata::default()).unwrap();
        c.id = id.to_string();
        c
    }

    fn service() -> (tokio::runtime::Runtime, Arc<IndexService>) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let handle = rt.handle().clone();
        let svc = Arc::new(IndexService::new(
            Arc::new(LockRegistry::new()),
            Arc::new(VersionManager::new()),
            2,
            handle,
        ));
        (rt, svc)
    }

    #[test]
    fn build_then_search_returns_results() {
        let (_rt, svc) = service();
        let chunks = vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])];
        svc.build_index("lib1", IndexType::BruteForce, &chunks);
        let results = svc.search("lib1", &[1.0, 0.0], 1);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn incremental_add_is_reflected_without_rebuild() {
        let (_rt, svc) = service();
        svc.build_index("lib1", IndexType::BruteForce, &[]);
        svc.add_chunk("lib1", &chunk("a", vec![1.0, 0.0]));
        let results = svc.search("lib1", &[1.0, 0.0], 1);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn async_build_skips_if_already_building() {
        let (_rt, svc) = service();
        svc.building.lock().insert("lib1".to_string(), true);
        svc.build_index_async("lib1", IndexType::BruteForce, vec![chunk("a", vec![1.0])]);
        assert!(svc.indexes.lock().get("lib1").is_none());
    }
}
