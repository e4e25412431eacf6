//! kNN query execution with filtering and staleness policy (C8).
//!
//! Grounded on `app/domain/services/query_service.py`. Filtered queries
//! always build a transient brute-force index over the filtered chunks —
//! never ANN-then-post-filter, which would silently under-return when the
//! ANN index's top-k misses filtered-out neighbors. Unfiltered queries
//! consult index freshness and `allow_stale_index` to decide whether to
//! serve the resident index as-is or fall back to an exact scan while a
//! rebuild is scheduled in the background.

use std::sync::Arc;

use vdb_common::error::Result;

use crate::index::{BruteForceIndex, ScoredId, VectorIndex};
use crate::index_service::IndexService;
use crate::lock::LockRegistry;
use crate::model::ChunkFilter;
use crate::repo::ChunkRepository;
use crate::version::VersionManager;

pub struct QueryService {
    locks: Arc<LockRegistry>,
    versions: Arc<VersionManager>,
    chunks: Arc<ChunkRepository>,
    indexes: Arc<IndexService>,
    allow_stale_index: bool,
}

impl QueryService {
    pub fn new(
        locks: Arc<LockRegistry>,
        versions: Arc<VersionManager>,
        chunks: Arc<ChunkRepository>,
        indexes: Arc<IndexService>,
        allow_stale_index: bool,
    ) -> Self {
        Self {
            locks,
            versions,
            chunks,
            indexes,
            allow_stale_index,
        }
    }

    pub fn knn(
        &self,
        library_id: &str,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredId>> {
        let lock = self.locks.get(library_id);
        let (result, served_stale) = lock.with_read(|| {
            if let Some(filter) = filter.filter(|f| f.is_active()) {
                let chunks = self.chunks.list_by_library(library_id);
                let filtered: Vec<_> = chunks.iter().filter(|c| filter.matches(c)).collect();
                let vectors: Vec<Vec<f32>> = filtered.iter().map(|c| c.embedding.clone()).collect();
                let ids: Vec<String> = filtered.iter().map(|c| c.id.clone()).collect();
                let mut bf = BruteForceIndex::new();
                bf.build(&vectors, &ids);
                return (Ok(bf.search(query_embedding, k)), false);
            }

            if self.versions.is_stale(library_id) {
                let chunks = self.chunks.list_by_library(library_id);
                self.indexes.rebuild_async_using_existing_type(library_id, chunks.clone());
                if !self.allow_stale_index {
                    let vectors: Vec<Vec<f32>> = chunks.iter().map(|c| c.embedding.clone()).collect();
                    let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
                    let mut bf = BruteForceIndex::new();
                    bf.build(&vectors, &ids);
                    return (Ok(bf.search(query_embedding, k)), false);
                }
                return (Ok(self.indexes.search(library_id, query_embedding, k)), true);
            }

            (Ok(self.indexes.search(library_id, query_embedding, k)), false)
        });
        vdb_common::metrics::record_query_served(served_stale);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chunk, Metadata};
    use crate::repo::{ChunkRepository, DocumentRepository, LibraryRepository};
    use vdb_common::config::IndexType;

    fn wiring(
        allow_stale: bool,
    ) -> (
        tokio::runtime::Runtime,
        Arc<ChunkRepository>,
        Arc<IndexService>,
        Arc<VersionManager>,
        QueryService,
    ) {
        let libraries = Arc::new(LibraryRepository::new());
        let _documents = Arc::new(DocumentRepository::new());
        let chunks = Arc::new(ChunkRepository::new());
        let locks = Arc::new(LockRegistry::new());
        let versions = Arc::new(VersionManager::new());
        let rt = tokio::runtime::Runtime::new().unwrap();
        let indexes = Arc::new(IndexService::new(
            locks.clone(),
            versions.clone(),
            2,
            rt.handle().clone(),
        ));
        let _ = libraries;

        let query = QueryService::new(locks, versions.clone(), chunks.clone(), indexes.clone(), allow_stale);
        (rt, chunks, indexes, versions, query)
    }

    fn chunk(id: &str, v: Vec<f32>, author: Option<&str>) -> Chunk {
        let mut c = Chunk::new(
            "lib1",
            "doc1",
            "hello",
            v,
            Metadata {
                author: author.map(|a| a.to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        c.id = id.to_string();
        c
    }

    #[test]
    fn filtered_query_never_consults_the_resident_index() {
        let (_rt, chunks, indexes, _versions, query) = wiring(true);
        chunks.create(chunk("a", vec![1.0, 0.0], Some("alice"))).unwrap();
        chunks.create(chunk("b", vec![0.0, 1.0], Some("bob"))).unwrap();
        // Deliberately leave the resident index empty/unbuilt.
        indexes.build_index("lib1", IndexType::BruteForce, &[]);

        let filter = ChunkFilter {
            author_in: Some(vec!["alice".into()]),
            ..Default::default()
        };
        let results = query.knn("lib1", &[1.0, 0.0], 5, Some(&filter)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn unfiltered_query_on_fresh_index_skips_rebuild() {
        let (_rt, chunks, indexes, _versions, query) = wiring(true);
        chunks.create(chunk("a", vec![1.0, 0.0], None)).unwrap();
        indexes.build_index("lib1", IndexType::BruteForce, &chunks.list_by_library("lib1"));

        let results = query.knn("lib1", &[1.0, 0.0], 5, None).unwrap();
        assert_eq!(results[0].0, "a");
        assert!(!indexes.is_building("lib1"));
    }

    #[test]
    fn unfiltered_query_on_stale_index_falls_back_to_exact_scan_when_disallowed() {
        let (_rt, chunks, indexes, versions, query) = wiring(false);
        indexes.build_index("lib1", IndexType::BruteForce, &[]);
        chunks.create(chunk("a", vec![1.0, 0.0], None)).unwrap();
        versions.bump_data("lib1");
        assert!(versions.is_stale("lib1"));

        let results = query.knn("lib1", &[1.0, 0.0], 5, None).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn unfiltered_query_on_stale_index_serves_resident_index_when_allowed() {
        let (_rt, chunks, indexes, versions, query) = wiring(true);
        indexes.build_index("lib1", IndexType::BruteForce, &[]);
        chunks.create(chunk("a", vec![1.0, 0.0], None)).unwrap();
        versions.bump_data("lib1");

        let results = query.knn("lib1", &[1.0, 0.0], 5, None).unwrap();
        assert!(results.is_empty());
    }
}
