//! Shared application state, built once at startup and handed to every
//! handler via `actix_web::web::Data` — no hidden globals or lazily
//! re-initialized singletons (§9, "global per-process singletons").
//!
//! Grounded on `app/api/deps.py`'s dependency providers, collapsed into a
//! single struct since Rust's ownership model makes per-request caching of
//! already-`Arc`'d services unnecessary.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::runtime::Handle;

use vdb_common::config::NodeRole;
use vdb_common::Settings;
use vdb_core::embedding::{EmbeddingProvider, LocalHashEmbedder};
use vdb_core::index_service::IndexService;
use vdb_core::lock::LockRegistry;
use vdb_core::query::QueryService;
use vdb_core::repo::{ChunkRepository, DocumentRepository, LibraryRepository};
use vdb_core::service::{ChunkService, DocumentService, LibraryService};
use vdb_core::version::VersionManager;

use crate::embedding::RemoteEmbedder;

pub struct AppState {
    pub settings: Settings,
    pub library_repo: Arc<LibraryRepository>,
    pub document_repo: Arc<DocumentRepository>,
    pub chunk_repo: Arc<ChunkRepository>,
    pub index_service: Arc<IndexService>,
    pub versions: Arc<VersionManager>,
    pub locks: Arc<LockRegistry>,
    pub library_service: LibraryService,
    pub document_service: DocumentService,
    pub chunk_service: ChunkService,
    pub query_service: QueryService,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(settings: Settings, runtime: Handle) -> Self {
        let library_repo = Arc::new(LibraryRepository::new());
        let document_repo = Arc::new(DocumentRepository::new());
        let chunk_repo = Arc::new(ChunkRepository::new());
        let locks = Arc::new(LockRegistry::new());
        let versions = Arc::new(VersionManager::new());
        let metrics_handle = vdb_common::metrics::install_recorder();
        let index_service = Arc::new(IndexService::new(
            locks.clone(),
            versions.clone(),
            settings.max_concurrent_index_builds,
            runtime,
        ));

        let library_service = LibraryService::new(
            library_repo.clone(),
            document_repo.clone(),
            chunk_repo.clone(),
            locks.clone(),
            versions.clone(),
            settings.max_embedding_dimension,
        );
        let document_service = DocumentService::new(library_repo.clone(), document_repo.clone());
        let chunk_service = ChunkService::new(
            library_repo.clone(),
            document_repo.clone(),
            chunk_repo.clone(),
            versions.clone(),
            locks.clone(),
            index_service.clone(),
        );
        let query_service = QueryService::new(
            locks.clone(),
            versions.clone(),
            chunk_repo.clone(),
            index_service.clone(),
            settings.allow_stale_index,
        );

        let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding_provider.as_str() {
            "remote" => {
                let endpoint = settings.embedding_endpoint.clone().unwrap_or_default();
                let api_key = settings.embedding_api_key.clone().unwrap_or_default();
                Arc::new(RemoteEmbedder::new(endpoint, api_key, settings.embedding_model.clone()))
            }
            _ => Arc::new(LocalHashEmbedder::new()),
        };

        Self {
            settings,
            library_repo,
            document_repo,
            chunk_repo,
            index_service,
            versions,
            locks,
            library_service,
            document_service,
            chunk_service,
            query_service,
            embedder,
            metrics_handle,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.settings.node_role == NodeRole::Leader
    }
}
