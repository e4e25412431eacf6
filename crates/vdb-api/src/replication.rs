//! Leader/follower replication (§6.4).
//!
//! Grounded on `app/domain/services/replication_service.py` and the
//! follower-side poll loop implied by `app/api/routers/replication.py`.
//! A follower polls the leader's snapshot endpoint on a fixed interval,
//! wholesale-replaces its three repositories, then synchronously rebuilds
//! every library's index using its `default_index_type`. There is no
//! delta protocol — each tick ships the entire dataset. Poll errors are
//! logged and retried on the next tick; they never crash the process.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use vdb_core::index_service::IndexService;
use vdb_core::repo::{ChunkRepository, DocumentRepository, LibraryRepository};

use crate::persistence::Snapshot;

pub struct ReplicationService {
    leader_url: String,
    client: reqwest::blocking::Client,
    libraries: Arc<LibraryRepository>,
    documents: Arc<DocumentRepository>,
    chunks: Arc<ChunkRepository>,
    indexes: Arc<IndexService>,
}

impl ReplicationService {
    pub fn new(
        leader_url: String,
        libraries: Arc<LibraryRepository>,
        documents: Arc<DocumentRepository>,
        chunks: Arc<ChunkRepository>,
        indexes: Arc<IndexService>,
    ) -> Self {
        Self {
            leader_url,
            client: reqwest::blocking::Client::new(),
            libraries,
            documents,
            chunks,
            indexes,
        }
    }

    fn fetch_snapshot(&self) -> anyhow::Result<Snapshot> {
        let url = format!("{}/api/v1/replication/snapshot", self.leader_url.trim_end_matches('/'));
        let snapshot = self.client.get(url).send()?.error_for_status()?.json::<Snapshot>()?;
        Ok(snapshot)
    }

    /// Apply one poll cycle: fetch, wholesale-replace, then rebuild every
    /// library's index synchronously with its own default variant.
    pub fn sync_once(&self) {
        let snapshot = match self.fetch_snapshot() {
            Ok(s) => s,
            Err(err) => {
                error!(error = %err, "replication poll failed, retrying next tick");
                return;
            }
        };

        let library_types: Vec<(String, vdb_common::config::IndexType)> =
            snapshot.libraries.iter().map(|l| (l.id.clone(), l.default_index_type)).collect();

        self.libraries.replace_all(snapshot.libraries);
        self.documents.replace_all(snapshot.documents);
        self.chunks.replace_all(snapshot.chunks);

        for (library_id, index_type) in library_types {
            let chunks = self.chunks.list_by_library(&library_id);
            self.indexes.build_index(&library_id, index_type, &chunks);
        }
        info!("replication snapshot applied");
    }

    /// Run the poll loop on the current thread, blocking forever. Intended
    /// to be spawned on its own OS thread by `main`.
    pub fn run_forever(&self, interval: Duration) -> ! {
        loop {
            self.sync_once();
            std::thread::sleep(interval);
        }
    }
}
