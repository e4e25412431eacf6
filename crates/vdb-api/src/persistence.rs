//! JSON snapshot persistence (§6.3).
//!
//! Grounded on `app/domain/services/persistence_service.py` (via the
//! original's model `.model_dump()` round trip) and the teacher's atomic
//! tempfile-then-rename pattern used for its own config/state writes.
//! Three files — `libraries.json`, `documents.json`, `chunks.json` — each
//! a JSON array of entity records. Writes go to a sibling temp file first
//! so a crash mid-write never leaves a half-written snapshot in place.

use std::path::{Path, PathBuf};

use vdb_common::error::Result;
use vdb_core::model::{Chunk, Document, Library};
use vdb_core::repo::{ChunkRepository, DocumentRepository, LibraryRepository};

pub struct PersistenceService {
    dir: PathBuf,
}

impl PersistenceService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn save(
        &self,
        libraries: &LibraryRepository,
        documents: &DocumentRepository,
        chunks: &ChunkRepository,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let libs = libraries.list();
        let mut docs = Vec::new();
        let mut chunk_records = Vec::new();
        for lib in &libs {
            docs.extend(documents.list_by_library(&lib.id));
            chunk_records.extend(chunks.list_by_library(&lib.id));
        }

        Self::write_atomic(&self.dir.join("libraries.json"), &serde_json::to_vec_pretty(&libs)?)?;
        Self::write_atomic(&self.dir.join("documents.json"), &serde_json::to_vec_pretty(&docs)?)?;
        Self::write_atomic(&self.dir.join("chunks.json"), &serde_json::to_vec_pretty(&chunk_records)?)?;
        Ok(())
    }

    /// Load a snapshot from disk, if present. Missing files are treated as
    /// empty collections rather than an error, so a fresh `persistence_dir`
    /// starts the process with no data instead of failing to boot.
    pub fn load(&self) -> Result<Snapshot> {
        let libraries = Self::read_or_empty(&self.dir.join("libraries.json"))?;
        let documents = Self::read_or_empty(&self.dir.join("documents.json"))?;
        let chunks = Self::read_or_empty(&self.dir.join("chunks.json"))?;
        Ok(Snapshot {
            libraries,
            documents,
            chunks,
        })
    }

    fn read_or_empty<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub libraries: Vec<Library>,
    pub documents: Vec<Document>,
    pub chunks: Vec<Chunk>,
}
