//! Chunk, Document, and Library services (C7): enforce cross-entity
//! invariants, bump versions, and coordinate incremental index updates.
//!
//! Grounded on `app/domain/services/{chunk_service,document_service,
//! library_service}.py`. Two deliberate departures from the original
//! (REDESIGN FLAGS, SPEC_FULL §9):
//! - `LibraryService::delete` holds the library's write lock for the
//!   *entire* cascade (documents, then chunks, then the library itself),
//!   where the original released no lock at all during cascade and could
//!   race a concurrent chunk write.
//! - Chunk mutations hold the write lock across both the repository
//!   change and the index patch, so a reader can never observe a repo/ index
//!   mismatch.

use std::sync::Arc;

use vdb_common::config::IndexType;
use vdb_common::error::{Error, Result};

use crate::index_service::IndexService;
use crate::lock::LockRegistry;
use crate::model::{Chunk, Document, Library, Metadata};
use crate::repo::{ChunkRepository, DocumentRepository, LibraryRepository};
use crate::version::VersionManager;

pub struct LibraryService {
    libraries: Arc<LibraryRepository>,
    documents: Arc<DocumentRepository>,
    chunks: Arc<ChunkRepository>,
    locks: Arc<LockRegistry>,
    versions: Arc<VersionManager>,
    max_embedding_dimension: usize,
}

impl LibraryService {
    pub fn new(
        libraries: Arc<LibraryRepository>,
        documents: Arc<DocumentRepository>,
        chunks: Arc<ChunkRepository>,
        locks: Arc<LockRegistry>,
        versions: Arc<VersionManager>,
        max_embedding_dimension: usize,
    ) -> Self {
        Self {
            libraries,
            documents,
            chunks,
            locks,
            versions,
            max_embedding_dimension,
        }
    }

    pub fn create(
        &self,
        name: &str,
        embedding_dimension: usize,
        description: Option<String>,
        default_index_type: IndexType,
    ) -> Result<Library> {
        let lib = Library::new(
            name,
            description,
            embedding_dimension,
            default_index_type,
            self.max_embedding_dimension,
        )?;
        self.libraries.create(lib)
    }

    pub fn get(&self, library_id: &str) -> Result<Library> {
        self.libraries.get(library_id)
    }

    pub fn list(&self) -> Vec<Library> {
        self.libraries.list()
    }

    pub fn update(
        &self,
        library_id: &str,
        name: Option<String>,
        description: Option<String>,
        default_index_type: Option<IndexType>,
    ) -> Result<Library> {
        let mut lib = self.libraries.get(library_id)?;
        if let Some(name) = name {
            let name = name.trim().to_string();
            if name.is_empty() || name.len() > 128 {
                return Err(Error::validation("library name must be 1..=128 trimmed chars"));
            }
            lib.name = name;
        }
        if let Some(description) = description {
            if description.len() > 1024 {
                return Err(Error::validation("library description exceeds 1024 chars"));
            }
            lib.description = Some(description);
        }
        if let Some(index_type) = default_index_type {
            lib.default_index_type = index_type;
        }
        lib.touch();
        self.libraries.update(lib)
    }

    /// Delete a library along with every document and chunk beneath it.
    /// The whole cascade runs under the library's write lock so no writer
    /// can observe a partially-deleted library (§9).
    pub fn delete(&self, library_id: &str) -> Result<()> {
        self.libraries.get(library_id)?;
        let lock = self.locks.get(library_id);
        lock.with_write(|| {
            self.chunks.delete_by_library(library_id);
            self.documents.delete_by_library(library_id);
            self.libraries.delete(library_id)
        })
    }
}

pub struct DocumentService {
    libraries: Arc<LibraryRepository>,
    documents: Arc<DocumentRepository>,
}

impl DocumentService {
    pub fn new(libraries: Arc<LibraryRepository>, documents: Arc<DocumentRepository>) -> Self {
        Self { libraries, documents }
    }

    pub fn create(&self, library_id: &str, title: &str, description: Option<String>) -> Result<Document> {
        self.libraries.get(library_id)?;
        let doc = Document::new(library_id, title, description)?;
        self.documents.create(doc)
    }

    pub fn get(&self, document_id: &str) -> Result<Document> {
        self.documents.get(document_id)
    }

    pub fn list_by_library(&self, library_id: &str) -> Result<Vec<Document>> {
        self.libraries.get(library_id)?;
        Ok(self.documents.list_by_library(library_id))
    }

    pub fn update(&self, document_id: &str, title: Option<String>, description: Option<String>) -> Result<Document> {
        let mut doc = self.documents.get(document_id)?;
        if let Some(title) = title {
            let title = title.trim().to_string();
            if title.is_empty() || title.len() > 256 {
                return Err(Error::validation("document title must be 1..=256 trimmed chars"));
            }
            doc.title = title;
        }
        if let Some(description) = description {
            if description.len() > 2048 {
                return Err(Error::validation("document description exceeds 2048 chars"));
            }
            doc.description = Some(description);
        }
        doc.touch();
        self.documents.update(doc)
    }

    pub fn delete(&self, document_id: &str) -> Result<()> {
        self.documents.delete(document_id)?;
        Ok(())
    }
}

pub struct ChunkService {
    libraries: Arc<LibraryRepository>,
    documents: Arc<DocumentRepository>,
    chunks: Arc<ChunkRepository>,
    versions: Arc<VersionManager>,
    locks: Arc<LockRegistry>,
    indexes: Arc<IndexService>,
}

impl ChunkService {
    pub fn new(
        libraries: Arc<LibraryRepository>,
        documents: Arc<DocumentRepository>,
        chunks: Arc<ChunkRepository>,
        versions: Arc<VersionManager>,
        locks: Arc<LockRegistry>,
        indexes: Arc<IndexService>,
    ) -> Self {
        Self {
            libraries,
            documents,
            chunks,
            versions,
            locks,
            indexes,
        }
    }

    fn validate_embedding(&self, library_id: &str, embedding: &[f32]) -> Result<()> {
        let lib = self.libraries.get(library_id)?;
        if embedding.len() != lib.embedding_dimension {
            return Err(Error::validation(
                "embedding dimension does not match library embedding_dimension",
            ));
        }
        Ok(())
    }

    pub fn create(
        &self,
        library_id: &str,
        document_id: &str,
        text: &str,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<Chunk> {
        self.libraries.get(library_id)?;
        self.documents.get(document_id)?;
        self.validate_embedding(library_id, &embedding)?;

        let lock = self.locks.get(library_id);
        lock.with_write(|| {
            let chunk = Chunk::new(library_id, document_id, text, embedding, metadata)?;
            let chunk = self.chunks.create(chunk)?;
            self.versions.bump_data(library_id);
            self.indexes.add_chunk(library_id, &chunk);
            Ok(chunk)
        })
    }

    pub fn get(&self, chunk_id: &str) -> Result<Chunk> {
        self.chunks.get(chunk_id)
    }

    pub fn list_by_library(&self, library_id: &str) -> Result<Vec<Chunk>> {
        self.libraries.get(library_id)?;
        Ok(self.chunks.list_by_library(library_id))
    }

    pub fn list_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.documents.get(document_id)?;
        Ok(self.chunks.list_by_document(document_id))
    }

    pub fn update(&self, chunk_id: &str, text: Option<String>, embedding: Option<Vec<f32>>) -> Result<Chunk> {
        let existing = self.chunks.get(chunk_id)?;
        if let Some(embedding) = &embedding {
            self.validate_embedding(&existing.library_id, embedding)?;
        }
        let lock = self.locks.get(&existing.library_id);
        lock.with_write(|| {
            let mut chunk = existing.clone();
            if let Some(text) = text {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(Error::validation("chunk text cannot be empty"));
                }
                chunk.text = text;
            }
            let embedding_changed = embedding.is_some();
            if let Some(embedding) = embedding {
                chunk.embedding = embedding;
            }
            chunk.touch();
            let chunk = self.chunks.update(chunk)?;
            self.versions.bump_data(&chunk.library_id);
            if embedding_changed {
                self.indexes.update_chunk(&chunk.library_id, &chunk);
            }
            Ok(chunk)
        })
    }

    pub fn delete(&self, chunk_id: &str) -> Result<()> {
        let existing = self.chunks.get(chunk_id)?;
        let lock = self.locks.get(&existing.library_id);
        lock.with_write(|| {
            self.chunks.delete(chunk_id)?;
            self.versions.bump_data(&existing.library_id);
            self.indexes.remove_chunk(&existing.library_id, chunk_id);
            Ok(())
        })
    }
}
