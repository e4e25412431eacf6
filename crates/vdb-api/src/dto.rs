//! Request/response DTOs for the REST layer.
//!
//! Grounded on `app/api/schemas.py`. Kept separate from the domain model
//! (`vdb_core::model`) so wire shape can drift independently of storage
//! shape (e.g. omitting `metadata` internals or flattening timestamps).

use serde::{Deserialize, Serialize};

use vdb_common::config::IndexType;
use vdb_core::model::{Chunk, ChunkFilter, Document, Library};

#[derive(Debug, Deserialize)]
pub struct CreateLibraryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub embedding_dimension: usize,
    #[serde(default)]
    pub default_index_type: IndexType,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLibraryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_index_type: Option<IndexType>,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub embedding_dimension: usize,
    pub default_index_type: IndexType,
}

impl From<Library> for LibraryResponse {
    fn from(l: Library) -> Self {
        Self {
            id: l.id,
            name: l.name,
            description: l.description,
            embedding_dimension: l.embedding_dimension,
            default_index_type: l.default_index_type,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexBuildRequest {
    #[serde(default)]
    pub index_type: IndexType,
}

#[derive(Debug, Serialize)]
pub struct IndexStatusResponse {
    pub index_type: Option<IndexType>,
    pub size: usize,
    pub data_version: u64,
    pub index_version: i64,
    pub stale: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub description: Option<String>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            library_id: d.library_id,
            title: d.title,
            description: d.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateChunkRequest {
    pub text: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub use_embedding_service: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChunkRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub id: String,
    pub library_id: String,
    pub document_id: String,
    pub text: String,
}

impl From<Chunk> for ChunkResponse {
    fn from(c: Chunk) -> Self {
        Self {
            id: c.id,
            library_id: c.library_id,
            document_id: c.document_id,
            text: c.text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub use_embedding_service: bool,
    #[serde(default)]
    pub filter: Option<ChunkFilter>,
}

fn default_k() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub chunk_id: String,
    pub document_id: String,
    pub score: f32,
    pub text: String,
}
