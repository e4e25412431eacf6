//! Core domain: locks, versions, vector indexes, repositories, and the
//! services built on top of them (§3-§5 of the design).

pub mod embedding;
pub mod index;
pub mod index_service;
pub mod lock;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod version;

pub use index::VectorIndex;
pub use index_service::IndexService;
pub use lock::{LockRegistry, RwLock};
pub use model::{Chunk, ChunkFilter, Document, Library, Metadata};
pub use query::QueryService;
pub use repo::{ChunkRepository, DocumentRepository, LibraryRepository};
pub use service::{ChunkService, DocumentService, LibraryService};
pub use version::VersionManager;
