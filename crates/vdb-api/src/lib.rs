//! REST API, persistence, replication, and the embedding-provider boundary
//! for the multi-tenant in-memory vector database (§6 of the design).
//!
//! Kept as a library (with a thin `main.rs` binary) so integration tests
//! can build an [`AppState`] and drive [`routes::configure`] directly,
//! the way the teacher's `lumadb-api` crate separates server wiring from
//! the `lumadb` binary that invokes it.

pub mod dto;
pub mod embedding;
pub mod error;
pub mod persistence;
pub mod replication;
pub mod routes;
pub mod state;

pub use state::AppState;
