//! Shared error types, configuration and metrics for the vector database.
//!
//! Kept deliberately small: the core crate (`vdb-core`) and its
//! collaborators (`vdb-api`) depend on this crate for the handful of
//! cross-cutting concerns that don't belong to either.

pub mod config;
pub mod error;
pub mod metrics;

pub use config::Settings;
pub use error::{Error, Result};

/// Generate a new random entity id (UUID v4), matching the teacher's
/// use of `uuid::Uuid::new_v4()` for all entity identities.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC timestamp in RFC3339, used for all entity `created_at`/
/// `updated_at` fields.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
