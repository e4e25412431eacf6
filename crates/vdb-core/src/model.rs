//! Entity types (§3): Library, Document, Chunk, and the chunk filter DTO.
//!
//! Grounded on `app/domain/models/{library,document,chunk,common,filters}.py`.
//! Validation (trimming, length bounds, tag dedup) happens at construction
//! time so a repository never holds an entity violating §3's invariants.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vdb_common::config::IndexType;
use vdb_common::error::{Error, Result};
use vdb_common::{new_id, now};

/// Structured metadata fields carried by chunks (tags, author, provenance).
/// Documents and libraries carry a looser `HashMap<String, String>` instead,
/// since §3 only specifies tag/author/source structure for chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Metadata {
    /// Trim, drop empties, enforce the 64-char tag length cap, and
    /// deduplicate while preserving first-seen order.
    pub fn normalize_tags(mut self) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();
        for tag in self.tags.drain(..) {
            let clean = tag.trim().to_string();
            if clean.is_empty() {
                continue;
            }
            if clean.len() > 64 {
                return Err(Error::validation("tag too long (max 64 chars)"));
            }
            if seen.insert(clean.clone()) {
                unique.push(clean);
            }
        }
        self.tags = unique;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub embedding_dimension: usize,
    pub default_index_type: IndexType,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn new(
        name: &str,
        description: Option<String>,
        embedding_dimension: usize,
        default_index_type: IndexType,
        max_embedding_dimension: usize,
    ) -> Result<Self> {
        let name = name.trim().to_string();
        if name.is_empty() || name.len() > 128 {
            return Err(Error::validation(
                "library name must be 1..=128 trimmed chars",
            ));
        }
        if let Some(d) = &description {
            if d.len() > 1024 {
                return Err(Error::validation("library description exceeds 1024 chars"));
            }
        }
        if embedding_dimension == 0 || embedding_dimension > max_embedding_dimension {
            return Err(Error::validation(format!(
                "embedding_dimension must be in [1, {max_embedding_dimension}]"
            )));
        }
        let ts = now();
        Ok(Self {
            id: new_id(),
            name,
            description,
            embedding_dimension,
            default_index_type,
            metadata: HashMap::new(),
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub description: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(library_id: &str, title: &str, description: Option<String>) -> Result<Self> {
        let title = title.trim().to_string();
        if title.is_empty() || title.len() > 256 {
            return Err(Error::validation("document title must be 1..=256 trimmed chars"));
        }
        if let Some(d) = &description {
            if d.len() > 2048 {
                return Err(Error::validation("document description exceeds 2048 chars"));
            }
        }
        let ts = now();
        Ok(Self {
            id: new_id(),
            library_id: library_id.to_string(),
            title,
            description,
            metadata: HashMap::new(),
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub library_id: String,
    pub document_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        library_id: &str,
        document_id: &str,
        text: &str,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<Self> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Error::validation("chunk text cannot be empty"));
        }
        if embedding.is_empty() {
            return Err(Error::validation("embedding cannot be empty"));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(Error::validation("embedding must contain only finite numbers"));
        }
        let metadata = metadata.normalize_tags()?;
        let ts = now();
        Ok(Self {
            id: new_id(),
            library_id: library_id.to_string(),
            document_id: document_id.to_string(),
            text,
            embedding,
            metadata,
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Filter predicate applied in the filtered query path (§4.8).
///
/// Grounded on `app/domain/models/filters.py`; a chunk matches iff ALL
/// present fields hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkFilter {
    #[serde(default)]
    pub tags_any: Option<Vec<String>>,
    #[serde(default)]
    pub tags_all: Option<Vec<String>>,
    #[serde(default)]
    pub author_in: Option<Vec<String>>,
    #[serde(default)]
    pub created_at_from: Option<String>,
    #[serde(default)]
    pub created_at_to: Option<String>,
    #[serde(default)]
    pub text_contains: Option<String>,
}

impl ChunkFilter {
    /// Whether any field is set (an empty filter short-circuits to the
    /// unfiltered query path, per §4.8).
    pub fn is_active(&self) -> bool {
        self.tags_any.is_some()
            || self.tags_all.is_some()
            || self.author_in.is_some()
            || self.created_at_from.is_some()
            || self.created_at_to.is_some()
            || self.text_contains.is_some()
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(needle) = &self.text_contains {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty() && !chunk.text.to_lowercase().contains(&needle) {
                return false;
            }
        }
        // Malformed timestamps are ignored (the bound is treated as absent),
        // not rejected — per §4.8.
        if let Some(from) = &self.created_at_from {
            if let Ok(from) = DateTime::parse_from_rfc3339(from) {
                if chunk.created_at < from {
                    return false;
                }
            }
        }
        if let Some(to) = &self.created_at_to {
            if let Ok(to) = DateTime::parse_from_rfc3339(to) {
                if chunk.created_at > to {
                    return false;
                }
            }
        }
        if let Some(any) = &self.tags_any {
            if !any.iter().any(|t| chunk.metadata.tags.contains(t)) {
                return false;
            }
        }
        if let Some(all) = &self.tags_all {
            if !all.iter().all(|t| chunk.metadata.tags.contains(t)) {
                return false;
            }
        }
        if let Some(authors) = &self.author_in {
            match &chunk.metadata.author {
                Some(a) => {
                    if !authors.contains(a) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_rejects_dimension_mismatch_bounds() {
        assert!(Library::new("lib", None, 0, IndexType::BruteForce, 4096).is_err());
        assert!(Library::new("lib", None, 5000, IndexType::BruteForce, 4096).is_err());
        assert!(Library::new("  ", None, 3, IndexType::BruteForce, 4096).is_err());
    }

    #[test]
    fn chunk_rejects_empty_text_and_embedding() {
        assert!(Chunk::new("l", "d", "   ", vec![1.0], Metadata::default()).is_err());
        assert!(Chunk::new("l", "d", "hi", vec![], Metadata::default()).is_err());
        assert!(Chunk::new("l", "d", "hi", vec![f32::NAN], Metadata::default()).is_err());
    }

    #[test]
    fn metadata_dedups_and_caps_tag_length() {
        let meta = Metadata {
            tags: vec!["a".into(), " a ".into(), "b".into()],
            ..Default::default()
        };
        let normalized = meta.normalize_tags().unwrap();
        assert_eq!(normalized.tags, vec!["a".to_string(), "b".to_string()]);

        let too_long = Metadata {
            tags: vec!["x".repeat(65)],
            ..Default::default()
        };
        assert!(too_long.normalize_tags().is_err());
    }

    #[test]
    fn filter_requires_all_active_fields_to_match() {
        let chunk = Chunk::new(
            "l",
            "d",
            "hello world",
            vec![1.0],
            Metadata {
                tags: vec!["x".into(), "y".into()],
                author: Some("alice".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let mut filter = ChunkFilter {
            text_contains: Some("HELLO".into()),
            tags_all: Some(vec!["x".into(), "y".into()]),
            author_in: Some(vec!["alice".into(), "bob".into()]),
            ..Default::default()
        };
        assert!(filter.is_active());
        assert!(filter.matches(&chunk));

        filter.author_in = Some(vec!["bob".into()]);
        assert!(!filter.matches(&chunk));
    }

    #[test]
    fn malformed_timestamp_bound_is_ignored() {
        let chunk = Chunk::new("l", "d", "hi", vec![1.0], Metadata::default()).unwrap();
        let filter = ChunkFilter {
            created_at_from: Some("not-a-date".into()),
            ..Default::default()
        };
        assert!(filter.matches(&chunk));
    }
}
