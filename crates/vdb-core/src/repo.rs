//! Thread-safe in-memory repositories (C5) for libraries, documents, and
//! chunks, each with the secondary indexes services need for cascades and
//! listing.
//!
//! Grounded on `app/domain/repositories/{libraries,documents,chunks}.py`.
//! A repository only guarantees its own internal consistency (the map and
//! its secondary indexes agree); cross-entity invariants — e.g. "a chunk's
//! document must exist" — are the services' job (§5).

use std::collections::HashMap;

use parking_lot::Mutex;

use vdb_common::error::{Error, Result};

use crate::model::{Chunk, Document, Library};

pub struct LibraryRepository {
    items: Mutex<HashMap<String, Library>>,
}

impl Default for LibraryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryRepository {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, library: Library) -> Result<Library> {
        let mut items = self.items.lock();
        if items.contains_key(&library.id) {
            return Err(Error::conflict("library id collision"));
        }
        items.insert(library.id.clone(), library.clone());
        Ok(library)
    }

    pub fn get(&self, id: &str) -> Result<Library> {
        self.items
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("library not found: {id}")))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.items.lock().contains_key(id)
    }

    pub fn list(&self) -> Vec<Library> {
        self.items.lock().values().cloned().collect()
    }

    pub fn update(&self, library: Library) -> Result<Library> {
        let mut items = self.items.lock();
        if !items.contains_key(&library.id) {
            return Err(Error::not_found(format!("library not found: {}", library.id)));
        }
        items.insert(library.id.clone(), library.clone());
        Ok(library)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.items
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("library not found: {id}")))
    }

    /// Wholesale-replace the repository's contents (§6.4, follower sync).
    pub fn replace_all(&self, libraries: Vec<Library>) {
        *self.items.lock() = libraries.into_iter().map(|l| (l.id.clone(), l)).collect();
    }
}

pub struct DocumentRepository {
    items: Mutex<HashMap<String, Document>>,
    by_library: Mutex<HashMap<String, Vec<String>>>,
}

impl Default for DocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRepository {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            by_library: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, document: Document) -> Result<Document> {
        let mut items = self.items.lock();
        if items.contains_key(&document.id) {
            return Err(Error::conflict("document id collision"));
        }
        self.by_library
            .lock()
            .entry(document.library_id.clone())
            .or_default()
            .push(document.id.clone());
        items.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    pub fn get(&self, id: &str) -> Result<Document> {
        self.items
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("document not found: {id}")))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.items.lock().contains_key(id)
    }

    pub fn list_by_library(&self, library_id: &str) -> Vec<Document> {
        let items = self.items.lock();
        self.by_library
            .lock()
            .get(library_id)
            .map(|ids| ids.iter().filter_map(|id| items.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn update(&self, document: Document) -> Result<Document> {
        let mut items = self.items.lock();
        if !items.contains_key(&document.id) {
            return Err(Error::not_found(format!("document not found: {}", document.id)));
        }
        items.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    pub fn delete(&self, id: &str) -> Result<Document> {
        let mut items = self.items.lock();
        let doc = items
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("document not found: {id}")))?;
        if let Some(ids) = self.by_library.lock().get_mut(&doc.library_id) {
            ids.retain(|x| x != id);
        }
        Ok(doc)
    }

    /// Remove every document belonging to `library_id`, returning their ids.
    pub fn delete_by_library(&self, library_id: &str) -> Vec<String> {
        let ids = self.by_library.lock().remove(library_id).unwrap_or_default();
        let mut items = self.items.lock();
        for id in &ids {
            items.remove(id);
        }
        ids
    }

    pub fn replace_all(&self, documents: Vec<Document>) {
        let mut by_library: HashMap<String, Vec<String>> = HashMap::new();
        for d in &documents {
            by_library.entry(d.library_id.clone()).or_default().push(d.id.clone());
        }
        *self.items.lock() = documents.into_iter().map(|d| (d.id.clone(), d)).collect();
        *self.by_library.lock() = by_library;
    }
}

pub struct ChunkRepository {
    items: Mutex<HashMap<String, Chunk>>,
    by_library: Mutex<HashMap<String, Vec<String>>>,
    by_document: Mutex<HashMap<String, Vec<String>>>,
}

impl Default for ChunkRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkRepository {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            by_library: Mutex::new(HashMap::new()),
            by_document: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, chunk: Chunk) -> Result<Chunk> {
        let mut items = self.items.lock();
        if items.contains_key(&chunk.id) {
            return Err(Error::conflict("chunk id collision"));
        }
        self.by_library
            .lock()
            .entry(chunk.library_id.clone())
            .or_default()
            .push(chunk.id.clone());
        self.by_document
            .lock()
            .entry(chunk.document_id.clone())
            .or_default()
            .push(chunk.id.clone());
        items.insert(chunk.id.clone(), chunk.clone());
        Ok(chunk)
    }

    pub fn get(&self, id: &str) -> Result<Chunk> {
        self.items
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("chunk not found: {id}")))
    }

    pub fn list_by_library(&self, library_id: &str) -> Vec<Chunk> {
        let items = self.items.lock();
        self.by_library
            .lock()
            .get(library_id)
            .map(|ids| ids.iter().filter_map(|id| items.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn list_by_document(&self, document_id: &str) -> Vec<Chunk> {
        let items = self.items.lock();
        self.by_document
            .lock()
            .get(document_id)
            .map(|ids| ids.iter().filter_map(|id| items.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn update(&self, chunk: Chunk) -> Result<Chunk> {
        let mut items = self.items.lock();
        if !items.contains_key(&chunk.id) {
            return Err(Error::not_found(format!("chunk not found: {}", chunk.id)));
        }
        items.insert(chunk.id.clone(), chunk.clone());
        Ok(chunk)
    }

    pub fn delete(&self, id: &str) -> Result<Chunk> {
        let mut items = self.items.lock();
        let chunk = items
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("chunk not found: {id}")))?;
        if let Some(ids) = self.by_library.lock().get_mut(&chunk.library_id) {
            ids.retain(|x| x != id);
        }
        if let Some(ids) = self.by_document.lock().get_mut(&chunk.document_id) {
            ids.retain(|x| x != id);
        }
        Ok(chunk)
    }

    pub fn delete_by_library(&self, library_id: &str) -> Vec<String> {
        let ids = self.by_library.lock().remove(library_id).unwrap_or_default();
        let mut items = self.items.lock();
        let mut by_document = self.by_document.lock();
        for id in &ids {
            if let Some(chunk) = items.remove(id) {
                if let Some(doc_ids) = by_document.get_mut(&chunk.document_id) {
                    doc_ids.retain(|x| x != id);
                }
            }
        }
        ids
    }

    pub fn delete_by_document(&self, document_id: &str) -> Vec<String> {
        let ids = self.by_document.lock().remove(document_id).unwrap_or_default();
        let mut items = self.items.lock();
        let mut by_library = self.by_library.lock();
        for id in &ids {
            if let Some(chunk) = items.remove(id) {
                if let Some(lib_ids) = by_library.get_mut(&chunk.library_id) {
                    lib_ids.retain(|x| x != id);
                }
            }
        }
        ids
    }

    pub fn replace_all(&self, chunks: Vec<Chunk>) {
        let mut by_library: HashMap<String, Vec<String>> = HashMap::new();
        let mut by_document: HashMap<String, Vec<String>> = HashMap::new();
        for c in &chunks {
            by_library.entry(c.library_id.clone()).or_default().push(c.id.clone());
            by_document.entry(c.document_id.clone()).or_default().push(c.id.clone());
        }
        *self.items.lock() = chunks.into_iter().map(|c| (c.id.clone(), c)).collect();
        *self.by_library.lock() = by_library;
        *self.by_document.lock() = by_document;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use vdb_common::config::IndexType;

    fn lib() -> Library {
        Library::new("lib", None, 3, IndexType::BruteForce, 4096).unwrap()
    }

    #[test]
    fn library_create_get_delete_round_trip() {
        let repo = LibraryRepository::new();
        let l = repo.create(lib()).unwrap();
        assert_eq!(repo.get(&l.id).unwrap().id, l.id);
        repo.delete(&l.id).unwrap();
        assert!(repo.get(&l.id).is_err());
    }

    #[test]
    fn document_list_by_library_reflects_deletes() {
        let repo = DocumentRepository::new();
        let d1 = repo.create(Document::new("lib1", "doc1", None).unwrap()).unwrap();
        let _d2 = repo.create(Document::new("lib1", "doc2", None).unwrap()).unwrap();
        assert_eq!(repo.list_by_library("lib1").len(), 2);
        repo.delete(&d1.id).unwrap();
        assert_eq!(repo.list_by_library("lib1").len(), 1);
    }

    #[test]
    fn chunk_cascade_delete_by_library_clears_both_indexes() {
        let repo = ChunkRepository::new();
        let c1 = repo
            .create(Chunk::new("lib1", "doc1", "hello", vec![1.0], Metadata::default()).unwrap())
            .unwrap();
        let _c2 = repo
            .create(Chunk::new("lib1", "doc2", "world", vec![1.0], Metadata::default()).unwrap())
            .unwrap();
        assert_eq!(repo.list_by_library("lib1").len(), 2);
        let deleted = repo.delete_by_library("lib1");
        assert_eq!(deleted.len(), 2);
        assert!(repo.list_by_library("lib1").is_empty());
        assert!(repo.list_by_document("doc1").is_empty());
        assert!(repo.get(&c1.id).is_err());
    }

    #[test]
    fn chunk_delete_by_document_leaves_sibling_documents_intact() {
        let repo = ChunkRepository::new();
        repo.create(Chunk::new("lib1", "doc1", "a", vec![1.0], Metadata::default()).unwrap())
            .unwrap();
        repo.create(Chunk::new("lib1", "doc2", "b", vec![1.0], Metadata::default()).unwrap())
            .unwrap();
        repo.delete_by_document("doc1");
        assert_eq!(repo.list_by_library("lib1").len(), 1);
        assert_eq!(repo.list_by_document("doc2").len(), 1);
    }

    #[test]
    fn chunk_replace_all_rebuilds_both_secondary_indexes() {
        let repo = ChunkRepository::new();
        repo.create(Chunk::new("lib1", "doc1", "a", vec![1.0], Metadata::default()).unwrap())
            .unwrap();

        let incoming = vec![
            Chunk::new("lib2", "doc2", "b", vec![1.0], Metadata::default()).unwrap(),
            Chunk::new("lib2", "doc3", "c", vec![1.0], Metadata::default()).unwrap(),
        ];
        repo.replace_all(incoming);

        assert!(repo.list_by_library("lib1").is_empty());
        assert_eq!(repo.list_by_library("lib2").len(), 2);
        assert_eq!(repo.list_by_document("doc2").len(), 1);
    }
}
