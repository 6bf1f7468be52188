//! Resolvable location store
//!
//! Every location minted here is a scarce, explicitly-released resource.
//! The composer holds at most one composition's worth of handles at a time:
//! [`BlobStore::revoke_all`] drains the whole store before a new batch is
//! minted, regardless of whether the previous composition succeeded.

use std::collections::HashMap;

use uuid::Uuid;

/// URL scheme prefix for minted locations.
const BLOB_SCHEME: &str = "blob:siteloom/";

/// One minted payload: content bytes plus MIME type.
#[derive(Debug, Clone)]
pub struct Blob {
    pub content: Vec<u8>,
    pub mime: String,
}

/// In-memory store of resolvable locations.
///
/// Mirrors object-URL semantics: `create` mints an opaque URL for a payload,
/// `get` dereferences it, `revoke_all` invalidates every outstanding URL.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<String, Blob>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new location for the given payload.
    pub fn create(&mut self, content: Vec<u8>, mime: impl Into<String>) -> String {
        let url = format!("{}{}", BLOB_SCHEME, Uuid::new_v4());
        self.blobs.insert(
            url.clone(),
            Blob {
                content,
                mime: mime.into(),
            },
        );
        url
    }

    /// Dereference a location. Fails (None) once the location is revoked.
    pub fn get(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }

    /// Release every outstanding location.
    pub fn revoke_all(&mut self) {
        if !self.blobs.is_empty() {
            tracing::debug!(count = self.blobs.len(), "Revoking preview locations");
        }
        self.blobs.clear();
    }

    /// Number of outstanding locations.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let mut store = BlobStore::new();
        let url = store.create(b"body{}".to_vec(), "text/css");
        assert!(url.starts_with("blob:siteloom/"));

        let blob = store.get(&url).unwrap();
        assert_eq!(blob.content, b"body{}");
        assert_eq!(blob.mime, "text/css");
    }

    #[test]
    fn test_revoke_all_invalidates_locations() {
        let mut store = BlobStore::new();
        let url = store.create(b"x".to_vec(), "text/plain");
        assert!(store.get(&url).is_some());

        store.revoke_all();
        assert!(store.get(&url).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_locations_are_unique() {
        let mut store = BlobStore::new();
        let a = store.create(b"same".to_vec(), "text/plain");
        let b = store.create(b"same".to_vec(), "text/plain");
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
