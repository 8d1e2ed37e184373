//! Persistent store adapter.
//!
//! A store maps logical keys to opaque text blobs. The desk writes one blob
//! per collection (a JSON array of records) plus the session marker (a
//! single JSON user). Nothing is transactional across keys.

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DeskError, StoreError};

/// Key of the persisted logged-in user record.
pub const SESSION_KEY: &str = "quickdesk_user";

/// Backend for named blobs.
pub trait BlobStore {
    /// Read the blob stored under `key`, or `None` if it was never written.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob stored under `key`.
    fn save(&mut self, key: &str, blob: &str) -> Result<(), StoreError>;

    /// Delete the blob under `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        (**self).save(key, blob)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Parse a collection blob.
pub fn decode_records<T: DeserializeOwned>(key: &str, blob: &str) -> Result<Vec<T>, DeskError> {
    serde_json::from_str(blob).map_err(|source| DeskError::CorruptBlob {
        key: key.to_string(),
        source,
    })
}

/// Load and parse the collection under `key`; `None` when absent.
pub fn load_records<T: DeserializeOwned>(
    store: &impl BlobStore,
    key: &str,
) -> Result<Option<Vec<T>>, DeskError> {
    match store.load(key)? {
        Some(blob) => decode_records(key, &blob).map(Some),
        None => Ok(None),
    }
}

/// Serialize `records` and write them under `key`.
pub fn save_records<T: Serialize>(
    store: &mut impl BlobStore,
    key: &str,
    records: &[T],
) -> Result<(), DeskError> {
    let blob = serde_json::to_string(records).map_err(|source| DeskError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.save(key, &blob)?;
    tracing::debug!(key, records = records.len(), bytes = blob.len(), "saved collection");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn absent_key_loads_as_none() {
        let store = MemoryStore::new();
        let loaded: Option<Vec<serde_json::Value>> =
            load_records(&store, "quickdesk_tickets").expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_blob_is_reported_with_key() {
        let mut store = MemoryStore::new();
        store
            .save("quickdesk_tickets", "{not json")
            .expect("save");
        let err = load_records::<serde_json::Value>(&store, "quickdesk_tickets")
            .expect_err("corrupt blob");
        assert_eq!(err.error_code(), ErrorCode::CorruptCollection);
        assert!(err.to_string().contains("quickdesk_tickets"));
    }

    #[test]
    fn records_round_trip_through_store() {
        let mut store = MemoryStore::new();
        save_records(&mut store, "k", &["a".to_string(), "b".to_string()]).expect("save");
        let loaded: Vec<String> = load_records(&store, "k").expect("load").expect("present");
        assert_eq!(loaded, vec!["a", "b"]);
    }
}
