//! The record-store collaborator boundary.
//!
//! The engine persists through [`RecordStore`] and never sees the transport.
//! Stores speak flat wire payloads ([`crate::payload::Payload`]); partial
//! updates merge into the stored object key-by-key, with `null` deleting a
//! key. [`MemoryStore`] is the in-process implementation used by tests and
//! the command-line tools.

use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

/// Opaque identifier of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors from a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent storage for clinical records.
pub trait RecordStore {
    /// Creates a record and returns its id.
    fn create(
        &self,
        payload: Payload,
    ) -> impl std::future::Future<Output = Result<RecordId, StoreError>>;

    /// Replaces the stored record wholesale.
    fn update(
        &self,
        id: RecordId,
        payload: Payload,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    /// Merges a partial payload into the stored record. A `null` value
    /// removes the key.
    fn patch(
        &self,
        id: RecordId,
        payload: Payload,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    /// Fetches the stored payload.
    fn fetch(
        &self,
        id: RecordId,
    ) -> impl std::future::Future<Output = Result<Payload, StoreError>>;
}

impl<S: RecordStore> RecordStore for &S {
    async fn create(&self, payload: Payload) -> Result<RecordId, StoreError> {
        (**self).create(payload).await
    }

    async fn update(&self, id: RecordId, payload: Payload) -> Result<(), StoreError> {
        (**self).update(id, payload).await
    }

    async fn patch(&self, id: RecordId, payload: Payload) -> Result<(), StoreError> {
        (**self).patch(id, payload).await
    }

    async fn fetch(&self, id: RecordId) -> Result<Payload, StoreError> {
        (**self).fetch(id).await
    }
}

/// In-memory store. Cheap to clone payloads in and out; a poisoned lock is
/// unreachable because no holder panics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<RecordId, Payload>>,
    fail_next: Mutex<Option<String>>,
    patch_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next store operation fail with `reason`. Test hook.
    pub fn fail_next(&self, reason: &str) {
        *self.fail_next.lock().unwrap() = Some(reason.to_owned());
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        match self.fail_next.lock().unwrap().take() {
            Some(reason) => Err(StoreError::Unavailable(reason)),
            None => Ok(()),
        }
    }

    /// Number of `patch` calls served so far. Test hook for asserting how
    /// many partial saves actually went out.
    pub fn patch_calls(&self) -> usize {
        *self.patch_calls.lock().unwrap()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    async fn create(&self, payload: Payload) -> Result<RecordId, StoreError> {
        self.take_failure()?;
        let id = RecordId::new();
        self.records.lock().unwrap().insert(id, payload);
        Ok(id)
    }

    async fn update(&self, id: RecordId, payload: Payload) -> Result<(), StoreError> {
        self.take_failure()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(stored) => {
                *stored = payload;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn patch(&self, id: RecordId, payload: Payload) -> Result<(), StoreError> {
        self.take_failure()?;
        *self.patch_calls.lock().unwrap() += 1;
        let mut records = self.records.lock().unwrap();
        let stored = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        for (key, value) in payload {
            if value == Value::Null {
                stored.remove(&key);
            } else {
                stored.insert(key, value);
            }
        }
        Ok(())
    }

    async fn fetch(&self, id: RecordId) -> Result<Payload, StoreError> {
        self.take_failure()?;
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(pairs: &[(&str, Value)]) -> Payload {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_fetch_update() {
        let store = MemoryStore::new();
        let id = store
            .create(payload(&[("gender", json!("FEMALE"))]))
            .await
            .unwrap();

        let stored = store.fetch(id).await.unwrap();
        assert_eq!(stored["gender"], json!("FEMALE"));

        store
            .update(id, payload(&[("gender", json!("MALE"))]))
            .await
            .unwrap();
        assert_eq!(store.fetch(id).await.unwrap()["gender"], json!("MALE"));
    }

    #[tokio::test]
    async fn test_patch_merges_and_null_deletes() {
        let store = MemoryStore::new();
        let id = store
            .create(payload(&[
                ("gender", json!("FEMALE")),
                ("height", json!(168.0)),
            ]))
            .await
            .unwrap();

        store
            .patch(
                id,
                payload(&[("weight", json!(61.0)), ("height", Value::Null)]),
            )
            .await
            .unwrap();

        let stored = store.fetch(id).await.unwrap();
        assert_eq!(stored["gender"], json!("FEMALE"));
        assert_eq!(stored["weight"], json!(61.0));
        assert!(!stored.contains_key("height"));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store.fetch(RecordId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next("network down");
        let err = store.create(Payload::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        // The failure is consumed; the retry succeeds.
        store.create(Payload::new()).await.unwrap();
    }
}
