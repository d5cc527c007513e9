//! Data loading against a granted credential.
//!
//! The loader owns the current loaded result. A load replaces it wholesale
//! on success; a failed load leaves the previous result in place, so a
//! presentation layer keeps showing the last good data alongside the error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::backend::BackendClient;
use crate::credentials::{CredentialObject, CredentialStore};
use crate::error::{Error, Result};
use crate::provider::ProviderRegistry;

/// One opaque provider record. Shape is provider-specific; only a
/// provider's display adapter interprets it.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// An ordered set of records from one completed load.
///
/// Order is the backend's; the loader never sorts or filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadedRecordSet(Vec<Record>);

impl LoadedRecordSet {
    /// Number of records in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the load returned no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the records in backend order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    /// Borrow the records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.0
    }
}

impl From<Vec<Record>> for LoadedRecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a LoadedRecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Fetches provider records and holds the current result.
///
/// Clone-able handle over shared state; all clones observe the same result.
#[derive(Debug, Clone)]
pub struct DataLoader {
    backend: BackendClient,
    result: Arc<RwLock<Option<LoadedRecordSet>>>,
}

impl DataLoader {
    /// Create a loader with no result yet.
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            result: Arc::new(RwLock::new(None)),
        }
    }

    /// Load records for a provider using `credential`.
    ///
    /// On success the held result is replaced wholesale, even by an empty
    /// set. On failure the previous result stays untouched.
    ///
    /// # Errors
    ///
    /// [`Error::Load`] with the server's `detail`, or [`Error::Network`] on
    /// transport failure.
    #[instrument(skip(self, registry, credential))]
    pub async fn load(
        &self,
        registry: &ProviderRegistry,
        provider_id: &str,
        credential: &CredentialObject,
    ) -> Result<LoadedRecordSet> {
        let provider = registry.require(provider_id)?;
        match self.backend.load(provider, credential).await {
            Ok(records) => {
                let set = LoadedRecordSet::from(records);
                *self.result.write().await = Some(set.clone());
                debug!(count = set.len(), "result replaced");
                Ok(set)
            }
            Err(err) => {
                warn!(error = %err, "load failed, previous result kept");
                Err(err)
            }
        }
    }

    /// Load records for whichever provider the store is connected to.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] when the store holds no credential, otherwise
    /// as [`load`](Self::load).
    pub async fn load_connected(
        &self,
        registry: &ProviderRegistry,
        store: &CredentialStore,
    ) -> Result<LoadedRecordSet> {
        let params = store.get().await.ok_or(Error::NotConnected)?;
        self.load(registry, &params.provider, &params.credentials)
            .await
    }

    /// Snapshot of the current result, if any load has succeeded.
    pub async fn records(&self) -> Option<LoadedRecordSet> {
        self.result.read().await.clone()
    }

    /// Discard the held result. Idempotent; does not touch the store.
    pub async fn clear(&self) {
        *self.result.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use serde_json::json;
    use url::Url;

    fn loader() -> DataLoader {
        let base = Url::parse("http://localhost:9").unwrap();
        DataLoader::new(BackendClient::new(GateConfig::new(base)))
    }

    fn record(raw: serde_json::Value) -> Record {
        match raw {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_record_set_preserves_order() {
        let set = LoadedRecordSet::from(vec![
            record(json!({"id": 2})),
            record(json!({"id": 1})),
        ]);

        assert_eq!(set.len(), 2);
        let ids: Vec<_> = set.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_empty_record_set() {
        let set = LoadedRecordSet::default();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn test_new_loader_has_no_result() {
        assert!(loader().records().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let loader = loader();
        loader.clear().await;
        assert!(loader.records().await.is_none());
        loader.clear().await;
        assert!(loader.records().await.is_none());
    }

    #[tokio::test]
    async fn test_load_connected_requires_credential() {
        let err = loader()
            .load_connected(&ProviderRegistry::with_builtin(), &CredentialStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_clone_shares_result() {
        let loader1 = loader();
        let loader2 = loader1.clone();

        *loader1.result.write().await = Some(LoadedRecordSet::from(vec![record(json!({"id": 1}))]));
        assert_eq!(loader2.records().await.unwrap().len(), 1);
    }
}
