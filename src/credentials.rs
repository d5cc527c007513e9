//! Credential model and store.
//!
//! The exchange step returns an opaque credential payload ([`CredentialObject`]);
//! a completed handshake pairs it with the provider tag as
//! [`IntegrationParams`] and writes it to the [`CredentialStore`].
//!
//! The store is the only mutable state shared between the handshake and the
//! data loader. It is explicit and injected - constructed by the host
//! application and handed to both sides - rather than ambient, so ownership
//! and update order stay testable in isolation. Writes are atomic wholesale
//! replacements; a reader either sees a complete `(provider, credential)`
//! pair or nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Opaque credential payload returned by the exchange step.
///
/// Contents are provider-specific (token type, access token, refresh token,
/// expiry, ...) and are never inspected by the core - only carried to the
/// load endpoint verbatim. Never mutated in place, only replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialObject(Value);

impl CredentialObject {
    /// Wrap a raw JSON payload.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Check whether this payload counts as "no credential".
    ///
    /// A null, empty-object, or empty-string payload means the handshake did
    /// not complete; the exchange step treats it as benign rather than as a
    /// hard error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrow the raw JSON payload.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw JSON payload.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for CredentialObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// The handshake's externally visible result: a provider tag paired with
/// its credential.
///
/// The pairing is structural - there is no way to observe a provider tag
/// without a credential or vice versa. Serializes with the provider tag as
/// `type`, matching the wire shape consumed by presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationParams {
    /// Provider identifier, e.g. "Hubspot".
    #[serde(rename = "type")]
    pub provider: String,
    /// The credential granted for that provider.
    pub credentials: CredentialObject,
}

/// Shared store holding the single current credential.
///
/// Clone-able handle over shared state, in the same shape as an in-memory
/// token storage: all clones observe the same contents. Written only by a
/// completed handshake, read by the data loader and by any presentation
/// layer that needs the derived connected status.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<IntegrationParams>>>,
}

impl CredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the stored credential atomically.
    ///
    /// No partial update is observable: readers see either the previous
    /// pair or the new one.
    #[instrument(skip_all)]
    pub async fn set(&self, provider: impl Into<String>, credential: CredentialObject) {
        let params = IntegrationParams {
            provider: provider.into(),
            credentials: credential,
        };
        let mut guard = self.inner.write().await;
        debug!(provider = %params.provider, "credential stored");
        *guard = Some(params);
    }

    /// Get a snapshot of the current integration params, if any.
    pub async fn get(&self) -> Option<IntegrationParams> {
        self.inner.read().await.clone()
    }

    /// Reset the store to empty. Idempotent.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }

    /// Derived connected status: `true` iff a credential is stored.
    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
