//! Client-side gate for third-party OAuth integrations.
//!
//! Connecting an integration means driving a browser-style handshake
//! against a backend collaborator: request an authorization URL, open it in
//! a popup the user completes out-of-band, detect the popup closing by
//! sampling its closed flag, then exchange the pending authorization for a
//! credential. A granted credential unlocks loading the provider's records.
//!
//! [`IntegrationGate`] is the facade wiring the pieces together; the
//! underlying modules (provider registry, popup watcher, handshake session,
//! credential store, data loader) are public for hosts that need finer
//! control.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use integration_gate::{GateConfig, IntegrationGate, ManualPopupHost};
//!
//! # async fn run() -> integration_gate::Result<()> {
//! let config = GateConfig::new("http://localhost:8000".parse()?);
//! let gate = IntegrationGate::new(config, Arc::new(ManualPopupHost::new()));
//!
//! let params = gate.connect("Hubspot", "user-1", "org-1").await?;
//! println!("connected as {}", params.provider);
//!
//! let records = gate.load().await?;
//! println!("{} records", records.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handshake;
pub mod loader;
pub mod popup;
pub mod provider;

pub use backend::BackendClient;
pub use config::GateConfig;
pub use credentials::{CredentialObject, CredentialStore, IntegrationParams};
pub use error::{Error, Result};
pub use handshake::{HandshakeSession, HandshakeState};
pub use loader::{DataLoader, LoadedRecordSet, Record};
pub use popup::{ClosureSignal, ManualPopup, ManualPopupHost, PopupHandle, PopupHost, watch_closed};
pub use provider::{DisplayAdapter, HubspotContactsAdapter, ProviderRegistry, ProviderSpec};

use std::sync::Arc;

/// Facade wiring the registry, backend client, popup host, credential
/// store, and loader into one entry point.
///
/// Cheap to clone is not a goal here; hosts typically construct one gate
/// and share it behind their own state container.
pub struct IntegrationGate {
    registry: ProviderRegistry,
    backend: BackendClient,
    popup_host: Arc<dyn PopupHost>,
    store: CredentialStore,
    loader: DataLoader,
}

impl IntegrationGate {
    /// Create a gate with the built-in provider registry.
    #[must_use]
    pub fn new(config: GateConfig, popup_host: Arc<dyn PopupHost>) -> Self {
        Self::with_registry(config, popup_host, ProviderRegistry::with_builtin())
    }

    /// Create a gate with a custom provider registry.
    #[must_use]
    pub fn with_registry(
        config: GateConfig,
        popup_host: Arc<dyn PopupHost>,
        registry: ProviderRegistry,
    ) -> Self {
        let backend = BackendClient::new(config);
        let loader = DataLoader::new(backend.clone());
        Self {
            registry,
            backend,
            popup_host,
            store: CredentialStore::new(),
            loader,
        }
    }

    /// The configured provider registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The shared credential store.
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// The data loader holding the current loaded result.
    #[must_use]
    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    /// Start a handshake session for a provider.
    ///
    /// Sessions are single-use; create a fresh one per attempt.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownProvider`] when `provider_id` is not registered.
    pub fn session(
        &self,
        provider_id: &str,
        user_id: impl Into<String>,
        org_id: impl Into<String>,
    ) -> Result<HandshakeSession> {
        let provider = self.registry.require(provider_id)?.clone();
        Ok(HandshakeSession::new(
            provider,
            user_id,
            org_id,
            self.backend.clone(),
            Arc::clone(&self.popup_host),
            self.store.clone(),
        ))
    }

    /// Connect a provider end to end: one session, driven to completion.
    ///
    /// # Errors
    ///
    /// As [`HandshakeSession::connect`], plus [`Error::UnknownProvider`].
    pub async fn connect(
        &self,
        provider_id: &str,
        user_id: impl Into<String>,
        org_id: impl Into<String>,
    ) -> Result<IntegrationParams> {
        self.session(provider_id, user_id, org_id)?.connect().await
    }

    /// Load records for the connected provider.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] when no handshake has completed, otherwise as
    /// [`DataLoader::load`].
    pub async fn load(&self) -> Result<LoadedRecordSet> {
        self.loader.load_connected(&self.registry, &self.store).await
    }

    /// Drop the stored credential and the loaded result. Idempotent.
    pub async fn disconnect(&self) {
        self.store.clear().await;
        self.loader.clear().await;
    }
}
