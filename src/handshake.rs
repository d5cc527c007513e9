//! Handshake state machine.
//!
//! A [`HandshakeSession`] drives one connect attempt through
//! `Idle → Connecting → Exchanging → Connected`, with `Failed` reachable
//! from `Connecting` or `Exchanging`. The sequence is strictly ordered:
//! authorize precedes popup-open, popup-open precedes the closure signal,
//! and the closure signal precedes the exchange call. Each step is an async
//! suspension point yielding back to the host loop.
//!
//! Sessions are single-use: `Connected` and `Failed` are terminal, and a
//! retry always starts a fresh session. Nothing guards against starting a
//! second session while one is mid-flight; that matches the observed
//! behavior this machine reimplements.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::backend::BackendClient;
use crate::credentials::{CredentialStore, IntegrationParams};
use crate::error::{Error, Result};
use crate::popup::{watch_closed, PopupHost};
use crate::provider::ProviderSpec;

/// Observable state of a handshake session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No connect attempt has been made yet.
    Idle,
    /// Authorize requested; the popup is (about to be) open.
    Connecting,
    /// The popup closed; exchanging the pending authorization.
    Exchanging,
    /// A credential was obtained and stored. Terminal.
    Connected,
    /// The attempt failed or did not complete. Terminal.
    Failed,
}

impl HandshakeState {
    /// Check whether the session has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

/// One connect attempt for one provider.
///
/// Created per attempt and driven once by [`connect`](Self::connect);
/// holds the provider spec, the owning identity, and the collaborators it
/// needs (backend client, popup host, credential store).
pub struct HandshakeSession {
    provider: ProviderSpec,
    user_id: String,
    org_id: String,
    backend: BackendClient,
    popup_host: Arc<dyn PopupHost>,
    store: CredentialStore,
    state: Arc<RwLock<HandshakeState>>,
}

impl HandshakeSession {
    /// Create a session in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `provider` - The integration target to connect
    /// * `user_id`, `org_id` - The identity the credential will belong to
    /// * `backend` - Client for the authorize/exchange endpoints
    /// * `popup_host` - Host environment that opens the authorization window
    /// * `store` - Store the credential is written to on success
    #[must_use]
    pub fn new(
        provider: ProviderSpec,
        user_id: impl Into<String>,
        org_id: impl Into<String>,
        backend: BackendClient,
        popup_host: Arc<dyn PopupHost>,
        store: CredentialStore,
    ) -> Self {
        Self {
            provider,
            user_id: user_id.into(),
            org_id: org_id.into(),
            backend,
            popup_host,
            store,
            state: Arc::new(RwLock::new(HandshakeState::Idle)),
        }
    }

    /// The provider this session connects.
    #[must_use]
    pub fn provider(&self) -> &ProviderSpec {
        &self.provider
    }

    /// Snapshot of the session state, for presentation layers deriving a
    /// connect control's idle/connecting/connected rendering.
    pub async fn state(&self) -> HandshakeState {
        *self.state.read().await
    }

    /// Drive the full handshake: authorize, open the popup, wait for it to
    /// close, exchange, and store the credential.
    ///
    /// Per attempt there is exactly one authorize call, at most one popup,
    /// and at most one exchange call. A failed authorize never opens a
    /// popup; a failed exchange never writes the store.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionConsumed`] if the session was already driven
    /// - [`Error::Authorize`] / [`Error::PopupBlocked`] from the connecting
    ///   phase
    /// - [`Error::Exchange`] / [`Error::EmptyCredential`] from the
    ///   exchanging phase; `EmptyCredential` is benign - nothing is stored
    ///   and a fresh session can retry immediately
    #[instrument(skip(self), fields(provider = self.provider.id()))]
    pub async fn connect(&self) -> Result<IntegrationParams> {
        {
            let mut state = self.state.write().await;
            if *state != HandshakeState::Idle {
                return Err(Error::SessionConsumed);
            }
            *state = HandshakeState::Connecting;
        }
        debug!(user_id = %self.user_id, org_id = %self.org_id, "handshake started");

        let auth_url = match self
            .backend
            .authorize(&self.provider, &self.user_id, &self.org_id)
            .await
        {
            Ok(url) => url,
            Err(err) => return Err(self.fail(err).await),
        };

        let handle = match self.popup_host.open(&auth_url).await {
            Ok(handle) => handle,
            Err(err) => return Err(self.fail(err).await),
        };
        debug!("authorization window opened");

        // The signal owns the sampling timer and cancels it on every exit
        // path, including this future being dropped mid-wait.
        let signal = watch_closed(handle, self.backend.config().poll_interval);
        signal.wait().await;

        // The window may have closed because authorization succeeded, was
        // denied, or was simply dismissed; those outcomes are not
        // distinguishable from here, so the exchange is always attempted
        // and an empty result means "did not complete".
        *self.state.write().await = HandshakeState::Exchanging;

        let credential = match self
            .backend
            .exchange(&self.provider, &self.user_id, &self.org_id)
            .await
        {
            Ok(credential) => credential,
            Err(err) => return Err(self.fail(err).await),
        };

        self.store.set(self.provider.id(), credential.clone()).await;
        *self.state.write().await = HandshakeState::Connected;
        info!("handshake complete");

        Ok(IntegrationParams {
            provider: self.provider.id().to_string(),
            credentials: credential,
        })
    }

    /// Move to `Failed` and hand the error back to the caller.
    async fn fail(&self, err: Error) -> Error {
        *self.state.write().await = HandshakeState::Failed;
        if err.is_benign() {
            debug!("handshake did not complete - no credential returned");
        } else {
            warn!(error = %err, "handshake failed");
        }
        err
    }
}

impl fmt::Debug for HandshakeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeSession")
            .field("provider", &self.provider.id())
            .field("user_id", &self.user_id)
            .field("org_id", &self.org_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::popup::ManualPopupHost;

    fn session() -> HandshakeSession {
        let base = "http://localhost:9".parse().unwrap();
        HandshakeSession::new(
            ProviderSpec::new("Hubspot", "hubspot"),
            "u1",
            "o1",
            BackendClient::new(GateConfig::new(base)),
            Arc::new(ManualPopupHost::new()),
            CredentialStore::new(),
        )
    }

    #[test]
    fn test_terminal_states() {
        assert!(HandshakeState::Connected.is_terminal());
        assert!(HandshakeState::Failed.is_terminal());

        assert!(!HandshakeState::Idle.is_terminal());
        assert!(!HandshakeState::Connecting.is_terminal());
        assert!(!HandshakeState::Exchanging.is_terminal());
    }

    #[tokio::test]
    async fn test_new_session_is_idle() {
        let session = session();
        assert_eq!(session.state().await, HandshakeState::Idle);
        assert_eq!(session.provider().id(), "Hubspot");
    }

    #[test]
    fn test_session_debug_names_provider() {
        // Sessions travel through spawn and error paths, so the Debug
        // rendering must work without exposing the collaborators.
        let rendered = format!("{:?}", session());
        assert!(rendered.contains("HandshakeSession"));
        assert!(rendered.contains("Hubspot"));
        assert!(rendered.contains("u1"));
    }
}
