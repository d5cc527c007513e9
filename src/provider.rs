//! Provider registry and display capability.
//!
//! A [`ProviderSpec`] describes one configured integration target: its
//! identifier, the endpoint triplet it exposes on the backend collaborator,
//! and an optional [`DisplayAdapter`] for interpreting its records. Specs
//! are immutable and defined at startup; the [`ProviderRegistry`] selects
//! them by identifier.
//!
//! Record rendering itself is out of scope for the core - the adapter only
//! turns one opaque record into a display line so a presentation layer does
//! not need provider-specific branching.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::loader::Record;

/// Capability for interpreting a provider's records for display.
///
/// Record shape is provider-specific and opaque to the loader; one adapter
/// per provider knows which fields matter.
pub trait DisplayAdapter: Send + Sync {
    /// Produce a one-line summary of a single record.
    fn summarize(&self, record: &Record) -> String;

    /// Message shown when a load returned no records.
    fn empty_message(&self) -> String {
        "No records found".to_string()
    }
}

/// Display adapter for Hubspot CRM contacts.
///
/// Hubspot contact records carry the contact's name in `name`, which for
/// most CRM exports is the email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubspotContactsAdapter;

impl DisplayAdapter for HubspotContactsAdapter {
    fn summarize(&self, record: &Record) -> String {
        match record.get("name").and_then(|v| v.as_str()) {
            Some(name) if name.contains('@') => name.to_string(),
            Some(name) => format!("{name} (Contact)"),
            None => "No Name".to_string(),
        }
    }

    fn empty_message(&self) -> String {
        "No contacts found".to_string()
    }
}

/// One configured third-party integration target.
///
/// Immutable after construction. The endpoint triplet is derived from the
/// provider's path slug, matching the backend's
/// `integrations/{slug}/{authorize,credentials,load}` scheme.
#[derive(Clone)]
pub struct ProviderSpec {
    id: String,
    slug: String,
    display: Option<Arc<dyn DisplayAdapter>>,
}

impl ProviderSpec {
    /// Create a spec for a provider.
    ///
    /// # Arguments
    ///
    /// * `id` - Provider identifier as surfaced to callers, e.g. "Hubspot"
    /// * `slug` - Endpoint path segment, e.g. "hubspot"
    #[must_use]
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            display: None,
        }
    }

    /// Attach a display adapter for this provider's records.
    #[must_use]
    pub fn with_display(mut self, adapter: Arc<dyn DisplayAdapter>) -> Self {
        self.display = Some(adapter);
        self
    }

    /// Provider identifier, e.g. "Hubspot".
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Endpoint path segment, e.g. "hubspot".
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Path of the authorize endpoint, relative to the backend base URL.
    #[must_use]
    pub fn authorize_path(&self) -> String {
        format!("integrations/{}/authorize", self.slug)
    }

    /// Path of the exchange endpoint.
    #[must_use]
    pub fn credentials_path(&self) -> String {
        format!("integrations/{}/credentials", self.slug)
    }

    /// Path of the load endpoint.
    #[must_use]
    pub fn load_path(&self) -> String {
        format!("integrations/{}/load", self.slug)
    }

    /// The display adapter, if one is configured.
    #[must_use]
    pub fn display(&self) -> Option<&Arc<dyn DisplayAdapter>> {
        self.display.as_ref()
    }
}

impl fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("display", &self.display.is_some())
            .finish()
    }
}

/// Registry mapping provider identifiers to their specs.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderSpec>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in providers.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            ProviderSpec::new("Hubspot", "hubspot")
                .with_display(Arc::new(HubspotContactsAdapter)),
        );
        registry.register(ProviderSpec::new("Notion", "notion"));
        registry.register(ProviderSpec::new("Airtable", "airtable"));
        registry
    }

    /// Register a provider, replacing any previous spec with the same id.
    pub fn register(&mut self, spec: ProviderSpec) {
        self.providers.insert(spec.id().to_string(), spec);
    }

    /// Look up a provider by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ProviderSpec> {
        self.providers.get(id)
    }

    /// Look up a provider, erroring when the identifier is unknown.
    pub fn require(&self, id: &str) -> Result<&ProviderSpec> {
        self.get(id)
            .ok_or_else(|| Error::UnknownProvider(id.to_string()))
    }

    /// All registered provider identifiers.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
