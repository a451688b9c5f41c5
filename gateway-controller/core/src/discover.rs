//! Interfaces to the mesh's service catalog, secret store and config store.

use crate::{config_entry::ConfigEntrySet, ResourceId};
use std::collections::BTreeMap;

/// The outcome of looking up a service in the mesh catalog.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceLookup {
    /// The service is registered in the catalog.
    pub found: bool,

    /// The service has at least one instance with a mesh sidecar.
    pub proxy_enabled: bool,
}

#[async_trait::async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Looks up a service by name in a mesh namespace.
    ///
    /// Errors indicate the catalog could not be queried; a missing service is
    /// reported through [`ServiceLookup::found`].
    async fn resolve_service(&self, name: &str, namespace: &str) -> anyhow::Result<ServiceLookup>;
}

#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the fields stored at `path`, or an error if the path could not
    /// be read.
    async fn get_secret_fields(&self, path: &str) -> anyhow::Result<BTreeMap<String, String>>;
}

#[async_trait::async_trait]
pub trait ConfigEntryPublisher: Send + Sync {
    /// Replaces the config entries owned by `gateway` with `entries`.
    async fn publish(&self, gateway: &ResourceId, entries: &ConfigEntrySet) -> anyhow::Result<()>;
}

// === impl ServiceLookup ===

impl ServiceLookup {
    pub const NOT_FOUND: Self = Self {
        found: false,
        proxy_enabled: false,
    };

    pub const MESHED: Self = Self {
        found: true,
        proxy_enabled: true,
    };

    pub const UNMESHED: Self = Self {
        found: true,
        proxy_enabled: false,
    };
}

#[async_trait::async_trait]
impl<T: ServiceCatalog + ?Sized> ServiceCatalog for std::sync::Arc<T> {
    async fn resolve_service(&self, name: &str, namespace: &str) -> anyhow::Result<ServiceLookup> {
        (**self).resolve_service(name, namespace).await
    }
}

#[async_trait::async_trait]
impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    async fn get_secret_fields(&self, path: &str) -> anyhow::Result<BTreeMap<String, String>> {
        (**self).get_secret_fields(path).await
    }
}

#[async_trait::async_trait]
impl<T: ConfigEntryPublisher + ?Sized> ConfigEntryPublisher for std::sync::Arc<T> {
    async fn publish(&self, gateway: &ResourceId, entries: &ConfigEntrySet) -> anyhow::Result<()> {
        (**self).publish(gateway, entries).await
    }
}
