#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod config_entry;
pub mod discover;
pub mod resolved;
pub mod routes;

pub use self::{
    config_entry::{ConfigEntry, ConfigEntryKey, ConfigEntryKind, ConfigEntrySet},
    discover::{ConfigEntryPublisher, SecretStore, ServiceCatalog, ServiceLookup},
    resolved::{ResolvedRoute, ResolvedRouteBuilder},
};

pub const GATEWAY_CONTROLLER_NAME: &str = "api-gateway.mesh.io/gateway-controller";

/// Identifies a namespaced resource.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
