use crate::listener::ListenerState;
use gateway_controller_core::ResourceId;
use gateway_controller_k8s_api::{self as k8s, ResourceExt};

/// The state of a gateway during a single reconcile pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayState {
    pub id: ResourceId,
    pub generation: Option<i64>,

    /// The mesh namespace the gateway's configuration is published to.
    pub mesh_namespace: String,

    pub pod_ready: bool,
    pub service_ready: bool,

    /// Externally reachable addresses assigned to the gateway deployment.
    pub addresses: Vec<String>,

    /// Set when publishing the compiled configuration failed.
    pub sync_error: Option<String>,

    /// One entry per declared listener, in declaration order.
    pub listeners: Vec<ListenerState>,
}

impl GatewayState {
    pub fn initial(gateway: &k8s::Gateway, mesh_namespace: impl Into<String>) -> Self {
        let namespace = gateway.namespace().unwrap_or_default();
        let listeners = gateway
            .spec
            .listeners
            .iter()
            .map(|l| ListenerState::from_listener(l, &namespace))
            .collect();
        Self {
            id: ResourceId::new(namespace, gateway.name_unchecked()),
            generation: gateway.metadata.generation,
            mesh_namespace: mesh_namespace.into(),
            pod_ready: false,
            service_ready: false,
            addresses: vec![],
            sync_error: None,
            listeners,
        }
    }

    pub fn listener(&self, name: &str) -> Option<&ListenerState> {
        self.listeners.iter().find(|l| l.name == name)
    }

    /// Returns true if every listener is valid.
    pub fn is_valid(&self) -> bool {
        self.listeners.iter().all(ListenerState::is_valid)
    }

    /// Returns true if any listener failed admission. Such a gateway is not
    /// compiled at all.
    pub fn has_admission_errors(&self) -> bool {
        self.listeners.iter().any(|l| !l.status.is_empty())
    }

    pub fn is_ready(&self) -> bool {
        self.pod_ready && self.service_ready
    }
}
