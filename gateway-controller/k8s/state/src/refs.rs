//! Kind-neutral views of the references and statuses that each route kind
//! declares with its own generated types.
//!
//! The generated types are neither ordered nor hashable, and HTTPRoutes and
//! TCPRoutes each carry their own copy of the same shapes. Binding and status
//! computation work on these normalized forms instead.

use gateway_controller_k8s_api::{self as k8s, gateway as api, Condition};

/// Identifies the API object, usually a Gateway, that a route wants to be
/// attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParentReference {
    pub group: Option<String>,
    pub kind: Option<String>,

    /// Defaults to the route's namespace.
    pub namespace: Option<String>,

    pub name: String,

    /// Names a listener on the target gateway.
    pub section_name: Option<String>,

    /// Selects listeners on the target gateway by port.
    pub port: Option<i32>,
}

/// References a backend object. The kind defaults to a core `Service`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendReference {
    pub group: Option<String>,
    pub kind: Option<String>,
    pub name: String,
    pub namespace: Option<String>,
    pub port: Option<i32>,
    pub weight: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteStatus {
    pub parents: Vec<RouteParentStatus>,
}

/// The conditions one controller reports for one of a route's parents.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteParentStatus {
    pub parent_ref: ParentReference,
    pub controller_name: String,
    pub conditions: Vec<Condition>,
}

// === impl ParentReference ===

impl ParentReference {
    /// Checks whether this reference targets the resource type `T`.
    ///
    /// References that omit a kind are assumed to target a Gateway.
    pub fn targets_kind<T>(&self) -> bool
    where
        T: k8s::Resource,
        T::DynamicType: Default,
    {
        k8s::targets_kind::<T>(
            Some(self.group.as_deref().unwrap_or(k8s::GATEWAY_API_GROUP)),
            self.kind.as_deref().unwrap_or("Gateway"),
        )
    }

    /// The referenced namespace, defaulting to the route's namespace.
    pub fn namespace_or<'a>(&'a self, route_ns: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(route_ns)
    }
}

macro_rules! parent_ref_conversions {
    ($($generated:ty),+ $(,)?) => {$(
        impl From<&$generated> for ParentReference {
            fn from(parent: &$generated) -> Self {
                Self {
                    group: parent.group.clone(),
                    kind: parent.kind.clone(),
                    namespace: parent.namespace.clone(),
                    name: parent.name.clone(),
                    section_name: parent.section_name.clone(),
                    port: parent.port,
                }
            }
        }

        impl From<ParentReference> for $generated {
            #[allow(clippy::needless_update)]
            fn from(parent: ParentReference) -> Self {
                Self {
                    group: parent.group,
                    kind: parent.kind,
                    namespace: parent.namespace,
                    name: parent.name,
                    section_name: parent.section_name,
                    port: parent.port,
                    ..Default::default()
                }
            }
        }
    )+};
}

parent_ref_conversions!(
    api::HTTPRouteParentRefs,
    api::HTTPRouteStatusParentsParentRef,
    api::TCPRouteParentRefs,
    api::TCPRouteStatusParentsParentRef,
);

// === impl BackendReference ===

impl BackendReference {
    pub const DEFAULT_WEIGHT: u32 = 1;

    pub fn targets_kind<T>(&self) -> bool
    where
        T: k8s::Resource,
        T::DynamicType: Default,
    {
        // Default kind is assumed to be service for backend ref objects
        k8s::targets_kind::<T>(
            self.group.as_deref(),
            self.kind.as_deref().unwrap_or("Service"),
        )
    }

    pub fn namespace_or<'a>(&'a self, route_ns: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(route_ns)
    }

    /// Negative weights are rejected by the API server; should one get
    /// through, the backend receives no traffic.
    pub fn weight(&self) -> u32 {
        self.weight
            .map_or(Self::DEFAULT_WEIGHT, |w| u32::try_from(w).unwrap_or(0))
    }
}

macro_rules! backend_ref_conversions {
    ($($generated:ty),+ $(,)?) => {$(
        impl From<&$generated> for BackendReference {
            fn from(backend: &$generated) -> Self {
                Self {
                    group: backend.group.clone(),
                    kind: backend.kind.clone(),
                    name: backend.name.clone(),
                    namespace: backend.namespace.clone(),
                    port: backend.port,
                    weight: backend.weight,
                }
            }
        }

        impl From<BackendReference> for $generated {
            #[allow(clippy::needless_update)]
            fn from(backend: BackendReference) -> Self {
                Self {
                    group: backend.group,
                    kind: backend.kind,
                    name: backend.name,
                    namespace: backend.namespace,
                    port: backend.port,
                    weight: backend.weight,
                    ..Default::default()
                }
            }
        }
    )+};
}

backend_ref_conversions!(api::HTTPRouteRulesBackendRefs, api::TCPRouteRulesBackendRefs);

// === impl RouteStatus ===

macro_rules! route_status_conversions {
    ($($status:ty => $parent:ident),+ $(,)?) => {$(
        impl From<&$status> for RouteStatus {
            fn from(status: &$status) -> Self {
                Self {
                    parents: status
                        .parents
                        .iter()
                        .map(|parent| RouteParentStatus {
                            parent_ref: ParentReference::from(&parent.parent_ref),
                            controller_name: parent.controller_name.clone(),
                            conditions: parent.conditions.clone().unwrap_or_default(),
                        })
                        .collect(),
                }
            }
        }

        impl From<RouteStatus> for $status {
            fn from(status: RouteStatus) -> Self {
                Self {
                    parents: status
                        .parents
                        .into_iter()
                        .map(|parent| api::$parent {
                            parent_ref: parent.parent_ref.into(),
                            controller_name: parent.controller_name,
                            conditions: Some(parent.conditions),
                        })
                        .collect(),
                }
            }
        }
    )+};
}

route_status_conversions!(
    api::HTTPRouteStatus => HTTPRouteStatusParents,
    api::TCPRouteStatus => TCPRouteStatusParents,
);

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_controller_k8s_api::{Gateway, Service};
    use pretty_assertions::assert_eq;

    #[test]
    fn parent_refs_default_to_gateways() {
        let parent = ParentReference {
            name: "gw".to_string(),
            ..Default::default()
        };
        assert!(parent.targets_kind::<Gateway>());
        assert_eq!(parent.namespace_or("default"), "default");

        let svc = ParentReference {
            group: Some("core".to_string()),
            kind: Some("Service".to_string()),
            name: "svc".to_string(),
            ..Default::default()
        };
        assert!(!svc.targets_kind::<Gateway>());
    }

    #[test]
    fn backend_refs_default_to_services() {
        let backend = BackendReference {
            name: "svc-a".to_string(),
            ..Default::default()
        };
        assert!(backend.targets_kind::<Service>());
        assert_eq!(backend.weight(), 1);
        assert_eq!(
            BackendReference {
                weight: Some(-3),
                ..backend
            }
            .weight(),
            0
        );
    }

    #[test]
    fn generated_backend_refs_keep_their_weight() {
        let backend: api::HTTPRouteRulesBackendRefs = serde_json::from_value(serde_json::json!({
            "name": "svc-a",
            "namespace": "other",
            "port": 8080,
            "weight": 70,
        }))
        .expect("backend ref must parse");
        let backend = BackendReference::from(&backend);
        assert_eq!(backend.name, "svc-a");
        assert_eq!(backend.namespace_or("default"), "other");
        assert_eq!(backend.port, Some(8080));
        assert_eq!(backend.weight(), 70);
    }

    #[test]
    fn route_statuses_survive_the_generated_form() {
        let status = RouteStatus {
            parents: vec![RouteParentStatus {
                parent_ref: ParentReference {
                    name: "gw".to_string(),
                    section_name: Some("http".to_string()),
                    ..Default::default()
                },
                controller_name: "mesh.io/gateway-controller".to_string(),
                conditions: vec![],
            }],
        };
        let http = api::HTTPRouteStatus::from(status.clone());
        assert_eq!(http.parents[0].parent_ref.section_name.as_deref(), Some("http"));
        assert_eq!(RouteStatus::from(&http), status);

        let tcp = api::TCPRouteStatus::from(status.clone());
        assert_eq!(RouteStatus::from(&tcp), status);
    }
}
