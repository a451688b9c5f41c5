use crate::{
    bind::ParentBinding,
    refs::{BackendReference, ParentReference, RouteStatus},
};
use gateway_controller_core::resolved::RouteKind;
use gateway_controller_k8s_api::{self as k8s, ResourceExt};
use std::collections::{btree_map, BTreeMap};

/// A route resource of any supported kind.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteResource {
    Http(k8s::HTTPRoute),
    Tcp(k8s::TCPRoute),
}

/// Identifies a route across kinds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId {
    pub kind: RouteKind,
    pub namespace: String,
    pub name: String,
}

/// The position of a rule within its route.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleIndex(pub usize);

/// The position of a backend reference within a route: its rule and its
/// offset within the rule's backend list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackendIndex {
    pub rule: RuleIndex,
    pub backend: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedReference {
    MeshService(MeshServiceReference),
}

/// A backend reference that resolved to a connect-enabled mesh service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshServiceReference {
    pub service: String,

    /// The mesh namespace the service is registered in.
    pub namespace: String,

    /// Locates the originating backend reference, through which its weight
    /// and filters are looked up.
    pub backend: BackendIndex,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionErrorKind {
    #[error("service not found")]
    ServiceNotFound,

    #[error("service is not connect enabled")]
    NotConnectEnabled,

    #[error("unsupported backend kind {0}")]
    UnsupportedKind(String),

    #[error("rule has no backends")]
    NoBackends,

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("{0}")]
    Lookup(String),
}

/// Describes why a backend reference, or a whole rule, could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionError {
    pub rule: RuleIndex,

    /// The offending backend's position within the rule, unless the error
    /// applies to the rule as a whole.
    pub backend: Option<usize>,

    /// The referenced service name, when the error concerns a backend.
    pub service: Option<String>,

    pub kind: ResolutionErrorKind,
}

/// Maps each routable rule to the references it resolved to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteRuleReferenceMap(BTreeMap<RuleIndex, Vec<ResolvedReference>>);

/// Accumulates resolution errors by rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionErrors(BTreeMap<RuleIndex, Vec<ResolutionError>>);

/// Everything learned about a route during one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteState {
    pub references: RouteRuleReferenceMap,
    pub errors: ResolutionErrors,

    /// Bind results for each parent reference that targets the gateway being
    /// reconciled.
    pub parents: BTreeMap<ParentReference, ParentBinding>,
}

// === impl RouteResource ===

impl RouteResource {
    pub fn kind(&self) -> RouteKind {
        match self {
            Self::Http(_) => RouteKind::Http,
            Self::Tcp(_) => RouteKind::Tcp,
        }
    }

    /// The resource kind, as named by the Gateway API.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Http(_) => "HTTPRoute",
            Self::Tcp(_) => "TCPRoute",
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Http(route) => route.name_unchecked(),
            Self::Tcp(route) => route.name_unchecked(),
        }
    }

    pub fn namespace(&self) -> String {
        match self {
            Self::Http(route) => route.namespace(),
            Self::Tcp(route) => route.namespace(),
        }
        .unwrap_or_default()
    }

    pub fn id(&self) -> RouteId {
        RouteId {
            kind: self.kind(),
            namespace: self.namespace(),
            name: self.name(),
        }
    }

    pub fn generation(&self) -> Option<i64> {
        match self {
            Self::Http(route) => route.metadata.generation,
            Self::Tcp(route) => route.metadata.generation,
        }
    }

    pub fn parent_refs(&self) -> Vec<ParentReference> {
        match self {
            Self::Http(route) => route
                .spec
                .parent_refs
                .iter()
                .flatten()
                .map(ParentReference::from)
                .collect(),
            Self::Tcp(route) => route
                .spec
                .parent_refs
                .iter()
                .flatten()
                .map(ParentReference::from)
                .collect(),
        }
    }

    /// TCP routes do not match on hostnames.
    pub fn hostnames(&self) -> &[String] {
        match self {
            Self::Http(route) => route.spec.hostnames.as_deref().unwrap_or_default(),
            Self::Tcp(_) => &[],
        }
    }

    pub fn status(&self) -> Option<RouteStatus> {
        match self {
            Self::Http(route) => route.status.as_ref().map(RouteStatus::from),
            Self::Tcp(route) => route.status.as_ref().map(RouteStatus::from),
        }
    }

    pub fn rule_count(&self) -> usize {
        match self {
            Self::Http(route) => route.spec.rules.as_ref().map_or(0, Vec::len),
            Self::Tcp(route) => route.spec.rules.len(),
        }
    }

    /// Returns the backend references declared by a rule, in order.
    pub fn backend_refs(&self, rule: RuleIndex) -> Vec<BackendReference> {
        match self {
            Self::Http(route) => route
                .spec
                .rules
                .iter()
                .flatten()
                .nth(rule.0)
                .and_then(|r| r.backend_refs.as_ref())
                .into_iter()
                .flatten()
                .map(BackendReference::from)
                .collect(),
            Self::Tcp(route) => route
                .spec
                .rules
                .get(rule.0)
                .and_then(|r| r.backend_refs.as_ref())
                .into_iter()
                .flatten()
                .map(BackendReference::from)
                .collect(),
        }
    }
}

impl From<k8s::HTTPRoute> for RouteResource {
    fn from(route: k8s::HTTPRoute) -> Self {
        Self::Http(route)
    }
}

impl From<k8s::TCPRoute> for RouteResource {
    fn from(route: k8s::TCPRoute) -> Self {
        Self::Tcp(route)
    }
}

// === impl RouteId ===

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            RouteKind::Http => "http",
            RouteKind::Tcp => "tcp",
        };
        write!(f, "{kind}/{}/{}", self.namespace, self.name)
    }
}

// === impl RuleIndex ===

impl std::fmt::Display for RuleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// === impl ResolvedReference ===

impl ResolvedReference {
    pub fn backend(&self) -> BackendIndex {
        match self {
            Self::MeshService(svc) => svc.backend,
        }
    }
}

// === impl ResolutionError ===

impl ResolutionError {
    pub fn for_backend(index: BackendIndex, service: &str, kind: ResolutionErrorKind) -> Self {
        Self {
            rule: index.rule,
            backend: Some(index.backend),
            service: Some(service.to_string()),
            kind,
        }
    }

    pub fn for_rule(rule: RuleIndex, kind: ResolutionErrorKind) -> Self {
        Self {
            rule,
            backend: None,
            service: None,
            kind,
        }
    }
}

impl std::fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.service.as_deref() {
            Some(service) => write!(f, "{service}: {}", self.kind),
            None => write!(f, "rule {}: {}", self.rule, self.kind),
        }
    }
}

impl std::error::Error for ResolutionError {}

// === impl RouteRuleReferenceMap ===

impl RouteRuleReferenceMap {
    pub fn insert(&mut self, rule: RuleIndex, refs: Vec<ResolvedReference>) {
        self.0.insert(rule, refs);
    }

    pub fn get(&self, rule: RuleIndex) -> Option<&[ResolvedReference]> {
        self.0.get(&rule).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, RuleIndex, Vec<ResolvedReference>> {
        self.0.iter()
    }

    /// Iterates over every resolved reference in rule order.
    pub fn references(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.0.values().flatten()
    }
}

// === impl ResolutionErrors ===

impl ResolutionErrors {
    pub fn add(&mut self, error: ResolutionError) {
        self.0.entry(error.rule).or_default().push(error);
    }

    pub fn get(&self, rule: RuleIndex) -> Option<&[ResolutionError]> {
        self.0.get(&rule).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of individual errors across all rules.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolutionError> {
        self.0.values().flatten()
    }

    /// Returns the first error caused by a failed catalog lookup rather than
    /// by the route itself.
    pub fn lookup_failure(&self) -> Option<&ResolutionError> {
        self.iter()
            .find(|e| matches!(e.kind, ResolutionErrorKind::Lookup(_)))
    }
}

// === impl RouteState ===

impl RouteState {
    /// Returns true if the rule resolved without errors.
    pub fn rule_is_routable(&self, rule: RuleIndex) -> bool {
        self.errors.get(rule).is_none() && self.references.get(rule).is_some()
    }
}
