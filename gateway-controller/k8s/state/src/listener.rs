use crate::route::RouteId;
use gateway_controller_core::{
    resolved::{RouteKind, MATCH_ALL_HOSTNAME},
    ResolvedRoute,
};
use gateway_controller_k8s_api::{self as k8s, gateway as api, options};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerProtocol {
    Http,
    Https,
    Tcp,
    Tls,
    Unsupported(String),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TlsMode {
    #[default]
    Terminate,
    Passthrough,
}

/// The namespaces routes may attach from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AllowedNamespaces {
    All,
    #[default]
    Same,

    /// Label selectors are not evaluated, so a selector admits no routes.
    Selector,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteGroupKind {
    pub group: Option<String>,
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CertificateSource {
    /// A Kubernetes `Secret`.
    Secret { namespace: String, name: String },

    /// A path in the external secret store.
    Store { path: String },

    Unsupported {
        group: Option<String>,
        kind: Option<String>,
        name: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerTls {
    pub mode: TlsMode,
    pub min_version: Option<String>,
    pub max_version: Option<String>,
    pub cipher_suites: Vec<String>,
    pub certificates: Vec<CertificateSource>,

    /// Overrides of the secret-store field names holding the certificate
    /// chain and private key.
    pub certificate_field: Option<String>,
    pub private_key_field: Option<String>,
}

/// An admission error attributed to a listener.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    #[error("unsupported TLS version {0:?}")]
    InvalidTlsVersion(String),

    #[error("configuring TLS cipher suites is only supported for TLS 1.2 and earlier")]
    CipherSuitesUnsupported,

    #[error("unsupported TLS cipher suite {0:?}")]
    UnknownCipherSuite(String),

    #[error("TLS passthrough is not supported")]
    PassthroughUnsupported,

    #[error("no resolvable certificate references")]
    NoCertificates,

    #[error("unsupported certificate reference {0}")]
    UnsupportedCertificate(String),

    #[error("{path}: {message}")]
    SecretStore { path: String, message: String },

    #[error("{path}: missing or empty field {field:?}")]
    MissingSecretField { path: String, field: String },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ListenerConflict {
    #[error("listener name {0:?} conflicts with another listener")]
    Name(String),

    #[error("port {0} conflicts with another listener")]
    Port(u16),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenerStatus {
    pub errors: Vec<ListenerError>,
    pub conflicts: Vec<ListenerConflict>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerState {
    pub name: String,
    pub protocol: ListenerProtocol,
    pub port: u16,
    pub hostname: Option<String>,
    pub tls: Option<ListenerTls>,
    pub allowed_namespaces: AllowedNamespaces,

    /// Restricts the route kinds that may attach, when set.
    pub allowed_kinds: Option<Vec<RouteGroupKind>>,

    pub routes: BTreeMap<RouteId, ResolvedRoute>,
    pub status: ListenerStatus,
}

// === impl ListenerProtocol ===

impl ListenerProtocol {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("HTTP") {
            Self::Http
        } else if s.eq_ignore_ascii_case("HTTPS") {
            Self::Https
        } else if s.eq_ignore_ascii_case("TCP") {
            Self::Tcp
        } else if s.eq_ignore_ascii_case("TLS") {
            Self::Tls
        } else {
            Self::Unsupported(s.to_string())
        }
    }

    /// The route kind this protocol carries, if the protocol is supported.
    pub fn route_kind(&self) -> Option<RouteKind> {
        match self {
            Self::Http | Self::Https => Some(RouteKind::Http),
            Self::Tcp | Self::Tls => Some(RouteKind::Tcp),
            Self::Unsupported(_) => None,
        }
    }

    pub fn is_tcp(&self) -> bool {
        self.route_kind() == Some(RouteKind::Tcp)
    }

    /// HTTPS and TLS listeners terminate TLS and need certificates.
    pub fn requires_tls(&self) -> bool {
        matches!(self, Self::Https | Self::Tls)
    }
}

// === impl CertificateSource ===

impl CertificateSource {
    fn from_ref(cert: &api::GatewayListenersTlsCertificateRefs, default_ns: &str) -> Self {
        let group = cert.group.as_deref().unwrap_or_default();
        let kind = cert.kind.as_deref().unwrap_or("Secret");
        if group == options::SECRET_STORE_GROUP {
            return Self::Store {
                path: cert.name.clone(),
            };
        }
        if (group.is_empty() || group == "core") && kind == "Secret" {
            return Self::Secret {
                namespace: cert.namespace.clone().unwrap_or_else(|| default_ns.to_string()),
                name: cert.name.clone(),
            };
        }
        Self::Unsupported {
            group: cert.group.clone(),
            kind: cert.kind.clone(),
            name: cert.name.clone(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

impl std::fmt::Display for CertificateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secret { namespace, name } => write!(f, "k8s://{namespace}/{name}"),
            Self::Store { path } => write!(f, "store://{path}"),
            Self::Unsupported { group, kind, name } => write!(
                f,
                "{}/{}/{name}",
                group.as_deref().unwrap_or("core"),
                kind.as_deref().unwrap_or("Secret")
            ),
        }
    }
}

// === impl TlsMode ===

impl From<Option<&api::GatewayListenersTlsMode>> for TlsMode {
    fn from(mode: Option<&api::GatewayListenersTlsMode>) -> Self {
        match mode {
            Some(api::GatewayListenersTlsMode::Passthrough) => Self::Passthrough,
            Some(api::GatewayListenersTlsMode::Terminate) | None => Self::Terminate,
        }
    }
}

// === impl AllowedNamespaces ===

impl AllowedNamespaces {
    fn from_routes(allowed: &api::GatewayListenersAllowedRoutes) -> Self {
        use api::GatewayListenersAllowedRoutesNamespacesFrom as FromNamespaces;

        match allowed.namespaces.as_ref().and_then(|ns| ns.from.as_ref()) {
            Some(FromNamespaces::All) => Self::All,
            Some(FromNamespaces::Selector) => Self::Selector,
            Some(FromNamespaces::Same) | None => Self::Same,
        }
    }
}

// === impl RouteGroupKind ===

impl RouteGroupKind {
    pub fn of<T>() -> Self
    where
        T: k8s::Resource,
        T::DynamicType: Default,
    {
        let dt = Default::default();
        let group = T::group(&dt);
        Self {
            group: (!group.is_empty()).then(|| group.into_owned()),
            kind: T::kind(&dt).into_owned(),
        }
    }
}

impl From<&api::GatewayListenersAllowedRoutesKinds> for RouteGroupKind {
    fn from(kind: &api::GatewayListenersAllowedRoutesKinds) -> Self {
        Self {
            group: kind.group.clone(),
            kind: kind.kind.clone(),
        }
    }
}

// === impl ListenerTls ===

impl ListenerTls {
    fn from_config(tls: &api::GatewayListenersTls, default_ns: &str) -> Self {
        let option = |key: &str| {
            tls.options
                .as_ref()
                .and_then(|options| options.get(key))
                .cloned()
        };
        let cipher_suites = option(options::TLS_CIPHER_SUITES)
            .map(|suites| {
                suites
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            mode: TlsMode::from(tls.mode.as_ref()),
            min_version: option(options::TLS_MIN_VERSION),
            max_version: option(options::TLS_MAX_VERSION),
            cipher_suites,
            certificates: tls
                .certificate_refs
                .iter()
                .flatten()
                .map(|cert| CertificateSource::from_ref(cert, default_ns))
                .collect(),
            certificate_field: option(options::CERTIFICATE_FIELD),
            private_key_field: option(options::PRIVATE_KEY_FIELD),
        }
    }
}

// === impl ListenerError ===

impl ListenerError {
    /// Returns true if the error concerns the listener's certificate
    /// references rather than its TLS parameters.
    pub fn is_certificate_error(&self) -> bool {
        matches!(
            self,
            Self::NoCertificates
                | Self::UnsupportedCertificate(_)
                | Self::SecretStore { .. }
                | Self::MissingSecretField { .. }
        )
    }
}

// === impl ListenerStatus ===

impl ListenerStatus {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.conflicts.is_empty()
    }
}

// === impl ListenerState ===

impl ListenerState {
    pub(crate) fn from_listener(listener: &api::GatewayListeners, gateway_ns: &str) -> Self {
        let allowed = listener.allowed_routes.as_ref();
        Self {
            name: listener.name.clone(),
            protocol: ListenerProtocol::parse(&listener.protocol),
            // The API server bounds listener ports to 1-65535.
            port: u16::try_from(listener.port).unwrap_or_default(),
            hostname: listener.hostname.clone().filter(|h| !h.is_empty()),
            tls: listener
                .tls
                .as_ref()
                .map(|tls| ListenerTls::from_config(tls, gateway_ns)),
            allowed_namespaces: allowed
                .map(AllowedNamespaces::from_routes)
                .unwrap_or_default(),
            allowed_kinds: allowed
                .and_then(|a| a.kinds.as_ref())
                .map(|kinds| kinds.iter().map(RouteGroupKind::from).collect()),
            routes: BTreeMap::new(),
            status: ListenerStatus::default(),
        }
    }

    pub fn is_tcp(&self) -> bool {
        self.protocol.is_tcp()
    }

    /// A TCP listener may have at most one attached route.
    pub fn has_route_conflict(&self) -> bool {
        self.is_tcp() && self.routes.len() > 1
    }

    pub fn is_detached(&self) -> bool {
        matches!(self.protocol, ListenerProtocol::Unsupported(_))
    }

    /// Returns true if the listener can be compiled.
    pub fn is_valid(&self) -> bool {
        !self.has_route_conflict() && !self.is_detached() && self.status.is_empty()
    }

    /// Route kinds that may attach to this listener.
    pub fn supported_kinds(&self) -> Vec<RouteGroupKind> {
        let kind = match self.protocol.route_kind() {
            Some(RouteKind::Http) => RouteGroupKind::of::<k8s::HTTPRoute>(),
            Some(RouteKind::Tcp) => RouteGroupKind::of::<k8s::TCPRoute>(),
            None => return vec![],
        };
        match &self.allowed_kinds {
            Some(allowed) => allowed
                .iter()
                .filter(|k| {
                    k.kind == kind.kind
                        && k.group.as_deref().unwrap_or(k8s::GATEWAY_API_GROUP)
                            == kind.group.as_deref().unwrap_or_default()
                })
                .cloned()
                .collect(),
            None => vec![kind],
        }
    }

    pub fn accepts(&self, kind: RouteKind) -> bool {
        self.protocol.route_kind() == Some(kind) && !self.supported_kinds().is_empty()
    }

    /// Checks whether a route's hostnames intersect the listener hostname.
    ///
    /// Routes without hostnames and listeners without a hostname match any
    /// host.
    pub fn matches_hostnames(&self, hostnames: &[String]) -> bool {
        let listener = match self.hostname.as_deref() {
            Some(h) => h,
            None => return true,
        };
        hostnames.is_empty() || hostnames.iter().any(|h| hostnames_intersect(listener, h))
    }

    /// Narrows a route's hostnames to those this listener serves.
    ///
    /// A match-all or wildcard route hostname that covers the listener
    /// hostname is replaced by the listener hostname.
    pub fn hosts_for(&self, hostnames: &[String]) -> Vec<String> {
        let listener = match self.hostname.as_deref() {
            Some(h) => h,
            None => return hostnames.to_vec(),
        };
        let mut hosts = Vec::with_capacity(hostnames.len());
        for host in hostnames {
            let host = if host == MATCH_ALL_HOSTNAME || wildcard_matches(host, listener) {
                listener
            } else if hostnames_intersect(listener, host) {
                host.as_str()
            } else {
                continue;
            };
            if !hosts.iter().any(|h| h == host) {
                hosts.push(host.to_string());
            }
        }
        hosts
    }
}

pub(crate) fn hostnames_intersect(a: &str, b: &str) -> bool {
    a == b || wildcard_matches(a, b) || wildcard_matches(b, a)
}

fn wildcard_matches(wildcard: &str, host: &str) -> bool {
    match wildcard.strip_prefix('*') {
        Some(suffix) => host.len() > suffix.len() && host.ends_with(suffix),
        None => false,
    }
}
