//! The canonical, reference-resolved form of a route.
//!
//! A [`ResolvedRoute`] is what the discovery-chain compiler consumes. It is
//! immutable once built and may only be constructed through
//! [`ResolvedRouteBuilder`], which enforces that every required field is set
//! and owns hostname defaulting.

use crate::routes::{Filter, HttpRouteMatch};
use std::collections::BTreeMap;

/// The hostname a route matches when it declares none.
pub const MATCH_ALL_HOSTNAME: &str = "*";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteKind {
    Http,
    Tcp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRoute {
    name: String,
    namespace: String,
    meta: BTreeMap<String, String>,
    hostnames: Vec<String>,
    payload: RoutePayload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutePayload {
    Http(Vec<HttpRouteRule>),
    Tcp(TcpService),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRouteRule {
    /// Empty when the rule matches every request.
    pub matches: Vec<HttpRouteMatch>,
    pub filters: Vec<Filter>,
    pub backends: Vec<WeightedService>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedService {
    pub name: String,
    pub namespace: String,
    pub weight: u32,
    pub filters: Vec<Filter>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpService {
    pub name: String,
    pub namespace: String,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedRouteBuilder {
    name: Option<String>,
    namespace: Option<String>,
    meta: BTreeMap<String, String>,
    hostnames: Vec<String>,
    payload: Option<RoutePayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("a route name is required")]
    MissingName,

    #[error("a route namespace is required")]
    MissingNamespace,

    #[error("route {0} has neither HTTP rules nor a TCP service")]
    MissingPayload(String),
}

// === impl ResolvedRoute ===

impl ResolvedRoute {
    pub fn builder() -> ResolvedRouteBuilder {
        ResolvedRouteBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    pub fn payload(&self) -> &RoutePayload {
        &self.payload
    }

    pub fn kind(&self) -> RouteKind {
        match self.payload {
            RoutePayload::Http(_) => RouteKind::Http,
            RoutePayload::Tcp(_) => RouteKind::Tcp,
        }
    }

    pub fn http_rules(&self) -> Option<&[HttpRouteRule]> {
        match &self.payload {
            RoutePayload::Http(rules) => Some(rules),
            RoutePayload::Tcp(_) => None,
        }
    }

    pub fn tcp_service(&self) -> Option<&TcpService> {
        match &self.payload {
            RoutePayload::Tcp(svc) => Some(svc),
            RoutePayload::Http(_) => None,
        }
    }

    pub fn matches_all_hosts(&self) -> bool {
        self.hostnames.iter().any(|h| h == MATCH_ALL_HOSTNAME)
    }
}

// === impl ResolvedRouteBuilder ===

impl ResolvedRouteBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets a metadata key. Later values replace earlier ones.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hostnames = hostnames.into_iter().map(Into::into).collect();
        self
    }

    pub fn http_rules(mut self, rules: Vec<HttpRouteRule>) -> Self {
        self.payload = Some(RoutePayload::Http(rules));
        self
    }

    pub fn tcp_service(mut self, service: TcpService) -> Self {
        self.payload = Some(RoutePayload::Tcp(service));
        self
    }

    pub fn build(self) -> Result<ResolvedRoute, BuildError> {
        let name = self.name.ok_or(BuildError::MissingName)?;
        let namespace = self.namespace.ok_or(BuildError::MissingNamespace)?;
        let payload = self
            .payload
            .ok_or_else(|| BuildError::MissingPayload(name.clone()))?;

        let mut hostnames = self.hostnames;
        if hostnames.is_empty() {
            hostnames.push(MATCH_ALL_HOSTNAME.to_string());
        }

        Ok(ResolvedRoute {
            name,
            namespace,
            meta: self.meta,
            hostnames,
            payload,
        })
    }
}
