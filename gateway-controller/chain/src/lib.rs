//! Compiles a gateway's attached routes into data-plane config entries.
//!
//! Every valid listener contributes an edge listener to the gateway's
//! `ingress-gateway` entry. HTTP routes become a `service-router` named
//! `{gateway}-{route-namespace}-{route-name}`, plus a `service-splitter` per
//! rule that spreads traffic over more than one backend. TCP routes bind their
//! service directly on the edge listener. Each backend service gets a
//! `service-defaults` entry carrying its protocol.
//!
//! Compilation is a pure function of the [`GatewayState`]: compiling the same
//! state twice produces identical sets.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod http;
mod ingress;
mod routes;
mod tcp;


use gateway_controller_core::{
    config_entry::{IngressGateway, IngressListener, IngressService},
    ConfigEntrySet,
};
use gateway_controller_k8s_state::{GatewayState, ListenerState, RouteId};
use std::collections::BTreeMap;

pub const META_GATEWAY_NAME: &str = "api-gateway.mesh.io/gateway-name";
pub const META_GATEWAY_NAMESPACE: &str = "api-gateway.mesh.io/gateway-namespace";

/// Compiles the routes bound to a gateway's listeners.
///
/// A gateway with admission errors compiles to an empty set. Otherwise,
/// invalid listeners are skipped and every other listener is compiled.
pub fn compile(gateway: &GatewayState) -> ConfigEntrySet {
    let mut entries = ConfigEntrySet::new();
    if gateway.has_admission_errors() {
        tracing::debug!(
            namespace = %gateway.id.namespace,
            name = %gateway.id.name,
            "Gateway has admission errors; not compiling",
        );
        return entries;
    }

    let mut listeners = Vec::new();
    for listener in &gateway.listeners {
        if !listener.is_valid() {
            tracing::debug!(
                namespace = %gateway.id.namespace,
                name = %gateway.id.name,
                listener = %listener.name,
                "Skipping invalid listener",
            );
            continue;
        }

        let (compiled, edge) = compile_listener(gateway, listener);
        for discarded in entries.merge(compiled) {
            tracing::warn!(
                namespace = %gateway.id.namespace,
                name = %gateway.id.name,
                listener = %listener.name,
                entry = %discarded.key(),
                "Conflicting config entries; keeping one",
            );
        }
        listeners.extend(edge);
    }

    if !listeners.is_empty() {
        entries.insert(IngressGateway {
            name: gateway.id.name.clone(),
            namespace: gateway.mesh_namespace.clone(),
            meta: BTreeMap::from([
                (META_GATEWAY_NAME.to_string(), gateway.id.name.clone()),
                (
                    META_GATEWAY_NAMESPACE.to_string(),
                    gateway.id.namespace.clone(),
                ),
            ]),
            listeners,
        });
    }

    entries
}

/// Names the router compiled for a route attached to `gateway`.
pub fn router_name(gateway: &GatewayState, route: &RouteId) -> String {
    format!("{}-{}-{}", gateway.id.name, route.namespace, route.name)
}

fn compile_listener(
    gateway: &GatewayState,
    listener: &ListenerState,
) -> (ConfigEntrySet, Option<IngressListener>) {
    let mut entries = ConfigEntrySet::new();
    let mut services = Vec::new();

    if listener.is_tcp() {
        // A valid TCP listener has at most one route.
        if let Some((bound, defaults)) = listener.routes.values().find_map(tcp::compile_route) {
            entries.insert(defaults);
            services.push(bound);
        }
    } else {
        for (id, route) in &listener.routes {
            let hosts = listener.hosts_for(route.hostnames());
            if hosts.is_empty() {
                continue;
            }
            let name = router_name(gateway, id);
            for discarded in entries.merge(http::compile_route(&name, route)) {
                tracing::warn!(
                    route = %id,
                    entry = %discarded.key(),
                    "Conflicting config entries; keeping one",
                );
            }
            services.push(IngressService {
                name,
                namespace: route.namespace().to_string(),
                hosts,
            });
        }
    }

    (entries, ingress::listener(listener, services))
}
