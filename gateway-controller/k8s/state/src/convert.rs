//! Converts resolved routes into their canonical form.

use crate::route::{RouteResource, RouteState};
use gateway_controller_core::{resolved::BuildError, ResolvedRoute};

pub mod http;
pub mod tcp;

pub const META_ROUTE_KIND: &str = "api-gateway.mesh.io/route-kind";
pub const META_ROUTE_NAME: &str = "api-gateway.mesh.io/route-name";
pub const META_ROUTE_NAMESPACE: &str = "api-gateway.mesh.io/route-namespace";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("route has no routable rules")]
    NoRoutableRules,

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Converts a route into its canonical form.
///
/// The canonical route lives in the gateway's mesh namespace regardless of
/// where its backends are registered. Rules that failed to resolve are
/// omitted; a route left with no routable rules cannot be converted.
pub fn convert(
    route: &RouteResource,
    state: &RouteState,
    mesh_namespace: &str,
) -> Result<ResolvedRoute, ConvertError> {
    let builder = ResolvedRoute::builder()
        .name(route.name())
        .namespace(mesh_namespace)
        .meta(META_ROUTE_KIND, route.kind_name())
        .meta(META_ROUTE_NAME, route.name())
        .meta(META_ROUTE_NAMESPACE, route.namespace());

    let builder = match route {
        RouteResource::Http(http) => {
            let rules = http::rules(http, state);
            if rules.is_empty() {
                return Err(ConvertError::NoRoutableRules);
            }
            builder
                .hostnames(route.hostnames().iter().cloned())
                .http_rules(rules)
        }
        RouteResource::Tcp(_) => {
            let service = tcp::service(state).ok_or(ConvertError::NoRoutableRules)?;
            builder.tcp_service(service)
        }
    };

    Ok(builder.build()?)
}
