use gateway_controller_core::{
    config_entry::{Defaults, IngressService},
    ResolvedRoute,
};

pub(crate) const PROTOCOL: &str = "tcp";

/// Binds a TCP route's service directly on the edge listener.
pub(crate) fn compile_route(route: &ResolvedRoute) -> Option<(IngressService, Defaults)> {
    let service = route.tcp_service()?;
    let bound = IngressService {
        name: service.name.clone(),
        namespace: service.namespace.clone(),
        hosts: vec![],
    };
    let defaults = Defaults {
        name: service.name.clone(),
        namespace: service.namespace.clone(),
        protocol: PROTOCOL.to_string(),
    };
    Some((bound, defaults))
}
