use crate::route::{ResolvedReference, RouteState};
use gateway_controller_core::resolved::TcpService;

/// Returns the service a TCP route forwards to.
///
/// Admission rejects TCP routes with more than one backend. Should more than
/// one be resolved anyway, the first in rule order is used.
pub fn service(state: &RouteState) -> Option<TcpService> {
    state
        .references
        .references()
        .next()
        .map(|ResolvedReference::MeshService(svc)| TcpService {
            name: svc.service.clone(),
            namespace: svc.namespace.clone(),
        })
}
