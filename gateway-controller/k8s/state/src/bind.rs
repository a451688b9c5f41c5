use crate::{
    gateway::GatewayState,
    listener::{AllowedNamespaces, ListenerState},
    refs::ParentReference,
    route::{RouteResource, RouteState},
};
use gateway_controller_core::ResolvedRoute;
use gateway_controller_k8s_api as k8s;

/// The outcome of attaching a route to the listeners selected by one of its
/// parent references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParentBinding {
    /// The route is attached to the named listeners.
    Bound { listeners: Vec<String> },
    NotBound(BindError),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("no listener matches the parent reference")]
    NoMatchingParent,

    #[error("route is not allowed by any matching listener")]
    NotAllowedByListeners,

    #[error("no listener hostname matches the route hostnames")]
    NoMatchingListenerHostname,

    #[error("route has no routable backends")]
    NoRoutableBackends,
}

// === impl ParentBinding ===

impl ParentBinding {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }
}

// === impl GatewayState ===

impl GatewayState {
    /// Checks whether a route's parent reference names this gateway.
    pub fn is_parent(&self, parent: &ParentReference, route_ns: &str) -> bool {
        parent.targets_kind::<k8s::Gateway>()
            && parent.name == self.id.name
            && parent.namespace_or(route_ns) == self.id.namespace
    }

    /// Attaches a converted route to every listener selected by its parent
    /// references, recording a bind result for each parent reference that
    /// names this gateway.
    ///
    /// A route without a converted form (because none of its backends
    /// resolved) is never attached. Returns true if the route was attached
    /// to at least one listener.
    pub fn bind_route(
        &mut self,
        route: &RouteResource,
        converted: Option<&ResolvedRoute>,
        state: &mut RouteState,
    ) -> bool {
        let route_ns = route.namespace();
        let route_id = route.id();
        let mut bound_any = false;

        for parent in route.parent_refs() {
            if !self.is_parent(&parent, &route_ns) {
                continue;
            }

            let binding = match self.select_listeners(&parent, route, &route_ns) {
                Err(error) => ParentBinding::NotBound(error),
                Ok(_) if converted.is_none() => {
                    ParentBinding::NotBound(BindError::NoRoutableBackends)
                }
                Ok(selected) => {
                    let mut listeners = Vec::with_capacity(selected.len());
                    for idx in selected {
                        let listener = &mut self.listeners[idx];
                        if let Some(resolved) = converted {
                            listener.routes.insert(route_id.clone(), resolved.clone());
                        }
                        listeners.push(listener.name.clone());
                    }
                    tracing::debug!(route = %route_id, ?listeners, "Bound route");
                    bound_any = true;
                    ParentBinding::Bound { listeners }
                }
            };
            state.parents.insert(parent, binding);
        }

        bound_any
    }

    /// Returns the indices of the listeners a parent reference selects.
    fn select_listeners(
        &self,
        parent: &ParentReference,
        route: &RouteResource,
        route_ns: &str,
    ) -> Result<Vec<usize>, BindError> {
        let candidates = self
            .listeners
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                parent.section_name.as_deref().map_or(true, |s| s == l.name)
                    && parent.port.map_or(true, |p| p == i32::from(l.port))
            })
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return Err(BindError::NoMatchingParent);
        }

        let allowed = candidates
            .into_iter()
            .filter(|(_, l)| l.accepts(route.kind()) && self.allows_namespace(l, route_ns))
            .collect::<Vec<_>>();
        if allowed.is_empty() {
            return Err(BindError::NotAllowedByListeners);
        }

        let hostnames = route.hostnames();
        let matched = allowed
            .into_iter()
            .filter(|(_, l)| l.matches_hostnames(hostnames))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if matched.is_empty() {
            return Err(BindError::NoMatchingListenerHostname);
        }

        Ok(matched)
    }

    fn allows_namespace(&self, listener: &ListenerState, route_ns: &str) -> bool {
        match listener.allowed_namespaces {
            AllowedNamespaces::All => true,
            AllowedNamespaces::Same => route_ns == self.id.namespace,
            AllowedNamespaces::Selector => false,
        }
    }
}
