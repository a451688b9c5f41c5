use crate::{
    convert,
    mesh::MeshNamespaces,
    refs::BackendReference,
    route::{
        BackendIndex, MeshServiceReference, ResolutionError, ResolutionErrorKind,
        ResolvedReference, RouteResource, RouteState, RuleIndex,
    },
};
use gateway_controller_core::{ServiceCatalog, ServiceLookup};
use gateway_controller_k8s_api as k8s;

/// Resolves route backend references against the mesh catalog.
pub struct Resolver<'a, C: ?Sized> {
    catalog: &'a C,
    namespaces: &'a MeshNamespaces,
}

/// Checks that a service exists in the catalog and is connect-enabled.
pub async fn check_service<C>(
    catalog: &C,
    name: &str,
    namespace: &str,
) -> Result<(), ResolutionErrorKind>
where
    C: ServiceCatalog + ?Sized,
{
    match catalog.resolve_service(name, namespace).await {
        Ok(ServiceLookup { found: false, .. }) => Err(ResolutionErrorKind::ServiceNotFound),
        Ok(ServiceLookup {
            proxy_enabled: false,
            ..
        }) => Err(ResolutionErrorKind::NotConnectEnabled),
        Ok(_) => Ok(()),
        Err(error) => Err(ResolutionErrorKind::Lookup(error.to_string())),
    }
}

// === impl Resolver ===

impl<'a, C> Resolver<'a, C>
where
    C: ServiceCatalog + ?Sized,
{
    pub fn new(catalog: &'a C, namespaces: &'a MeshNamespaces) -> Self {
        Self {
            catalog,
            namespaces,
        }
    }

    /// Resolves every backend reference of every rule.
    ///
    /// A rule whose backends all resolve gets an entry in the returned
    /// reference map. Any other rule gets one or more resolution errors
    /// instead.
    pub async fn resolve(&self, route: &RouteResource) -> RouteState {
        let route_ns = route.namespace();
        let mut state = RouteState::default();

        for rule in (0..route.rule_count()).map(RuleIndex) {
            if let RouteResource::Http(http) = route {
                if let Err(error) = convert::http::check_rule(http, rule) {
                    tracing::debug!(route = %route.id(), %rule, %error, "Invalid rule");
                    state.errors.add(ResolutionError::for_rule(
                        rule,
                        ResolutionErrorKind::InvalidRule(error.to_string()),
                    ));
                    continue;
                }
            }

            let backends = route.backend_refs(rule);
            if backends.is_empty() {
                state.errors.add(ResolutionError::for_rule(
                    rule,
                    ResolutionErrorKind::NoBackends,
                ));
                continue;
            }

            let mut refs = Vec::with_capacity(backends.len());
            let mut failed = false;
            for (backend, backend_ref) in backends.into_iter().enumerate() {
                let index = BackendIndex { rule, backend };
                match self.resolve_backend(&backend_ref, &route_ns, index).await {
                    Ok(reference) => refs.push(reference),
                    Err(kind) => {
                        tracing::debug!(
                            route = %route.id(),
                            %rule,
                            service = %backend_ref.name,
                            error = %kind,
                            "Failed to resolve backend",
                        );
                        state.errors.add(ResolutionError::for_backend(
                            index,
                            &backend_ref.name,
                            kind,
                        ));
                        failed = true;
                    }
                }
            }

            if !failed {
                state.references.insert(rule, refs);
            }
        }

        state
    }

    async fn resolve_backend(
        &self,
        backend: &BackendReference,
        route_ns: &str,
        index: BackendIndex,
    ) -> Result<ResolvedReference, ResolutionErrorKind> {
        if !backend.targets_kind::<k8s::Service>() {
            return Err(ResolutionErrorKind::UnsupportedKind(format!(
                "{}/{}",
                backend.group.as_deref().unwrap_or("core"),
                backend.kind.as_deref().unwrap_or("Service"),
            )));
        }

        let namespace = self
            .namespaces
            .mesh_namespace(backend.namespace_or(route_ns));
        check_service(self.catalog, &backend.name, &namespace).await?;

        Ok(ResolvedReference::MeshService(MeshServiceReference {
            service: backend.name.clone(),
            namespace,
            backend: index,
        }))
    }
}
