use crate::{
    config::Config,
    core::{SecretStore, ServiceCatalog},
    state::{
        CertificateSource, GatewayState, ListenerConflict, ListenerError, ListenerState,
        ListenerStatus, MeshNamespaces, ResolutionErrors, Resolver, RouteResource, RouteState,
        TlsMode,
    },
    validation,
};
use ahash::AHashMap;

/// Checks gateways and routes against the constraints they must satisfy
/// before being compiled.
#[derive(Clone, Debug)]
pub struct Admission<C, S> {
    catalog: C,
    secrets: S,
    namespaces: MeshNamespaces,
    certificate_field: String,
    private_key_field: String,
}

#[async_trait::async_trait]
pub trait Validate<T> {
    type Rejection;

    async fn validate(&self, resource: &T) -> Result<(), Self::Rejection>;
}

/// One status per listener, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenerStatuses(pub Vec<ListenerStatus>);

// === impl Admission ===

impl<C, S> Admission<C, S> {
    pub fn new(catalog: C, secrets: S, config: &Config) -> Self {
        Self {
            catalog,
            secrets,
            namespaces: config.mesh_namespaces(),
            certificate_field: config.certificate_field.clone(),
            private_key_field: config.private_key_field.clone(),
        }
    }

    pub fn namespaces(&self) -> &MeshNamespaces {
        &self.namespaces
    }
}

impl<C, S> Admission<C, S>
where
    S: SecretStore,
{
    async fn validate_listener(&self, listener: &ListenerState) -> Vec<ListenerError> {
        let requires_tls = listener.protocol.requires_tls();
        let tls = match &listener.tls {
            Some(tls) => tls,
            None if requires_tls => return vec![ListenerError::NoCertificates],
            None => return vec![],
        };

        if requires_tls && tls.mode == TlsMode::Passthrough {
            return vec![ListenerError::PassthroughUnsupported];
        }

        // TLS parameters are checked wherever they are configured, but only
        // terminating listeners need certificates.
        let mut errors = validation::validate_tls_parameters(tls);
        if !requires_tls {
            return errors;
        }

        let mut resolvable = 0;
        for cert in &tls.certificates {
            match cert {
                CertificateSource::Unsupported { .. } => {
                    errors.push(ListenerError::UnsupportedCertificate(cert.to_string()));
                }
                CertificateSource::Secret { .. } => resolvable += 1,
                CertificateSource::Store { path } => {
                    let certificate_field = tls
                        .certificate_field
                        .as_deref()
                        .unwrap_or(&self.certificate_field);
                    let private_key_field = tls
                        .private_key_field
                        .as_deref()
                        .unwrap_or(&self.private_key_field);
                    match self
                        .check_store_certificate(path, [certificate_field, private_key_field])
                        .await
                    {
                        Ok(()) => resolvable += 1,
                        Err(error) => errors.push(error),
                    }
                }
            }
        }
        if resolvable == 0 && !errors.iter().any(ListenerError::is_certificate_error) {
            errors.push(ListenerError::NoCertificates);
        }

        errors
    }

    async fn check_store_certificate(
        &self,
        path: &str,
        fields: [&str; 2],
    ) -> Result<(), ListenerError> {
        let secret = self
            .secrets
            .get_secret_fields(path)
            .await
            .map_err(|error| ListenerError::SecretStore {
                path: path.to_string(),
                message: error.to_string(),
            })?;
        for field in fields {
            if secret.get(field).map_or(true, |v| v.is_empty()) {
                return Err(ListenerError::MissingSecretField {
                    path: path.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<C, S> Admission<C, S>
where
    C: ServiceCatalog,
{
    /// Checks a route's shape and resolves its backend references.
    ///
    /// A route with an invalid shape is not resolved at all; its state
    /// carries the shape error alone.
    pub(crate) async fn resolve_route(&self, route: &RouteResource) -> RouteState {
        if let Err(error) = validation::validate_route_shape(route) {
            let mut errors = ResolutionErrors::default();
            errors.add(error);
            return RouteState {
                errors,
                ..Default::default()
            };
        }

        Resolver::new(&self.catalog, &self.namespaces)
            .resolve(route)
            .await
    }
}

#[async_trait::async_trait]
impl<C, S> Validate<GatewayState> for Admission<C, S>
where
    C: ServiceCatalog,
    S: SecretStore,
{
    type Rejection = ListenerStatuses;

    /// Validates each listener's TLS configuration and checks listeners for
    /// name and port collisions. Every listener gets a status, even when only
    /// some of them are rejected.
    async fn validate(&self, gateway: &GatewayState) -> Result<(), ListenerStatuses> {
        let mut names = AHashMap::<&str, usize>::default();
        let mut ports = AHashMap::<u16, usize>::default();
        for listener in &gateway.listeners {
            *names.entry(listener.name.as_str()).or_default() += 1;
            *ports.entry(listener.port).or_default() += 1;
        }

        let mut statuses = Vec::with_capacity(gateway.listeners.len());
        for listener in &gateway.listeners {
            let mut status = ListenerStatus {
                errors: self.validate_listener(listener).await,
                conflicts: vec![],
            };
            if names.get(listener.name.as_str()).copied().unwrap_or_default() > 1 {
                status
                    .conflicts
                    .push(ListenerConflict::Name(listener.name.clone()));
            }
            if ports.get(&listener.port).copied().unwrap_or_default() > 1 {
                status.conflicts.push(ListenerConflict::Port(listener.port));
            }
            if !status.is_empty() {
                tracing::info!(
                    namespace = %gateway.id.namespace,
                    name = %gateway.id.name,
                    listener = %listener.name,
                    errors = ?status.errors,
                    conflicts = ?status.conflicts,
                    "Rejecting listener",
                );
            }
            statuses.push(status);
        }

        if statuses.iter().all(ListenerStatus::is_empty) {
            return Ok(());
        }
        Err(ListenerStatuses(statuses))
    }
}

#[async_trait::async_trait]
impl<C, S> Validate<RouteResource> for Admission<C, S>
where
    C: ServiceCatalog,
    S: SecretStore,
{
    type Rejection = ResolutionErrors;

    /// Looks up every backend service, collecting all violations.
    async fn validate(&self, route: &RouteResource) -> Result<(), ResolutionErrors> {
        let state = self.resolve_route(route).await;
        if state.errors.is_empty() {
            return Ok(());
        }
        tracing::info!(route = %route.id(), errors = state.errors.len(), "Rejecting route");
        Err(state.errors)
    }
}

// === impl ListenerStatuses ===

impl ListenerStatuses {
    /// Records each status on the matching listener.
    pub fn apply(self, gateway: &mut GatewayState) {
        for (listener, status) in gateway.listeners.iter_mut().zip(self.0) {
            listener.status = status;
        }
    }
}
