use crate::{
    admission::{Admission, Validate},
    chain,
    config::Config,
    core::{ConfigEntryPublisher, ConfigEntrySet, SecretStore, ServiceCatalog},
    k8s,
    metrics::{PassOutcome, ReconcileMetrics},
    state::{convert, GatewayState, ResolutionError, RouteId, RouteResource, RouteState},
    status::{self, Update},
    timeout::Timeout,
};
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info_span, Instrument};

/// Drives a reconcile pass for one gateway at a time.
///
/// A pass validates the gateway, resolves and binds the routes that target
/// it, compiles the result and publishes it. Statuses that changed are handed
/// to the status controller.
pub struct Reconciler<C, S, P> {
    admission: Admission<Timeout<C>, Timeout<S>>,
    publisher: P,
    controller_name: String,
    updates: UnboundedSender<Update>,
    metrics: ReconcileMetrics,
}

/// The observed state of a gateway's deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deployment {
    pub pod_ready: bool,
    pub service_ready: bool,
    pub addresses: Vec<String>,
}

#[derive(Debug)]
pub struct Outcome {
    pub state: GatewayState,

    /// The compiled entries. Empty when the gateway was rejected.
    pub entries: ConfigEntrySet,

    pub published: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reconcile pass cancelled")]
    Cancelled,

    /// The catalog could not be consulted about one of a route's backends.
    /// Publishing without the route would withdraw it from the data plane,
    /// so the pass stops instead.
    #[error("{route}: {source}")]
    Lookup {
        route: RouteId,
        #[source]
        source: ResolutionError,
    },

    #[error("status controller is no longer receiving updates")]
    StatusClosed,
}

struct Compiled<'r> {
    state: GatewayState,
    routes: Vec<(&'r RouteResource, RouteState)>,
    entries: ConfigEntrySet,
    rejected: bool,
}

// === impl Reconciler ===

impl<C, S, P> Reconciler<C, S, P>
where
    C: ServiceCatalog,
    S: SecretStore,
    P: ConfigEntryPublisher,
{
    pub fn new(
        catalog: C,
        secrets: S,
        publisher: P,
        config: &Config,
        updates: UnboundedSender<Update>,
        metrics: ReconcileMetrics,
    ) -> Self {
        let admission = Admission::new(
            Timeout::new(catalog, config.lookup_timeout),
            Timeout::new(secrets, config.lookup_timeout),
            config,
        );
        Self {
            admission,
            publisher,
            controller_name: config.controller_name.clone(),
            updates,
            metrics,
        }
    }

    /// Runs a single pass over `gateway` and the routes that may attach to
    /// it.
    ///
    /// When `drain` is signaled before compilation finishes, the pass stops
    /// with [`Error::Cancelled`] and nothing is published. A failed catalog
    /// lookup stops the pass the same way, with [`Error::Lookup`].
    pub async fn reconcile(
        &self,
        gateway: &k8s::Gateway,
        deployment: &Deployment,
        routes: &[RouteResource],
        drain: drain::Watch,
    ) -> Result<Outcome, Error> {
        let namespace = gateway.metadata.namespace.clone().unwrap_or_default();
        let name = gateway.metadata.name.clone().unwrap_or_default();
        let span = info_span!("reconcile", %namespace, %name);

        async move {
            let compile = self.compile(gateway, deployment, routes);
            tokio::pin!(compile);
            let compiled = tokio::select! {
                biased;
                _release = drain.signaled() => {
                    tracing::debug!("Reconcile pass cancelled");
                    self.metrics.pass(PassOutcome::Cancelled);
                    return Err(Error::Cancelled);
                }
                compiled = &mut compile => compiled,
            };
            let compiled = match compiled {
                Ok(compiled) => compiled,
                Err(error) => {
                    tracing::warn!(%error, "Reconcile pass aborted");
                    self.metrics.pass(PassOutcome::LookupFailed);
                    return Err(error);
                }
            };

            let Compiled {
                mut state,
                routes,
                entries,
                rejected,
            } = compiled;

            let published = if rejected {
                self.metrics.pass(PassOutcome::Rejected);
                false
            } else {
                self.publish(&mut state, &entries).await
            };

            self.send_statuses(gateway, &state, &routes)?;

            Ok(Outcome {
                state,
                entries,
                published,
            })
        }
        .instrument(span)
        .await
    }

    async fn compile<'r>(
        &self,
        gateway: &k8s::Gateway,
        deployment: &Deployment,
        routes: &'r [RouteResource],
    ) -> Result<Compiled<'r>, Error> {
        let namespaces = self.admission.namespaces();
        let gateway_ns = gateway.metadata.namespace.as_deref().unwrap_or_default();
        let mut state = GatewayState::initial(gateway, namespaces.mesh_namespace(gateway_ns));
        state.pod_ready = deployment.pod_ready;
        state.service_ready = deployment.service_ready;
        state.addresses = deployment.addresses.clone();

        let rejected = match self.admission.validate(&state).await {
            Ok(()) => false,
            Err(statuses) => {
                statuses.apply(&mut state);
                true
            }
        };

        let mut route_states = Vec::new();
        for route in routes {
            let route_ns = route.namespace();
            if !route
                .parent_refs()
                .iter()
                .any(|parent| state.is_parent(parent, &route_ns))
            {
                continue;
            }

            let mut route_state = self.admission.resolve_route(route).await;
            if let Some(error) = route_state.errors.lookup_failure() {
                return Err(Error::Lookup {
                    route: route.id(),
                    source: error.clone(),
                });
            }

            let converted = match convert::convert(route, &route_state, &state.mesh_namespace) {
                Ok(converted) => Some(converted),
                Err(error) => {
                    tracing::debug!(route = %route.id(), %error, "Route not converted");
                    None
                }
            };
            state.bind_route(route, converted.as_ref(), &mut route_state);
            route_states.push((route, route_state));
        }

        let entries = if rejected {
            ConfigEntrySet::new()
        } else {
            chain::compile(&state)
        };

        Ok(Compiled {
            state,
            routes: route_states,
            entries,
            rejected,
        })
    }

    /// Publishes the compiled entries, recording any failure on the gateway
    /// state.
    async fn publish(&self, state: &mut GatewayState, entries: &ConfigEntrySet) -> bool {
        match self.publisher.publish(&state.id, entries).await {
            Ok(()) => {
                tracing::debug!(entries = entries.len(), "Published config entries");
                self.metrics.pass(PassOutcome::Published);
                self.metrics.published(entries);
                true
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to publish config entries");
                self.metrics.pass(PassOutcome::PublishFailed);
                state.sync_error = Some(error.to_string());
                false
            }
        }
    }

    /// Sends the statuses that differ from those already on the resources.
    fn send_statuses(
        &self,
        gateway: &k8s::Gateway,
        state: &GatewayState,
        routes: &[(&RouteResource, RouteState)],
    ) -> Result<(), Error> {
        let now = Utc::now();

        let gateway_status = status::gateway_status(state, gateway, now);
        let changed = gateway.status.as_ref() != Some(&gateway_status);
        self.metrics.status_update("Gateway", changed);
        if changed {
            self.send(Update::gateway(
                state.id.clone(),
                state.generation,
                gateway_status,
            ))?;
        }

        for (route, route_state) in routes {
            let route_status =
                status::route_status(route, route_state, state, &self.controller_name, now);
            let changed = route.status().as_ref() != Some(&route_status);
            self.metrics.status_update(route.kind_name(), changed);
            if changed {
                self.send(Update::route(&route.id(), route.generation(), route_status))?;
            }
        }

        Ok(())
    }

    fn send(&self, update: Update) -> Result<(), Error> {
        self.updates.send(update).map_err(|_| Error::StatusClosed)
    }
}
