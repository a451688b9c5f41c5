use crate::{
    core::{
        ConfigEntryPublisher, ConfigEntrySet, ResourceId, SecretStore, ServiceCatalog,
        ServiceLookup,
    },
    k8s::{self, gateway as api, ObjectMeta},
    state::{BackendReference, ParentReference, RouteResource},
    status::{Status, Update},
    Config,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::mpsc;

mod reconcile;

/// An in-memory catalog. Services named `error-*` fail to resolve.
#[derive(Clone, Default)]
struct Catalog(Arc<BTreeMap<(String, String), ServiceLookup>>);

/// An in-memory secret store. Paths starting with `error/` fail to load.
#[derive(Clone, Default)]
struct Secrets(Arc<BTreeMap<String, BTreeMap<String, String>>>);

#[derive(Clone, Default)]
struct Publisher {
    published: Arc<Mutex<Vec<(ResourceId, ConfigEntrySet)>>>,
    fail: bool,
}

/// A catalog that never answers.
struct Stalled;

fn init_tracing() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

// === impl Catalog ===

impl Catalog {
    fn new(services: impl IntoIterator<Item = (&'static str, ServiceLookup)>) -> Self {
        Self(Arc::new(
            services
                .into_iter()
                .map(|(name, lookup)| (("default".to_string(), name.to_string()), lookup))
                .collect(),
        ))
    }
}

#[async_trait::async_trait]
impl ServiceCatalog for Catalog {
    async fn resolve_service(&self, name: &str, namespace: &str) -> anyhow::Result<ServiceLookup> {
        if name.starts_with("error-") {
            anyhow::bail!("catalog unavailable");
        }
        Ok(self
            .0
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
            .unwrap_or(ServiceLookup::NOT_FOUND))
    }
}

#[async_trait::async_trait]
impl ServiceCatalog for Stalled {
    async fn resolve_service(&self, _: &str, _: &str) -> anyhow::Result<ServiceLookup> {
        futures::future::pending().await
    }
}

// === impl Secrets ===

impl Secrets {
    fn new<I>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Vec<(&'static str, &'static str)>)>,
    {
        Self(Arc::new(
            secrets
                .into_iter()
                .map(|(path, fields)| {
                    let fields = fields
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    (path.to_string(), fields)
                })
                .collect(),
        ))
    }
}

#[async_trait::async_trait]
impl SecretStore for Secrets {
    async fn get_secret_fields(&self, path: &str) -> anyhow::Result<BTreeMap<String, String>> {
        if path.starts_with("error/") {
            anyhow::bail!("permission denied");
        }
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no secret at {path}"))
    }
}

// === impl Publisher ===

impl Publisher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn published(&self) -> Vec<(ResourceId, ConfigEntrySet)> {
        self.published.lock().clone()
    }
}

#[async_trait::async_trait]
impl ConfigEntryPublisher for Publisher {
    async fn publish(&self, gateway: &ResourceId, entries: &ConfigEntrySet) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("config store unavailable");
        }
        self.published
            .lock()
            .push((gateway.clone(), entries.clone()));
        Ok(())
    }
}

fn config() -> Config {
    Config::default()
}

fn mk_listener(name: &str, protocol: &str, port: i32) -> api::GatewayListeners {
    api::GatewayListeners {
        name: name.to_string(),
        port,
        protocol: protocol.to_string(),
        ..Default::default()
    }
}

fn mk_tls_listener(
    name: &str,
    port: i32,
    certificate: &str,
    options: Vec<(&str, &str)>,
) -> api::GatewayListeners {
    api::GatewayListeners {
        tls: Some(api::GatewayListenersTls {
            certificate_refs: Some(vec![api::GatewayListenersTlsCertificateRefs {
                group: Some(k8s::options::SECRET_STORE_GROUP.to_string()),
                kind: None,
                name: certificate.to_string(),
                namespace: None,
            }]),
            options: Some(
                options
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }),
        ..mk_listener(name, "HTTPS", port)
    }
}

fn mk_gateway(name: &str, listeners: Vec<api::GatewayListeners>) -> k8s::Gateway {
    k8s::Gateway {
        metadata: ObjectMeta {
            namespace: Some("default".to_string()),
            name: Some(name.to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec: api::GatewaySpec {
            gateway_class_name: "mesh".to_string(),
            listeners,
            ..Default::default()
        },
        status: None,
    }
}

fn parent(name: &str) -> ParentReference {
    ParentReference {
        name: name.to_string(),
        ..Default::default()
    }
}

fn backend(name: &str, weight: i32) -> BackendReference {
    BackendReference {
        name: name.to_string(),
        weight: Some(weight),
        ..Default::default()
    }
}

fn mk_http_route(name: &str, gateway: &str, rules: Vec<Vec<BackendReference>>) -> RouteResource {
    RouteResource::Http(k8s::HTTPRoute {
        metadata: ObjectMeta {
            namespace: Some("default".to_string()),
            name: Some(name.to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec: api::HTTPRouteSpec {
            parent_refs: Some(vec![parent(gateway).into()]),
            rules: Some(
                rules
                    .into_iter()
                    .map(|backends| api::HTTPRouteRules {
                        backend_refs: Some(backends.into_iter().map(Into::into).collect()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        },
        status: None,
    })
}

fn mk_tcp_route(name: &str, gateway: &str, backends: Vec<BackendReference>) -> RouteResource {
    RouteResource::Tcp(k8s::TCPRoute {
        metadata: ObjectMeta {
            namespace: Some("default".to_string()),
            name: Some(name.to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec: api::TCPRouteSpec {
            parent_refs: Some(vec![parent(gateway).into()]),
            rules: vec![api::TCPRouteRules {
                backend_refs: Some(backends.into_iter().map(Into::into).collect()),
                ..Default::default()
            }],
            ..Default::default()
        },
        status: None,
    })
}

/// Drains every update that has been sent so far.
fn take_updates(rx: &mut mpsc::UnboundedReceiver<Update>) -> Vec<Update> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

/// Writes updates back onto the resources, as the status controller would.
fn apply_updates(
    updates: Vec<Update>,
    gateway: &mut k8s::Gateway,
    routes: &mut [RouteResource],
) {
    for Update { id, status, .. } in updates {
        match status {
            Status::Gateway(status) => gateway.status = Some(status),
            Status::HttpRoute(status) | Status::TcpRoute(status) => {
                let route = routes
                    .iter_mut()
                    .find(|r| r.namespace() == id.namespace && r.name() == id.name)
                    .expect("update for unknown route");
                match route {
                    RouteResource::Http(route) => route.status = Some(status.into()),
                    RouteResource::Tcp(route) => route.status = Some(status.into()),
                }
            }
        }
    }
}
