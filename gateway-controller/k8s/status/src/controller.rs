use gateway_controller_core::{resolved::RouteKind, ResourceId};
use gateway_controller_k8s_api::gateway::GatewayStatus;
use gateway_controller_k8s_state::{RouteId, RouteStatus};
use tokio::sync::mpsc::UnboundedReceiver;

/// A status to be persisted against a resource.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub id: ResourceId,

    /// The resource generation the status was computed for.
    pub generation: Option<i64>,

    pub status: Status,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    Gateway(GatewayStatus),
    HttpRoute(RouteStatus),
    TcpRoute(RouteStatus),
}

/// Persists statuses against their resources.
#[async_trait::async_trait]
pub trait StatusWriter: Send + Sync {
    async fn write_gateway_status(
        &self,
        id: &ResourceId,
        generation: Option<i64>,
        status: &GatewayStatus,
    ) -> anyhow::Result<()>;

    async fn write_route_status(
        &self,
        id: &RouteId,
        generation: Option<i64>,
        status: &RouteStatus,
    ) -> anyhow::Result<()>;
}

/// Drains status updates into a [`StatusWriter`].
pub struct Controller<W> {
    writer: W,
    updates: UnboundedReceiver<Update>,
}

// === impl Update ===

impl Update {
    pub fn gateway(id: ResourceId, generation: Option<i64>, status: GatewayStatus) -> Self {
        Self {
            id,
            generation,
            status: Status::Gateway(status),
        }
    }

    pub fn route(route: &RouteId, generation: Option<i64>, status: RouteStatus) -> Self {
        let status = match route.kind {
            RouteKind::Http => Status::HttpRoute(status),
            RouteKind::Tcp => Status::TcpRoute(status),
        };
        Self {
            id: ResourceId::new(route.namespace.clone(), route.name.clone()),
            generation,
            status,
        }
    }
}

// === impl Controller ===

impl<W: StatusWriter> Controller<W> {
    pub fn new(writer: W, updates: UnboundedReceiver<Update>) -> Self {
        Self { writer, updates }
    }

    pub async fn process_updates(mut self) {
        // Failed writes are not retried; the next pass recomputes and resends
        // any status that still differs.
        while let Some(Update {
            id,
            generation,
            status,
        }) = self.updates.recv().await
        {
            let (kind, result) = match &status {
                Status::Gateway(status) => (
                    "Gateway",
                    self.writer
                        .write_gateway_status(&id, generation, status)
                        .await,
                ),
                Status::HttpRoute(status) => (
                    "HTTPRoute",
                    self.write_route(RouteKind::Http, &id, generation, status)
                        .await,
                ),
                Status::TcpRoute(status) => (
                    "TCPRoute",
                    self.write_route(RouteKind::Tcp, &id, generation, status)
                        .await,
                ),
            };
            if let Err(error) = result {
                tracing::error!(namespace = %id.namespace, name = %id.name, %kind, %error, "Failed to write status");
            }
        }
    }

    async fn write_route(
        &self,
        kind: RouteKind,
        id: &ResourceId,
        generation: Option<i64>,
        status: &RouteStatus,
    ) -> anyhow::Result<()> {
        let route = RouteId {
            kind,
            namespace: id.namespace.clone(),
            name: id.name.clone(),
        };
        self.writer
            .write_route_status(&route, generation, status)
            .await
    }
}
