use super::*;
use crate::{
    core::{ConfigEntryKind, GATEWAY_CONTROLLER_NAME},
    k8s::Condition,
    state::ResolutionErrorKind,
    status::conditions,
    Deployment, Error, ReconcileMetrics, Reconciler,
};
use pretty_assertions::assert_eq;

struct Harness<C> {
    reconciler: Reconciler<C, Secrets, Publisher>,
    publisher: Publisher,
    metrics: ReconcileMetrics,
    updates: mpsc::UnboundedReceiver<Update>,
}

fn harness<C: ServiceCatalog>(catalog: C, publisher: Publisher) -> Harness<C> {
    init_tracing();
    let (tx, updates) = mpsc::unbounded_channel();
    let metrics = ReconcileMetrics::default();
    let reconciler = Reconciler::new(
        catalog,
        Secrets::default(),
        publisher.clone(),
        &config(),
        tx,
        metrics.clone(),
    );
    Harness {
        reconciler,
        publisher,
        metrics,
        updates,
    }
}

fn ready() -> Deployment {
    Deployment {
        pod_ready: true,
        service_ready: true,
        addresses: vec!["10.0.0.1".to_string()],
    }
}

fn meshed() -> Catalog {
    Catalog::new([("svc-a", ServiceLookup::MESHED), ("svc-b", ServiceLookup::MESHED)])
}

fn gateway_conditions(updates: &[Update]) -> Vec<Condition> {
    updates
        .iter()
        .find_map(|u| match &u.status {
            Status::Gateway(status) => status.conditions.clone(),
            _ => None,
        })
        .expect("gateway status must be sent")
}

fn find<'c>(conds: &'c [Condition], type_: &str) -> &'c Condition {
    conds
        .iter()
        .find(|c| c.type_ == type_)
        .unwrap_or_else(|| panic!("missing {type_} condition"))
}

#[tokio::test]
async fn publishes_routes_bound_to_the_gateway() {
    let mut h = harness(meshed(), Publisher::default());
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let routes = vec![mk_http_route("r1", "g1", vec![vec![backend("svc-a", 1)]])];

    let (signal, watch) = drain::channel();
    let outcome = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await
        .expect("reconcile must succeed");
    drop(signal);

    assert!(outcome.published);
    assert_eq!(outcome.entries.count(ConfigEntryKind::IngressGateway), 1);
    assert_eq!(outcome.entries.count(ConfigEntryKind::ServiceRouter), 1);
    assert_eq!(outcome.entries.count(ConfigEntryKind::ServiceSplitter), 0);
    assert_eq!(outcome.entries.count(ConfigEntryKind::ServiceDefaults), 1);
    assert_eq!(
        h.publisher.published(),
        vec![(ResourceId::new("default", "g1"), outcome.entries.clone())]
    );
    assert_eq!(h.metrics.passes("published"), 1);

    let updates = take_updates(&mut h.updates);
    assert_eq!(updates.len(), 2, "{updates:#?}");

    let gateway_conds = gateway_conditions(&updates);
    assert_eq!(find(&gateway_conds, conditions::READY).status, "True");
    assert_eq!(find(&gateway_conds, conditions::IN_SYNC).status, "True");

    let route_status = updates
        .iter()
        .find_map(|u| match &u.status {
            Status::HttpRoute(status) => Some(status.clone()),
            _ => None,
        })
        .expect("route status must be sent");
    assert_eq!(route_status.parents.len(), 1);
    let parent = &route_status.parents[0];
    assert_eq!(parent.controller_name, GATEWAY_CONTROLLER_NAME);
    assert_eq!(find(&parent.conditions, conditions::ACCEPTED).status, "True");
    assert_eq!(find(&parent.conditions, conditions::RESOLVED_REFS).status, "True");
}

#[tokio::test]
async fn unchanged_statuses_are_not_resent() {
    let mut h = harness(meshed(), Publisher::default());
    let mut gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let mut routes = vec![mk_http_route(
        "r1",
        "g1",
        vec![vec![backend("svc-a", 70), backend("svc-b", 30)]],
    )];

    let (signal, watch) = drain::channel();
    h.reconciler
        .reconcile(&gateway, &ready(), &routes, watch.clone())
        .await
        .expect("first pass must succeed");
    let updates = take_updates(&mut h.updates);
    assert_eq!(updates.len(), 2);
    apply_updates(updates, &mut gateway, &mut routes);

    let outcome = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await
        .expect("second pass must succeed");
    drop(signal);

    assert_eq!(outcome.entries.count(ConfigEntryKind::ServiceSplitter), 1);
    assert!(take_updates(&mut h.updates).is_empty());
    assert_eq!(h.metrics.passes("published"), 2);
    assert_eq!(h.metrics.status_updates("Gateway", "sent"), 1);
    assert_eq!(h.metrics.status_updates("Gateway", "skipped"), 1);
    assert_eq!(h.metrics.status_updates("HTTPRoute", "skipped"), 1);
    assert_eq!(h.publisher.published().len(), 2);
}

#[tokio::test]
async fn publish_failures_are_reported_on_the_gateway() {
    let mut h = harness(meshed(), Publisher::failing());
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let routes = vec![mk_http_route("r1", "g1", vec![vec![backend("svc-a", 1)]])];

    let (signal, watch) = drain::channel();
    let outcome = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await
        .expect("reconcile must succeed");
    drop(signal);

    assert!(!outcome.published);
    assert_eq!(
        outcome.state.sync_error.as_deref(),
        Some("config store unavailable")
    );
    assert_eq!(h.metrics.passes("publish_failed"), 1);

    let gateway_conds = gateway_conditions(&take_updates(&mut h.updates));
    let in_sync = find(&gateway_conds, conditions::IN_SYNC);
    assert_eq!(in_sync.status, "False");
    assert_eq!(in_sync.reason, "SyncError");
    assert_eq!(in_sync.message, "config store unavailable");
}

#[tokio::test]
async fn rejected_gateways_are_not_published() {
    let mut h = harness(meshed(), Publisher::default());
    let gateway = mk_gateway(
        "g1",
        vec![mk_listener("a", "HTTP", 8443), mk_listener("b", "HTTP", 8443)],
    );
    let routes = vec![mk_http_route("r1", "g1", vec![vec![backend("svc-a", 1)]])];

    let (signal, watch) = drain::channel();
    let outcome = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await
        .expect("reconcile must succeed");
    drop(signal);

    assert!(!outcome.published);
    assert!(outcome.entries.is_empty());
    assert!(h.publisher.published().is_empty());
    assert_eq!(h.metrics.passes("rejected"), 1);

    let gateway_conds = gateway_conditions(&take_updates(&mut h.updates));
    let ready = find(&gateway_conds, conditions::READY);
    assert_eq!(ready.status, "False");
    assert_eq!(ready.reason, "ListenersNotValid");
}

#[tokio::test]
async fn routes_for_other_gateways_are_ignored() {
    let mut h = harness(meshed(), Publisher::default());
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let routes = vec![mk_http_route("r2", "other", vec![vec![backend("svc-a", 1)]])];

    let (signal, watch) = drain::channel();
    let outcome = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await
        .expect("reconcile must succeed");
    drop(signal);

    assert!(outcome.published);
    assert!(outcome.entries.is_empty());

    let updates = take_updates(&mut h.updates);
    assert_eq!(updates.len(), 1);
    assert!(matches!(updates[0].status, Status::Gateway(_)));
}

#[tokio::test]
async fn unresolvable_routes_are_reported_but_not_bound() {
    let mut h = harness(meshed(), Publisher::default());
    let gateway = mk_gateway("g1", vec![mk_listener("tcp", "TCP", 5432)]);
    let routes = vec![mk_tcp_route(
        "t1",
        "g1",
        vec![backend("svc-a", 1), backend("svc-b", 1)],
    )];

    let (signal, watch) = drain::channel();
    let outcome = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await
        .expect("reconcile must succeed");
    drop(signal);

    assert!(outcome.entries.is_empty());

    let route_status = take_updates(&mut h.updates)
        .into_iter()
        .find_map(|u| match u.status {
            Status::TcpRoute(status) => Some(status),
            _ => None,
        })
        .expect("route status must be sent");
    let conds = &route_status.parents[0].conditions;
    assert_eq!(find(conds, conditions::ACCEPTED).status, "False");
    let resolved = find(conds, conditions::RESOLVED_REFS);
    assert_eq!(resolved.status, "False");
    assert_eq!(
        resolved.message,
        "rule 0: invalid rule: TCP routes must have exactly one backend, found 2"
    );
}

#[tokio::test]
async fn draining_cancels_the_pass() {
    let mut h = harness(Stalled, Publisher::default());
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let routes = vec![mk_http_route("r1", "g1", vec![vec![backend("svc-a", 1)]])];

    let (signal, watch) = drain::channel();
    let deployment = ready();
    let (result, _) = tokio::join!(
        h.reconciler.reconcile(&gateway, &deployment, &routes, watch),
        signal.drain(),
    );

    assert!(matches!(result, Err(Error::Cancelled)), "{result:?}");
    assert!(h.publisher.published().is_empty());
    assert!(take_updates(&mut h.updates).is_empty());
    assert_eq!(h.metrics.passes("cancelled"), 1);
}

#[tokio::test]
async fn already_drained_passes_do_nothing() {
    let mut h = harness(meshed(), Publisher::default());
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let routes = vec![mk_http_route("r1", "g1", vec![vec![backend("svc-a", 1)]])];

    let (signal, watch) = drain::channel();
    drop(signal);
    let result = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await;

    assert!(matches!(result, Err(Error::Cancelled)), "{result:?}");
    assert!(h.publisher.published().is_empty());
    assert!(take_updates(&mut h.updates).is_empty());
    assert_eq!(h.metrics.passes("cancelled"), 1);
}

#[tokio::test]
async fn catalog_failures_abort_the_pass() {
    let mut h = harness(meshed(), Publisher::default());
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);
    let routes = vec![
        mk_http_route("r1", "g1", vec![vec![backend("svc-a", 1)]]),
        mk_http_route("r2", "g1", vec![vec![backend("error-b", 1)]]),
    ];

    let (signal, watch) = drain::channel();
    let result = h
        .reconciler
        .reconcile(&gateway, &ready(), &routes, watch)
        .await;
    drop(signal);

    match result {
        Err(Error::Lookup { route, source }) => {
            assert_eq!(route.name, "r2");
            assert_eq!(
                source.kind,
                ResolutionErrorKind::Lookup("catalog unavailable".to_string())
            );
        }
        result => panic!("expected a lookup failure, got {result:?}"),
    }
    assert!(h.publisher.published().is_empty());
    assert!(take_updates(&mut h.updates).is_empty());
    assert_eq!(h.metrics.passes("lookup_failed"), 1);
    assert_eq!(h.metrics.passes("published"), 0);
}

#[tokio::test]
async fn closed_status_channel_fails_the_pass() {
    let h = harness(meshed(), Publisher::default());
    drop(h.updates);
    let gateway = mk_gateway("g1", vec![mk_listener("http", "HTTP", 9091)]);

    let (signal, watch) = drain::channel();
    let result = h
        .reconciler
        .reconcile(&gateway, &ready(), &[], watch)
        .await;
    drop(signal);

    assert!(matches!(result, Err(Error::StatusClosed)), "{result:?}");
}
