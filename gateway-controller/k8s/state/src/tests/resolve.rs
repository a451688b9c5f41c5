use super::*;
use gateway_controller_core::resolved::{RouteKind, RoutePayload};
use pretty_assertions::assert_eq;

fn catalog() -> Catalog {
    Catalog::default()
        .with("default", "svc-a", ServiceLookup::MESHED)
        .with("default", "svc-b", ServiceLookup::MESHED)
        .with("default", "plain", ServiceLookup::UNMESHED)
        .with("k8s-other", "svc-c", ServiceLookup::MESHED)
}

/// Every rule has exactly one of: resolved references, resolution errors.
fn assert_complementary(route: &RouteResource, state: &RouteState) {
    for rule in (0..route.rule_count()).map(RuleIndex) {
        let refs = state.references.get(rule).map_or(0, <[_]>::len);
        let errors = state.errors.get(rule).map_or(0, <[_]>::len);
        assert!(
            (refs > 0) != (errors > 0),
            "rule {rule} has {refs} references and {errors} errors"
        );
    }
}

#[tokio::test]
async fn resolves_meshed_services() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let route = mk_http_route(
        "default",
        "r",
        vec![parent("g1")],
        vec![vec![backend("svc-a", 70), backend("svc-b", 30)]],
    );

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    assert!(state.errors.is_empty());
    assert_eq!(
        state.references.get(RuleIndex(0)),
        Some(
            &[
                ResolvedReference::MeshService(MeshServiceReference {
                    service: "svc-a".to_string(),
                    namespace: "default".to_string(),
                    backend: BackendIndex {
                        rule: RuleIndex(0),
                        backend: 0
                    },
                }),
                ResolvedReference::MeshService(MeshServiceReference {
                    service: "svc-b".to_string(),
                    namespace: "default".to_string(),
                    backend: BackendIndex {
                        rule: RuleIndex(0),
                        backend: 1
                    },
                }),
            ][..]
        )
    );
    assert_complementary(&route, &state);
}

#[tokio::test]
async fn partial_failures_exclude_only_the_failing_rule() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let route = mk_http_route(
        "default",
        "r",
        vec![parent("g1")],
        vec![
            vec![backend("svc-a", 1)],
            vec![backend("svc-b", 1), backend("missing", 1), backend("plain", 1)],
            vec![],
        ],
    );

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    assert_complementary(&route, &state);

    assert!(state.rule_is_routable(RuleIndex(0)));
    assert!(!state.rule_is_routable(RuleIndex(1)));
    assert!(!state.rule_is_routable(RuleIndex(2)));

    let errors = state
        .errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(
        errors,
        vec![
            "missing: service not found",
            "plain: service is not connect enabled",
            "rule 2: rule has no backends",
        ]
    );
    assert_eq!(
        state.errors.get(RuleIndex(1)).map(|e| e[0].backend),
        Some(Some(1))
    );
}

#[tokio::test]
async fn catalog_errors_are_reported_verbatim() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let route = mk_http_route(
        "default",
        "r",
        vec![parent("g1")],
        vec![vec![backend("error-svc", 1)]],
    );

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    let error = state.errors.iter().next().expect("must fail");
    assert_eq!(
        error.kind,
        ResolutionErrorKind::Lookup("catalog unavailable".to_string())
    );
}

#[tokio::test]
async fn unsupported_backend_kinds_fail() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let mut unsupported = backend("svc-a", 1);
    unsupported.group = Some("example.com".to_string());
    unsupported.kind = Some("Bucket".to_string());
    let route = mk_http_route("default", "r", vec![parent("g1")], vec![vec![unsupported]]);

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    assert_eq!(
        state.errors.iter().map(|e| e.kind.clone()).collect::<Vec<_>>(),
        vec![ResolutionErrorKind::UnsupportedKind(
            "example.com/Bucket".to_string()
        )]
    );
    assert_complementary(&route, &state);
}

#[tokio::test]
async fn invalid_matches_fail_the_rule() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let mut route = mk_http_route("default", "r", vec![parent("g1")], vec![vec![backend("svc-a", 1)]]);
    if let RouteResource::Http(http) = &mut route {
        http.spec.rules.as_mut().unwrap()[0].matches = Some(vec![api::HTTPRouteRulesMatches {
            path: Some(api::HTTPRouteRulesMatchesPath {
                r#type: Some(api::HTTPRouteRulesMatchesPathType::Exact),
                value: Some("relative".to_string()),
            }),
            ..Default::default()
        }]);
    }

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    assert!(matches!(
        state.errors.iter().next().map(|e| &e.kind),
        Some(ResolutionErrorKind::InvalidRule(_))
    ));
    assert!(state.references.is_empty());
    assert_eq!(
        convert::convert(&route, &state, "default"),
        Err(ConvertError::NoRoutableRules)
    );
}

#[tokio::test]
async fn canonical_routes_keep_the_gateway_namespace() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::mirror("k8s-");
    let mut other = backend("svc-c", 1);
    other.namespace = Some("other".to_string());
    let route = mk_http_route("apps", "r", vec![parent("g1")], vec![vec![other]]);

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    assert!(state.errors.is_empty(), "{:?}", state.errors);

    let resolved = convert::convert(&route, &state, "k8s-gateways").expect("route must convert");
    assert_eq!(resolved.namespace(), "k8s-gateways");
    assert_eq!(resolved.hostnames(), &["*".to_string()]);
    assert_eq!(
        resolved.meta().get(convert::META_ROUTE_NAMESPACE).map(String::as_str),
        Some("apps")
    );

    let rules = resolved.http_rules().expect("http route");
    assert_eq!(rules[0].backends[0].name, "svc-c");
    assert_eq!(rules[0].backends[0].namespace, "k8s-other");
}

#[tokio::test]
async fn converts_weights_and_skips_failed_rules() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let route = mk_http_route(
        "default",
        "r",
        vec![parent("g1")],
        vec![
            vec![backend("missing", 1)],
            vec![backend("svc-a", 70), backend("svc-b", 30)],
        ],
    );

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    let resolved = convert::convert(&route, &state, "default").expect("route must convert");
    assert_eq!(resolved.kind(), RouteKind::Http);
    let RoutePayload::Http(rules) = resolved.payload() else {
        panic!("expected an HTTP payload");
    };
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0]
            .backends
            .iter()
            .map(|b| (b.name.as_str(), b.weight))
            .collect::<Vec<_>>(),
        vec![("svc-a", 70), ("svc-b", 30)]
    );
}

#[tokio::test]
async fn tcp_routes_convert_to_a_single_service() {
    let catalog = catalog();
    let namespaces = MeshNamespaces::default();
    let route = mk_tcp_route("default", "db", vec![parent("g1")], "svc-a");

    let state = Resolver::new(&catalog, &namespaces).resolve(&route).await;
    let resolved = convert::convert(&route, &state, "default").expect("route must convert");
    let svc = resolved.tcp_service().expect("tcp route");
    assert_eq!(svc.name, "svc-a");
    assert_eq!(svc.namespace, "default");

    let missing = mk_tcp_route("default", "db", vec![parent("g1")], "missing");
    let state = Resolver::new(&catalog, &namespaces).resolve(&missing).await;
    assert_eq!(
        convert::convert(&missing, &state, "default"),
        Err(ConvertError::NoRoutableRules)
    );
}
