use crate::routes::{convert_header_modifiers, convert_match, convert_redirect};
use gateway_controller_core::{
    config_entry::{Defaults, Router, RouterDestination, RouterRoute, Split, Splitter},
    resolved::{HttpRouteRule, WeightedService},
    routes::HttpRouteMatch,
    ConfigEntrySet, ResolvedRoute,
};

pub(crate) const PROTOCOL: &str = "http";

/// Compiles an HTTP route into a router, the splitters it routes through and
/// defaults for every backend service.
///
/// The router is named `name`; each rule with more than one backend gets a
/// splitter named `{name}-{rule-index}`.
pub(crate) fn compile_route(name: &str, route: &ResolvedRoute) -> ConfigEntrySet {
    let mut entries = ConfigEntrySet::new();
    let namespace = route.namespace();
    let rules = route.http_rules().unwrap_or_default();

    let mut routes = Vec::new();
    for (idx, rule) in rules.iter().enumerate() {
        let destination = match rule.backends.as_slice() {
            [] => continue,
            [backend] => direct(rule, backend),
            backends => {
                let splitter = splitter(format!("{name}-{idx}"), namespace, route, backends);
                let destination = RouterDestination {
                    service: splitter.name.clone(),
                    namespace: namespace.to_string(),
                    request_headers: convert_header_modifiers(&rule.filters),
                    redirect: convert_redirect(&rule.filters),
                };
                entries.insert(splitter);
                destination
            }
        };

        for backend in &rule.backends {
            entries.insert(Defaults {
                name: backend.name.clone(),
                namespace: backend.namespace.clone(),
                protocol: PROTOCOL.to_string(),
            });
        }

        let matches = if rule.matches.is_empty() {
            vec![HttpRouteMatch::catch_all()]
        } else {
            rule.matches.clone()
        };
        routes.extend(matches.iter().map(|m| RouterRoute {
            route_match: convert_match(m),
            destination: destination.clone(),
        }));
    }

    entries.insert(Router {
        name: name.to_string(),
        namespace: namespace.to_string(),
        meta: route.meta().clone(),
        routes,
    });
    entries
}

/// Rule and backend filters both apply to a destination that targets its
/// service directly.
fn direct(rule: &HttpRouteRule, backend: &WeightedService) -> RouterDestination {
    let filters = rule.filters.iter().chain(&backend.filters);
    RouterDestination {
        service: backend.name.clone(),
        namespace: backend.namespace.clone(),
        request_headers: convert_header_modifiers(filters.clone()),
        redirect: convert_redirect(filters),
    }
}

fn splitter(
    name: String,
    namespace: &str,
    route: &ResolvedRoute,
    backends: &[WeightedService],
) -> Splitter {
    Splitter {
        name,
        namespace: namespace.to_string(),
        meta: route.meta().clone(),
        splits: backends
            .iter()
            .map(|backend| Split {
                weight: backend.weight,
                service: backend.name.clone(),
                namespace: backend.namespace.clone(),
                request_headers: convert_header_modifiers(&backend.filters),
            })
            .collect(),
    }
}
