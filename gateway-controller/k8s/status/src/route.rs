use crate::conditions::{self, condition, preserve_timestamps};
use chrono::{DateTime, Utc};
use gateway_controller_k8s_api as k8s;
use gateway_controller_k8s_state::{
    BindError, GatewayState, ParentBinding, ResolutionErrorKind, RouteParentStatus,
    RouteResource, RouteState, RouteStatus,
};

/// Expands a route's bind results into one status per parent reference,
/// stamped with the route's observed generation.
pub fn parent_statuses(
    state: &RouteState,
    controller_name: &str,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<RouteParentStatus> {
    let resolved_refs = resolved_refs(state, generation, now);
    state
        .parents
        .iter()
        .map(|(parent_ref, binding)| RouteParentStatus {
            parent_ref: parent_ref.clone(),
            controller_name: controller_name.to_string(),
            conditions: vec![accepted(binding, generation, now), resolved_refs.clone()],
        })
        .collect()
}

/// Computes a route's status after a pass over `gateway`.
///
/// Parent statuses written by other controllers, or for parents other than
/// `gateway`, are kept as they are. When the result is semantically equal to
/// the route's current status, the current status is returned verbatim.
pub fn route_status(
    route: &RouteResource,
    state: &RouteState,
    gateway: &GatewayState,
    controller_name: &str,
    now: DateTime<Utc>,
) -> RouteStatus {
    let route_ns = route.namespace();
    let previous = route.status();
    let prev_parents = previous
        .as_ref()
        .map(|s| s.parents.as_slice())
        .unwrap_or_default();

    let mut parents = prev_parents
        .iter()
        .filter(|p| {
            p.controller_name != controller_name || !gateway.is_parent(&p.parent_ref, &route_ns)
        })
        .cloned()
        .collect::<Vec<_>>();

    for mut status in parent_statuses(state, controller_name, route.generation(), now) {
        let prior = prev_parents.iter().find(|p| {
            p.controller_name == status.controller_name && p.parent_ref == status.parent_ref
        });
        if let Some(prior) = prior {
            preserve_timestamps(&mut status.conditions, &prior.conditions);
        }
        parents.push(status);
    }

    parents.sort_by(|a, b| {
        (&a.parent_ref, &a.controller_name).cmp(&(&b.parent_ref, &b.controller_name))
    });
    let status = RouteStatus { parents };

    match previous {
        Some(prev) if eq_time_insensitive(&prev, &status) => prev,
        _ => status,
    }
}

/// Compares route statuses, ignoring parent order and condition transition
/// times.
pub fn eq_time_insensitive(left: &RouteStatus, right: &RouteStatus) -> bool {
    left.parents.len() == right.parents.len()
        && left.parents.iter().all(|l| {
            right.parents.iter().any(|r| {
                l.parent_ref == r.parent_ref
                    && l.controller_name == r.controller_name
                    && conditions::eq_time_insensitive(&l.conditions, &r.conditions)
            })
        })
}

fn accepted(binding: &ParentBinding, generation: Option<i64>, now: DateTime<Utc>) -> k8s::Condition {
    match binding {
        ParentBinding::Bound { .. } => {
            condition(conditions::ACCEPTED, true, "Accepted", "", generation, now)
        }
        ParentBinding::NotBound(error) => {
            let reason = match error {
                BindError::NoMatchingParent => "NoMatchingParent",
                BindError::NotAllowedByListeners => "NotAllowedByListeners",
                BindError::NoMatchingListenerHostname => "NoMatchingListenerHostname",
                BindError::NoRoutableBackends => "NoRoutableBackends",
            };
            condition(
                conditions::ACCEPTED,
                false,
                reason,
                error.to_string(),
                generation,
                now,
            )
        }
    }
}

fn resolved_refs(state: &RouteState, generation: Option<i64>, now: DateTime<Utc>) -> k8s::Condition {
    if state.errors.is_empty() {
        return condition(
            conditions::RESOLVED_REFS,
            true,
            "ResolvedRefs",
            "",
            generation,
            now,
        );
    }

    let mut reasons = state.errors.iter().map(|e| reason(&e.kind));
    let first = reasons.next().unwrap_or("Errors");
    let reason = if reasons.all(|r| r == first) {
        first
    } else {
        "Errors"
    };
    let message = state
        .errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    condition(
        conditions::RESOLVED_REFS,
        false,
        reason,
        message,
        generation,
        now,
    )
}

fn reason(kind: &ResolutionErrorKind) -> &'static str {
    match kind {
        ResolutionErrorKind::ServiceNotFound => "ServiceNotFound",
        ResolutionErrorKind::NotConnectEnabled => "NotConnectEnabled",
        ResolutionErrorKind::UnsupportedKind(_) => "InvalidKind",
        ResolutionErrorKind::NoBackends => "NoBackends",
        ResolutionErrorKind::InvalidRule(_) => "InvalidRule",
        ResolutionErrorKind::Lookup(_) => "LookupFailed",
    }
}
