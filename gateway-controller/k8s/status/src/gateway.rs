use crate::conditions::{self, condition, preserve_timestamps};
use chrono::{DateTime, Utc};
use gateway_controller_k8s_api::{self as k8s, gateway as api};
use gateway_controller_k8s_state::{GatewayState, ListenerConflict, ListenerProtocol, ListenerState};

/// Computes the externally visible status of a gateway.
///
/// When the computed status is semantically equal to the gateway's current
/// status, the current status is returned verbatim, so comparing the result
/// against `gateway.status` tells whether a write is needed.
pub fn gateway_status(
    state: &GatewayState,
    gateway: &k8s::Gateway,
    now: DateTime<Utc>,
) -> api::GatewayStatus {
    let previous = gateway.status.as_ref();
    let generation = state.generation;

    let mut gateway_conditions = vec![
        scheduled(state, generation, now),
        ready(state, generation, now),
        in_sync(state, generation, now),
    ];
    if let Some(prev) = previous.and_then(|s| s.conditions.as_deref()) {
        preserve_timestamps(&mut gateway_conditions, prev);
    }

    let listeners = state
        .listeners
        .iter()
        .map(|listener| {
            let mut status = listener_status(listener, generation, now);
            let prev = previous
                .and_then(|s| s.listeners.as_ref())
                .and_then(|ls| ls.iter().find(|l| l.name == listener.name));
            if let Some(prev) = prev {
                preserve_timestamps(&mut status.conditions, &prev.conditions);
            }
            status
        })
        .collect::<Vec<_>>();

    let addresses = state
        .addresses
        .iter()
        .map(|value| api::GatewayStatusAddresses {
            r#type: Some("IPAddress".to_string()),
            value: value.clone(),
        })
        .collect::<Vec<_>>();

    let status = api::GatewayStatus {
        addresses: (!addresses.is_empty()).then_some(addresses),
        conditions: Some(gateway_conditions),
        listeners: Some(listeners),
        ..Default::default()
    };

    match previous {
        Some(prev) if eq_time_insensitive(prev, &status) => prev.clone(),
        _ => status,
    }
}

/// Compares two gateway statuses, ignoring condition transition times.
pub fn eq_time_insensitive(left: &api::GatewayStatus, right: &api::GatewayStatus) -> bool {
    fn conds(c: &Option<Vec<k8s::Condition>>) -> &[k8s::Condition] {
        c.as_deref().unwrap_or_default()
    }

    let left_listeners = left.listeners.as_deref().unwrap_or_default();
    let right_listeners = right.listeners.as_deref().unwrap_or_default();

    left.addresses == right.addresses
        && conditions::eq_time_insensitive(conds(&left.conditions), conds(&right.conditions))
        && left_listeners.len() == right_listeners.len()
        && left_listeners.iter().zip(right_listeners).all(|(l, r)| {
            l.name == r.name
                && l.attached_routes == r.attached_routes
                && l.supported_kinds == r.supported_kinds
                && conditions::eq_time_insensitive(&l.conditions, &r.conditions)
        })
}

fn scheduled(state: &GatewayState, generation: Option<i64>, now: DateTime<Utc>) -> k8s::Condition {
    if state.pod_ready {
        condition(conditions::SCHEDULED, true, "Scheduled", "", generation, now)
    } else {
        condition(
            conditions::SCHEDULED,
            false,
            "NotReconciled",
            "gateway deployment is not ready",
            generation,
            now,
        )
    }
}

fn ready(state: &GatewayState, generation: Option<i64>, now: DateTime<Utc>) -> k8s::Condition {
    let invalid = state
        .listeners
        .iter()
        .filter(|l| !l.is_valid())
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>();

    if !invalid.is_empty() {
        return condition(
            conditions::READY,
            false,
            "ListenersNotValid",
            format!("invalid listeners: {}", invalid.join(", ")),
            generation,
            now,
        );
    }
    if !state.service_ready || state.addresses.is_empty() {
        return condition(
            conditions::READY,
            false,
            "AddressNotAssigned",
            "gateway service has no addresses",
            generation,
            now,
        );
    }
    condition(conditions::READY, true, "Ready", "", generation, now)
}

fn in_sync(state: &GatewayState, generation: Option<i64>, now: DateTime<Utc>) -> k8s::Condition {
    match state.sync_error.as_deref() {
        None => condition(conditions::IN_SYNC, true, "InSync", "", generation, now),
        Some(error) => condition(
            conditions::IN_SYNC,
            false,
            "SyncError",
            error,
            generation,
            now,
        ),
    }
}

fn listener_status(
    listener: &ListenerState,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> api::GatewayStatusListeners {
    let conflicts = listener
        .status
        .conflicts
        .iter()
        .map(ToString::to_string)
        .chain(
            listener
                .has_route_conflict()
                .then(|| "only one route may attach to a TCP listener".to_string()),
        )
        .collect::<Vec<_>>();
    let conflicted = if conflicts.is_empty() {
        condition(conditions::CONFLICTED, false, "NoConflicts", "", generation, now)
    } else {
        let reason = match listener.status.conflicts.first() {
            Some(ListenerConflict::Name(_)) => "NameConflict",
            Some(ListenerConflict::Port(_)) => "PortConflict",
            None => "RouteConflict",
        };
        condition(
            conditions::CONFLICTED,
            true,
            reason,
            conflicts.join("; "),
            generation,
            now,
        )
    };

    let detached = match &listener.protocol {
        ListenerProtocol::Unsupported(protocol) => condition(
            conditions::DETACHED,
            true,
            "UnsupportedProtocol",
            format!("unsupported protocol {protocol:?}"),
            generation,
            now,
        ),
        _ => condition(conditions::DETACHED, false, "Attached", "", generation, now),
    };

    let (cert_errors, other_errors): (Vec<_>, Vec<_>) = listener
        .status
        .errors
        .iter()
        .partition(|e| e.is_certificate_error());

    let resolved_refs = if cert_errors.is_empty() {
        condition(conditions::RESOLVED_REFS, true, "ResolvedRefs", "", generation, now)
    } else {
        condition(
            conditions::RESOLVED_REFS,
            false,
            "InvalidCertificateRef",
            join(&cert_errors),
            generation,
            now,
        )
    };

    let ready = if listener.is_valid() {
        condition(conditions::READY, true, "Ready", "", generation, now)
    } else if !other_errors.is_empty() {
        condition(
            conditions::READY,
            false,
            "Invalid",
            join(&other_errors),
            generation,
            now,
        )
    } else {
        condition(
            conditions::READY,
            false,
            "Invalid",
            "listener is not valid",
            generation,
            now,
        )
    };

    api::GatewayStatusListeners {
        name: listener.name.clone(),
        supported_kinds: listener
            .supported_kinds()
            .into_iter()
            .map(|kind| api::GatewayStatusListenersSupportedKinds {
                group: kind.group,
                kind: kind.kind,
            })
            .collect(),
        attached_routes: i32::try_from(listener.routes.len()).unwrap_or(i32::MAX),
        conditions: vec![conflicted, detached, resolved_refs, ready],
    }
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
