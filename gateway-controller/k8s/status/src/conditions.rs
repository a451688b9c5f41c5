//! Status condition vocabulary and helpers.

use chrono::{DateTime, Utc};
use gateway_controller_k8s_api::{Condition, Time};

// Gateway condition types.
pub const SCHEDULED: &str = "Scheduled";
pub const READY: &str = "Ready";
pub const IN_SYNC: &str = "InSync";

// Listener condition types. Listeners also report `Ready`.
pub const CONFLICTED: &str = "Conflicted";
pub const DETACHED: &str = "Detached";
pub const RESOLVED_REFS: &str = "ResolvedRefs";

// Route parent condition types. Routes also report `ResolvedRefs`.
pub const ACCEPTED: &str = "Accepted";

pub(crate) fn status(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub(crate) fn condition(
    type_: &str,
    value: bool,
    reason: &str,
    message: impl Into<String>,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: status(value).to_string(),
        reason: reason.to_string(),
        message: message.into(),
        observed_generation: generation,
        last_transition_time: Time(now),
    }
}

/// Reuses the transition time of previously published conditions that have
/// not changed.
///
/// A condition is unchanged when its type, status, reason and message match.
/// The observed generation may still differ.
pub fn preserve_timestamps(conditions: &mut [Condition], previous: &[Condition]) {
    for condition in conditions.iter_mut() {
        let prior = previous.iter().find(|p| {
            p.type_ == condition.type_
                && p.status == condition.status
                && p.reason == condition.reason
                && p.message == condition.message
        });
        if let Some(prior) = prior {
            condition.last_transition_time = prior.last_transition_time.clone();
        }
    }
}

/// Compares two condition lists, ignoring transition times and order.
pub fn eq_time_insensitive(left: &[Condition], right: &[Condition]) -> bool {
    left.len() == right.len()
        && left.iter().all(|l| {
            right.iter().any(|r| {
                l.type_ == r.type_
                    && l.status == r.status
                    && l.reason == r.reason
                    && l.message == r.message
                    && l.observed_generation == r.observed_generation
            })
        })
}
