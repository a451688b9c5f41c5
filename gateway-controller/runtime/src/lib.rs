#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use gateway_controller_chain as chain;
pub use gateway_controller_core as core;
pub use gateway_controller_k8s_api as k8s;
pub use gateway_controller_k8s_state as state;
pub use gateway_controller_k8s_status as status;

mod admission;
mod config;
mod metrics;
mod reconcile;
mod timeout;
mod validation;

#[cfg(test)]
mod tests;

pub use self::{
    admission::{Admission, ListenerStatuses, Validate},
    config::Config,
    metrics::{PassOutcome, ReconcileMetrics},
    reconcile::{Deployment, Error, Outcome, Reconciler},
    timeout::Timeout,
};
