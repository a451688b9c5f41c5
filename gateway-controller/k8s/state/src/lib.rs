//! Per-pass derived state for gateways and routes.
//!
//! Each reconcile pass builds a [`GatewayState`] from a `Gateway` and a
//! [`RouteState`] for every route that may attach to it. Nothing here is
//! carried between passes: the state is recomputed from the resources and the
//! mesh catalog every time.
//!
//! ```text
//! [ Route ] -> resolve -> [ RouteState ] -> convert -> [ ResolvedRoute ]
//!                                                            |
//! [ Gateway ] -> [ GatewayState ] <--------- bind -----------+
//! ```
//!
//! Backend references are resolved against the mesh catalog by a
//! [`Resolver`]. Every rule of a route ends up with either resolved
//! references or resolution errors, never both and never neither. Rules that
//! failed to resolve are left out of the converted route, while their sibling
//! rules are still routable.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod bind;
pub mod convert;
mod gateway;
mod listener;
mod mesh;
mod refs;
mod resolve;
mod route;


pub use self::{
    bind::{BindError, ParentBinding},
    convert::ConvertError,
    gateway::GatewayState,
    listener::{
        AllowedNamespaces, CertificateSource, ListenerConflict, ListenerError, ListenerProtocol,
        ListenerState, ListenerStatus, ListenerTls, RouteGroupKind, TlsMode,
    },
    mesh::MeshNamespaces,
    refs::{BackendReference, ParentReference, RouteParentStatus, RouteStatus},
    resolve::{check_service, Resolver},
    route::{
        BackendIndex, MeshServiceReference, ResolutionError, ResolutionErrorKind,
        ResolutionErrors, ResolvedReference, RouteId, RouteResource, RouteRuleReferenceMap,
        RouteState, RuleIndex,
    },
};
