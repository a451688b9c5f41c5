//! Gateway API resources.
//!
//! Every kind is taken from the experimental channel so that gateways,
//! HTTPRoutes and TCPRoutes share one set of generated types.

pub use gateway_api::apis::experimental::{
    gateways::{self, *},
    httproutes::{self, *},
    tcproutes::{self, *},
};
