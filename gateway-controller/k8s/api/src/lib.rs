#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gateway;
pub mod options;

pub use self::gateway::{Gateway, HTTPRoute, TCPRoute};
pub use k8s_openapi::{
    api::core::v1::{Secret, Service},
    apimachinery::pkg::apis::meta::v1::{Condition, ObjectMeta, Time},
};
pub use kube::{Resource, ResourceExt};

pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// Checks whether a `group`/`kind` pair references the resource type `T`.
///
/// An empty or absent group refers to the core API group.
pub fn targets_kind<T>(group: Option<&str>, kind: &str) -> bool
where
    T: kube::Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();

    let mut t_group = &*T::group(&dt);
    if t_group.is_empty() {
        t_group = "core";
    }

    let group = match group {
        None | Some("") => "core",
        Some(g) => g,
    };

    group.eq_ignore_ascii_case(t_group) && kind.eq_ignore_ascii_case(&T::kind(&dt))
}
