#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod conditions;
mod controller;
mod gateway;
mod route;


pub use self::{
    controller::{Controller, Status, StatusWriter, Update},
    gateway::{eq_time_insensitive as eq_time_insensitive_gateway_status, gateway_status},
    route::{eq_time_insensitive as eq_time_insensitive_route_status, parent_statuses, route_status},
};
