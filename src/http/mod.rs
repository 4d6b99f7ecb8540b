//! HTTP route layer.
//!
//! Every configured collection gets the same set of routes, built by
//! [`routes::collection_routes`] and served by the generic handlers in
//! [`handlers`].

pub mod api;
pub mod handlers;
pub mod routes;

pub use handlers::Context;
pub use routes::api;
