//! Command API and service wiring for versa.
//!
//! - [`VersionControlApi`]: JSON request/response façade over the core services
//! - [`Services`]: the composition root building one service graph
//! - [`routes`]: an axum router exposing the API over HTTP

pub mod api;
pub mod routes;
pub mod services;

pub use api::{Action, ApiFailure, VersionControlApi};
pub use routes::create_router;
pub use services::{Backends, Services};
