//! HTTP API handlers for vellum-of
//!
//! REST endpoints plus an SSE event stream. Handlers return
//! `ApiResult<impl IntoResponse>`; failures map to the JSON error body in
//! [`crate::error::ApiError`].

pub mod events;
pub mod generators;
pub mod health;
pub mod orders;

pub use events::event_stream;
pub use generators::generator_routes;
pub use health::health_routes;
pub use orders::order_routes;
