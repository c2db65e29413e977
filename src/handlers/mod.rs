//! HTTP handlers.
//!
//! Thin adapters between axum extractors and the lifecycle layer. Every protected
//! handler takes the resolved `Actor` first; authorization and validation happen
//! below this layer and surface as `AppError` responses.

pub mod areas;
pub mod auth;
pub mod expedientes;
pub mod users;

/// health
///
/// Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
