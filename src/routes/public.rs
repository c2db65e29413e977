use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for monitoring and load balancers.
        .route("/health", get(handlers::health))
        // POST /api/auth/login
        // Exchanges DNI and password for a 6-hour token.
        .route("/api/auth/login", post(handlers::auth::login))
}
