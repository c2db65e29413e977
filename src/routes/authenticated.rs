use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

use handlers::{areas, auth, expedientes, users};

/// Authenticated Router Module
///
/// Every route here sits behind the token middleware, which resolves the
/// `Actor` once and caches it in the request extensions for the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        .route("/api/auth/verify", get(auth::verify))
        .route("/api/auth/me", get(auth::me))
        // --- Users ---
        .route(
            "/api/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route("/api/users/dni/{dni}", get(users::get_user_by_dni))
        .route("/api/users/{id}/reactivate", put(users::reactivate_user))
        // --- Areas ---
        .route(
            "/api/areas",
            get(areas::list_areas).post(areas::create_area),
        )
        .route(
            "/api/areas/{id}",
            get(areas::get_area)
                .put(areas::update_area)
                .delete(areas::deactivate_area),
        )
        .route("/api/areas/{id}/reactivate", put(areas::reactivate_area))
        // --- Expedientes ---
        .route(
            "/api/expedientes",
            get(expedientes::list_expedientes).post(expedientes::create_expediente),
        )
        // Static segments win over `{id}`, so `buscar` never parses as an id.
        .route(
            "/api/expedientes/buscar",
            get(expedientes::search_expedientes),
        )
        .route(
            "/api/expedientes/area/{area_id}",
            get(expedientes::list_expedientes_by_area),
        )
        .route(
            "/api/expedientes/{id}",
            get(expedientes::get_expediente).put(expedientes::update_expediente),
        )
        .route(
            "/api/expedientes/desactivar/{id}",
            put(expedientes::deactivate_expediente),
        )
        .route(
            "/api/expedientes/recuperar/{id}",
            put(expedientes::reactivate_expediente),
        )
}
