use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{self, Actor},
    error::{AppError, ErrorBody},
    models::{LoginRequest, LoginResponse, MeResponse, VerifyResponse},
};

/// login
///
/// [Public Route] Exchanges a DNI and password for a 6-hour session token.
/// Unknown DNI and wrong password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = auth::login(
        state.repo.as_ref(),
        &state.passwords,
        &state.config.jwt_secret,
        payload,
    )
    .await?;
    Ok(Json(response))
}

/// verify
///
/// [Authenticated Route] Reaching the handler means the token was accepted.
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    tag = "auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn verify(_actor: Actor) -> Json<VerifyResponse> {
    Json(VerifyResponse { valid: true })
}

/// me
///
/// [Authenticated Route] The identity the token resolves to, read from the
/// current user row.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn me(actor: Actor) -> Json<MeResponse> {
    Json(MeResponse {
        id: actor.id,
        username: actor.username,
        role: actor.role,
        area_id: actor.area_id,
    })
}
