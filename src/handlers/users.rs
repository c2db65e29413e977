use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Actor,
    error::{AppError, ErrorBody},
    lifecycle::users,
    models::{CreateUserRequest, UpdateUserRequest, UserView},
};

/// create_user
///
/// [Authenticated Route] Admins create any account; moderators only role `user`.
/// A welcome mail is sent in the background when an email is given.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserView),
        (status = 400, description = "Validation failed or duplicate DNI", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Area not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn create_user(
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = users::create(&state, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// list_users
///
/// [Authenticated Route] Active users: all for admins, the own area for moderators.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "Active users", body = [UserView]),
        (status = 403, description = "Not allowed", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn list_users(
    actor: Actor,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, AppError> {
    Ok(Json(users::list(&state, &actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn get_user(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(users::get(&state, &actor, id).await?))
}

/// get_user_by_dni
///
/// [Authenticated Route] The active account registered under a DNI.
#[utoipa::path(
    get,
    path = "/api/users/dni/{dni}",
    tag = "users",
    params(("dni" = String, Path, description = "National id")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn get_user_by_dni(
    actor: Actor,
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(users::get_by_dni(&state, &actor, &dni).await?))
}

/// update_user
///
/// [Authenticated Route] Partial edit. Only admins may change a role.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserView),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn update_user(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(users::edit(&state, &actor, id, payload).await?))
}

/// deactivate_user
///
/// [Authenticated Route] Soft delete. The row is kept and can be reactivated.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = UserView),
        (status = 400, description = "Already inactive", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn deactivate_user(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(users::deactivate(&state, &actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/reactivate",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User reactivated", body = UserView),
        (status = 400, description = "Already active or DNI taken", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn reactivate_user(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(users::reactivate(&state, &actor, id).await?))
}
