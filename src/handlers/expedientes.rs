use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Actor,
    error::{AppError, ErrorBody},
    lifecycle::expedientes,
    models::{CreateExpedienteRequest, ExpedienteSearch, ExpedienteView, UpdateExpedienteRequest},
};

/// create_expediente
///
/// [Authenticated Route] Files a record. Moderators may only file into their own area.
#[utoipa::path(
    post,
    path = "/api/expedientes",
    tag = "expedientes",
    request_body = CreateExpedienteRequest,
    responses(
        (status = 201, description = "Expediente created", body = ExpedienteView),
        (status = 400, description = "Validation failed or duplicate number", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Area not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn create_expediente(
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<CreateExpedienteRequest>,
) -> Result<(StatusCode, Json<ExpedienteView>), AppError> {
    let expediente = expedientes::create(&state, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(expediente)))
}

/// list_expedientes
///
/// [Authenticated Route] Active records in scope, newest first.
#[utoipa::path(
    get,
    path = "/api/expedientes",
    tag = "expedientes",
    responses(
        (status = 200, description = "Active expedientes", body = [ExpedienteView]),
        (status = 403, description = "Not allowed", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn list_expedientes(
    actor: Actor,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExpedienteView>>, AppError> {
    Ok(Json(expedientes::list(&state, &actor).await?))
}

/// search_expedientes
///
/// [Authenticated Route] Text fields match case-insensitive substrings; without
/// `active` both states are returned.
#[utoipa::path(
    get,
    path = "/api/expedientes/buscar",
    tag = "expedientes",
    params(ExpedienteSearch),
    responses(
        (status = 200, description = "Matching expedientes", body = [ExpedienteView]),
        (status = 403, description = "Not allowed", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn search_expedientes(
    actor: Actor,
    State(state): State<AppState>,
    Query(query): Query<ExpedienteSearch>,
) -> Result<Json<Vec<ExpedienteView>>, AppError> {
    Ok(Json(expedientes::search(&state, &actor, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/expedientes/area/{area_id}",
    tag = "expedientes",
    params(("area_id" = Uuid, Path, description = "Area id")),
    responses(
        (status = 200, description = "Active expedientes of the area", body = [ExpedienteView]),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Area not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn list_expedientes_by_area(
    actor: Actor,
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
) -> Result<Json<Vec<ExpedienteView>>, AppError> {
    Ok(Json(expedientes::list_by_area(&state, &actor, area_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/expedientes/{id}",
    tag = "expedientes",
    params(("id" = Uuid, Path, description = "Expediente id")),
    responses(
        (status = 200, description = "Expediente", body = ExpedienteView),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn get_expediente(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpedienteView>, AppError> {
    Ok(Json(expedientes::get(&state, &actor, id).await?))
}

/// update_expediente
///
/// [Authenticated Route] Partial edit; stamps the editor and update time.
#[utoipa::path(
    put,
    path = "/api/expedientes/{id}",
    tag = "expedientes",
    params(("id" = Uuid, Path, description = "Expediente id")),
    request_body = UpdateExpedienteRequest,
    responses(
        (status = 200, description = "Expediente updated", body = ExpedienteView),
        (status = 400, description = "Validation failed or duplicate number", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn update_expediente(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpedienteRequest>,
) -> Result<Json<ExpedienteView>, AppError> {
    Ok(Json(expedientes::edit(&state, &actor, id, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/expedientes/desactivar/{id}",
    tag = "expedientes",
    params(("id" = Uuid, Path, description = "Expediente id")),
    responses(
        (status = 200, description = "Expediente deactivated", body = ExpedienteView),
        (status = 400, description = "Already inactive", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn deactivate_expediente(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpedienteView>, AppError> {
    Ok(Json(expedientes::deactivate(&state, &actor, id).await?))
}

/// reactivate_expediente
///
/// [Authenticated Route] Fails when another active record now holds the same number.
#[utoipa::path(
    put,
    path = "/api/expedientes/recuperar/{id}",
    tag = "expedientes",
    params(("id" = Uuid, Path, description = "Expediente id")),
    responses(
        (status = 200, description = "Expediente reactivated", body = ExpedienteView),
        (status = 400, description = "Already active or number taken", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn reactivate_expediente(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpedienteView>, AppError> {
    Ok(Json(expedientes::reactivate(&state, &actor, id).await?))
}
