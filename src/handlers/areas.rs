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
    lifecycle::areas,
    models::{AreaView, CreateAreaRequest, UpdateAreaRequest},
};

/// create_area
///
/// [Authenticated Route] Admin only.
#[utoipa::path(
    post,
    path = "/api/areas",
    tag = "areas",
    request_body = CreateAreaRequest,
    responses(
        (status = 201, description = "Area created", body = AreaView),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn create_area(
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<CreateAreaRequest>,
) -> Result<(StatusCode, Json<AreaView>), AppError> {
    let area = areas::create(&state, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(area)))
}

#[utoipa::path(
    get,
    path = "/api/areas",
    tag = "areas",
    responses(
        (status = 200, description = "Active areas", body = [AreaView]),
        (status = 403, description = "Not allowed", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn list_areas(
    actor: Actor,
    State(state): State<AppState>,
) -> Result<Json<Vec<AreaView>>, AppError> {
    Ok(Json(areas::list(&state, &actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/areas/{id}",
    tag = "areas",
    params(("id" = Uuid, Path, description = "Area id")),
    responses(
        (status = 200, description = "Area", body = AreaView),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn get_area(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaView>, AppError> {
    Ok(Json(areas::get(&state, &actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/areas/{id}",
    tag = "areas",
    params(("id" = Uuid, Path, description = "Area id")),
    request_body = UpdateAreaRequest,
    responses(
        (status = 200, description = "Area updated", body = AreaView),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn update_area(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAreaRequest>,
) -> Result<Json<AreaView>, AppError> {
    Ok(Json(areas::edit(&state, &actor, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/areas/{id}",
    tag = "areas",
    params(("id" = Uuid, Path, description = "Area id")),
    responses(
        (status = 200, description = "Area deactivated", body = AreaView),
        (status = 400, description = "Already inactive", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn deactivate_area(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaView>, AppError> {
    Ok(Json(areas::deactivate(&state, &actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/areas/{id}/reactivate",
    tag = "areas",
    params(("id" = Uuid, Path, description = "Area id")),
    responses(
        (status = 200, description = "Area reactivated", body = AreaView),
        (status = 400, description = "Already active", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("token" = []))
)]
pub async fn reactivate_area(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AreaView>, AppError> {
    Ok(Json(areas::reactivate(&state, &actor, id).await?))
}
