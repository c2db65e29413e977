use chrono::Utc;
use uuid::Uuid;

use super::{Status, optional, patch_optional, patch_required, required, validate_year};
use crate::AppState;
use crate::auth::Actor;
use crate::error::{AppError, AppResult, DUPLICATE_RECORD_NUMBER};
use crate::models::{
    CreateExpedienteRequest, Expediente, ExpedienteSearch, ExpedienteView,
    UpdateExpedienteRequest,
};
use crate::policy::{self, Entity, Operation, Target};
use crate::repository::ExpedienteFilter;

fn in_area(area_id: Uuid) -> Target {
    Target::in_area(Entity::Expediente, Some(area_id))
}

async fn check_area(state: &AppState, area_id: Uuid) -> AppResult<()> {
    match state.repo.get_area(area_id).await? {
        Some(area) if area.active => Ok(()),
        _ => Err(AppError::NotFound("area")),
    }
}

/// Fails when an active expediente other than `own_id` holds `record_number`.
async fn check_record_number(
    state: &AppState,
    record_number: &str,
    own_id: Option<Uuid>,
) -> AppResult<()> {
    match state.repo.active_record_number_holder(record_number).await? {
        Some(holder) if Some(holder) != own_id => {
            Err(AppError::DuplicateKey(DUPLICATE_RECORD_NUMBER.to_string()))
        }
        _ => Ok(()),
    }
}

async fn view(state: &AppState, id: Uuid) -> AppResult<ExpedienteView> {
    state
        .repo
        .get_expediente_view(id)
        .await?
        .ok_or(AppError::NotFound("expediente"))
}

async fn load(state: &AppState, id: Uuid) -> AppResult<Expediente> {
    state
        .repo
        .get_expediente(id)
        .await?
        .ok_or(AppError::NotFound("expediente"))
}

/// create
///
/// Files a new active record in `area_id`. Moderators may only file into their own area.
pub async fn create(
    state: &AppState,
    actor: &Actor,
    req: CreateExpedienteRequest,
) -> AppResult<ExpedienteView> {
    policy::ensure(actor, Operation::Create, &Target::Kind(Entity::Expediente))?;
    policy::ensure(actor, Operation::Create, &in_area(req.area_id))?;

    let title = required("titulo", &req.title)?;
    let record_number = required("numeroExpediente", &req.record_number)?;
    let box_label = required("caja", &req.box_label)?;
    validate_year(req.year)?;
    check_area(state, req.area_id).await?;
    check_record_number(state, &record_number, None).await?;

    let expediente = state
        .repo
        .insert_expediente(Expediente {
            id: Uuid::new_v4(),
            title,
            description: optional(req.description),
            record_number,
            box_label,
            year: req.year,
            area_id: req.area_id,
            created_by: actor.id,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: None,
            active: true,
        })
        .await?;

    tracing::info!(
        expediente_id = %expediente.id,
        area_id = %expediente.area_id,
        created_by = %actor.id,
        "expediente created"
    );
    view(state, expediente.id).await
}

/// list
///
/// Active records within the actor's scope, newest first.
pub async fn list(state: &AppState, actor: &Actor) -> AppResult<Vec<ExpedienteView>> {
    let scope = policy::scope(actor, Entity::Expediente)?;
    state
        .repo
        .search_expedientes(&ExpedienteFilter::active_in(scope.area_filter()))
        .await
}

/// Active records of one area.
pub async fn list_by_area(
    state: &AppState,
    actor: &Actor,
    area_id: Uuid,
) -> AppResult<Vec<ExpedienteView>> {
    policy::ensure(actor, Operation::ReadAll, &Target::Kind(Entity::Expediente))?;
    policy::ensure(actor, Operation::ReadAll, &in_area(area_id))?;

    if state.repo.get_area(area_id).await?.is_none() {
        return Err(AppError::NotFound("area"));
    }
    state
        .repo
        .search_expedientes(&ExpedienteFilter::active_in(Some(area_id)))
        .await
}

/// search
///
/// Dynamic search within the actor's scope. An explicit `areaId` outside a
/// moderator's own area is refused rather than silently narrowed.
pub async fn search(
    state: &AppState,
    actor: &Actor,
    query: ExpedienteSearch,
) -> AppResult<Vec<ExpedienteView>> {
    let scope = policy::scope(actor, Entity::Expediente)?;
    if let Some(area_id) = query.area_id {
        policy::ensure(actor, Operation::ReadAll, &in_area(area_id))?;
    }

    let filter = ExpedienteFilter {
        area_id: query.area_id.or(scope.area_filter()),
        title: optional(query.titulo),
        description: optional(query.descripcion),
        box_label: optional(query.caja),
        record_number: optional(query.numero_expediente),
        year: query.anio,
        active: query.active,
    };
    state.repo.search_expedientes(&filter).await
}

pub async fn get(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<ExpedienteView> {
    policy::ensure(actor, Operation::ReadOne, &Target::Kind(Entity::Expediente))?;
    let expediente = load(state, id).await?;
    policy::ensure(actor, Operation::ReadOne, &in_area(expediente.area_id))?;
    view(state, expediente.id).await
}

/// edit
///
/// Partial update stamped with the editor and time. Moving a record to another
/// area must be allowed for both the old and the new area.
pub async fn edit(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    req: UpdateExpedienteRequest,
) -> AppResult<ExpedienteView> {
    policy::ensure(actor, Operation::Edit, &Target::Kind(Entity::Expediente))?;
    let mut expediente = load(state, id).await?;
    policy::ensure(actor, Operation::Edit, &in_area(expediente.area_id))?;

    if let Some(area_id) = req.area_id.filter(|a| *a != expediente.area_id) {
        policy::ensure(actor, Operation::Edit, &in_area(area_id))?;
        check_area(state, area_id).await?;
        expediente.area_id = area_id;
    }

    patch_required("titulo", &mut expediente.title, req.title)?;
    patch_required("caja", &mut expediente.box_label, req.box_label)?;
    patch_optional(&mut expediente.description, req.description);
    if let Some(year) = req.year {
        validate_year(year)?;
        expediente.year = year;
    }

    let previous_number = expediente.record_number.clone();
    patch_required(
        "numeroExpediente",
        &mut expediente.record_number,
        req.record_number,
    )?;
    if expediente.active && expediente.record_number != previous_number {
        check_record_number(state, &expediente.record_number, Some(expediente.id)).await?;
    }

    expediente.updated_by = Some(actor.id);
    expediente.updated_at = Some(Utc::now());

    let expediente = state.repo.update_expediente(expediente).await?;
    tracing::info!(expediente_id = %expediente.id, edited_by = %actor.id, "expediente updated");
    view(state, expediente.id).await
}

pub async fn deactivate(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<ExpedienteView> {
    policy::ensure(
        actor,
        Operation::Deactivate,
        &Target::Kind(Entity::Expediente),
    )?;
    let expediente = load(state, id).await?;
    policy::ensure(actor, Operation::Deactivate, &in_area(expediente.area_id))?;

    let status = Status::from_flag(expediente.active).deactivate("expediente")?;
    state
        .repo
        .set_expediente_active(expediente.id, status.is_active())
        .await?
        .ok_or(AppError::NotFound("expediente"))?;

    tracing::info!(expediente_id = %expediente.id, by = %actor.id, "expediente deactivated");
    view(state, expediente.id).await
}

/// reactivate
///
/// Restores the record unless another active record now holds its number.
pub async fn reactivate(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<ExpedienteView> {
    policy::ensure(
        actor,
        Operation::Reactivate,
        &Target::Kind(Entity::Expediente),
    )?;
    let expediente = load(state, id).await?;
    policy::ensure(actor, Operation::Reactivate, &in_area(expediente.area_id))?;

    let status = Status::from_flag(expediente.active).reactivate("expediente")?;
    check_record_number(state, &expediente.record_number, Some(expediente.id)).await?;

    state
        .repo
        .set_expediente_active(expediente.id, status.is_active())
        .await?
        .ok_or(AppError::NotFound("expediente"))?;

    tracing::info!(expediente_id = %expediente.id, by = %actor.id, "expediente reactivated");
    view(state, expediente.id).await
}
