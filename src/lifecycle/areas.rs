use chrono::Utc;
use uuid::Uuid;

use super::{Status, patch_required, required};
use crate::AppState;
use crate::auth::Actor;
use crate::error::{AppError, AppResult};
use crate::models::{Area, AreaView, CreateAreaRequest, Role, UpdateAreaRequest};
use crate::policy::{self, Entity, Operation, Target};

/// An area moderator must be an existing, active account with the moderator role.
async fn check_moderator(state: &AppState, moderator_id: Uuid) -> AppResult<()> {
    let Some(user) = state.repo.get_user(moderator_id).await? else {
        return Err(AppError::NotFound("user"));
    };
    if !user.active {
        return Err(AppError::NotFound("user"));
    }
    if user.role != Role::Moderator {
        return Err(AppError::validation(
            "moderatorId must reference a user with the moderator role",
        ));
    }
    Ok(())
}

async fn view(state: &AppState, id: Uuid) -> AppResult<AreaView> {
    state
        .repo
        .get_area_view(id)
        .await?
        .ok_or(AppError::NotFound("area"))
}

async fn load(state: &AppState, id: Uuid) -> AppResult<Area> {
    state
        .repo
        .get_area(id)
        .await?
        .ok_or(AppError::NotFound("area"))
}

pub async fn create(state: &AppState, actor: &Actor, req: CreateAreaRequest) -> AppResult<AreaView> {
    policy::ensure(actor, Operation::Create, &Target::Kind(Entity::Area))?;

    let name = required("name", &req.name)?;
    if let Some(moderator_id) = req.moderator_id {
        check_moderator(state, moderator_id).await?;
    }

    let area = state
        .repo
        .insert_area(Area {
            id: Uuid::new_v4(),
            name,
            moderator_id: req.moderator_id,
            created_by: actor.id,
            active: true,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(area_id = %area.id, created_by = %actor.id, "area created");
    view(state, area.id).await
}

/// Active areas ordered by name. The same list for every role allowed to read it.
pub async fn list(state: &AppState, actor: &Actor) -> AppResult<Vec<AreaView>> {
    policy::scope(actor, Entity::Area)?;
    state.repo.list_active_areas().await
}

pub async fn get(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<AreaView> {
    policy::ensure(actor, Operation::ReadOne, &Target::Kind(Entity::Area))?;
    view(state, id).await
}

pub async fn edit(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    req: UpdateAreaRequest,
) -> AppResult<AreaView> {
    policy::ensure(actor, Operation::Edit, &Target::Kind(Entity::Area))?;
    let mut area = load(state, id).await?;

    patch_required("name", &mut area.name, req.name)?;
    match req.moderator_id {
        Some(Some(moderator_id)) => {
            check_moderator(state, moderator_id).await?;
            area.moderator_id = Some(moderator_id);
        }
        Some(None) => area.moderator_id = None,
        None => {}
    }

    let area = state.repo.update_area(area).await?;
    tracing::info!(area_id = %area.id, edited_by = %actor.id, "area updated");
    view(state, area.id).await
}

pub async fn deactivate(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<AreaView> {
    policy::ensure(actor, Operation::Deactivate, &Target::Kind(Entity::Area))?;
    let area = load(state, id).await?;

    let status = Status::from_flag(area.active).deactivate("area")?;
    state
        .repo
        .set_area_active(area.id, status.is_active())
        .await?
        .ok_or(AppError::NotFound("area"))?;

    tracing::info!(area_id = %area.id, by = %actor.id, "area deactivated");
    view(state, area.id).await
}

pub async fn reactivate(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<AreaView> {
    policy::ensure(actor, Operation::Reactivate, &Target::Kind(Entity::Area))?;
    let area = load(state, id).await?;

    let status = Status::from_flag(area.active).reactivate("area")?;
    state
        .repo
        .set_area_active(area.id, status.is_active())
        .await?
        .ok_or(AppError::NotFound("area"))?;

    tracing::info!(area_id = %area.id, by = %actor.id, "area reactivated");
    view(state, area.id).await
}
