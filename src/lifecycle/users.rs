use chrono::Utc;
use uuid::Uuid;

use super::{Status, optional, patch_optional, patch_required, required, validate_password};
use crate::AppState;
use crate::auth::Actor;
use crate::error::{AppError, AppResult, DUPLICATE_DNI};
use crate::mailer;
use crate::models::{CreateUserRequest, Role, UpdateUserRequest, User, UserView};
use crate::policy::{self, Entity, Operation, Target};

/// Non-admin accounts must belong to an existing, active area.
async fn check_area(state: &AppState, role: Role, area_id: Option<Uuid>) -> AppResult<()> {
    match area_id {
        None if role == Role::Admin => Ok(()),
        None => Err(AppError::validation(format!(
            "areaId is required for role {role}"
        ))),
        Some(id) => match state.repo.get_area(id).await? {
            Some(area) if area.active => Ok(()),
            _ => Err(AppError::NotFound("area")),
        },
    }
}

async fn view(state: &AppState, id: Uuid) -> AppResult<UserView> {
    state
        .repo
        .get_user_view(id)
        .await?
        .ok_or(AppError::NotFound("user"))
}

async fn load(state: &AppState, id: Uuid) -> AppResult<User> {
    state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::NotFound("user"))
}

/// create
///
/// Registers a new active account. Moderators may only create plain users.
pub async fn create(state: &AppState, actor: &Actor, req: CreateUserRequest) -> AppResult<UserView> {
    policy::ensure(actor, Operation::Create, &Target::Kind(Entity::User))?;
    policy::ensure(
        actor,
        Operation::Create,
        &Target::account(req.area_id, req.role),
    )?;

    let username = required("username", &req.username)?;
    let dni = required("dni", &req.dni)?;
    validate_password(&req.password)?;
    check_area(state, req.role, req.area_id).await?;

    if state.repo.find_active_user_by_dni(&dni).await?.is_some() {
        return Err(AppError::DuplicateKey(DUPLICATE_DNI.to_string()));
    }

    let password_hash = state.passwords.hash(&req.password).await?;
    let user = state
        .repo
        .insert_user(User {
            id: Uuid::new_v4(),
            username,
            password_hash,
            role: req.role,
            area_id: req.area_id,
            dni,
            email: optional(req.email),
            active: true,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %actor.id, "user created");
    mailer::dispatch_welcome(&state.mailer, &user);

    view(state, user.id).await
}

/// list
///
/// Active users the actor may see: all for admins, their own area for moderators.
pub async fn list(state: &AppState, actor: &Actor) -> AppResult<Vec<UserView>> {
    let scope = policy::scope(actor, Entity::User)?;
    state.repo.list_active_users(scope.area_filter()).await
}

pub async fn get(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<UserView> {
    policy::ensure(actor, Operation::ReadOne, &Target::Kind(Entity::User))?;
    let user = load(state, id).await?;
    policy::ensure(
        actor,
        Operation::ReadOne,
        &Target::account(user.area_id, user.role),
    )?;
    view(state, user.id).await
}

/// Looks up the active account holding `dni`.
pub async fn get_by_dni(state: &AppState, actor: &Actor, dni: &str) -> AppResult<UserView> {
    policy::ensure(actor, Operation::ReadOne, &Target::Kind(Entity::User))?;
    let user = state
        .repo
        .find_active_user_by_dni(dni.trim())
        .await?
        .ok_or(AppError::NotFound("user"))?;
    policy::ensure(
        actor,
        Operation::ReadOne,
        &Target::account(user.area_id, user.role),
    )?;
    view(state, user.id).await
}

/// edit
///
/// Partial update. The DNI and id never change; a role change needs `AssignRole`.
pub async fn edit(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    req: UpdateUserRequest,
) -> AppResult<UserView> {
    policy::ensure(actor, Operation::Edit, &Target::Kind(Entity::User))?;
    let mut user = load(state, id).await?;
    policy::ensure(
        actor,
        Operation::Edit,
        &Target::account(user.area_id, user.role),
    )?;

    if let Some(role) = req.role.filter(|role| *role != user.role) {
        policy::ensure(actor, Operation::AssignRole, &Target::Kind(Entity::User))?;
        user.role = role;
    }

    patch_required("username", &mut user.username, req.username)?;
    patch_optional(&mut user.email, req.email);
    if let Some(area_id) = req.area_id {
        user.area_id = Some(area_id);
    }
    if req.area_id.is_some() || req.role.is_some() {
        check_area(state, user.role, user.area_id).await?;
    }

    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        validate_password(&password)?;
        user.password_hash = state.passwords.hash(&password).await?;
    }

    let user = state.repo.update_user(user).await?;
    tracing::info!(user_id = %user.id, edited_by = %actor.id, "user updated");
    view(state, user.id).await
}

/// deactivate
///
/// Soft-deletes the account. The DNI stays on the row and becomes reusable.
pub async fn deactivate(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<UserView> {
    policy::ensure(actor, Operation::Deactivate, &Target::Kind(Entity::User))?;
    let user = load(state, id).await?;
    policy::ensure(
        actor,
        Operation::Deactivate,
        &Target::account(user.area_id, user.role),
    )?;

    let status = Status::from_flag(user.active).deactivate("user")?;
    state
        .repo
        .set_user_active(user.id, status.is_active())
        .await?
        .ok_or(AppError::NotFound("user"))?;

    tracing::info!(user_id = %user.id, by = %actor.id, "user deactivated");
    view(state, user.id).await
}

/// reactivate
///
/// Restores the account unless another active account now holds its DNI.
pub async fn reactivate(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<UserView> {
    policy::ensure(actor, Operation::Reactivate, &Target::Kind(Entity::User))?;
    let user = load(state, id).await?;
    policy::ensure(
        actor,
        Operation::Reactivate,
        &Target::account(user.area_id, user.role),
    )?;

    let status = Status::from_flag(user.active).reactivate("user")?;
    if let Some(holder) = state.repo.find_active_user_by_dni(&user.dni).await? {
        if holder.id != user.id {
            return Err(AppError::DuplicateKey(DUPLICATE_DNI.to_string()));
        }
    }

    state
        .repo
        .set_user_active(user.id, status.is_active())
        .await?
        .ok_or(AppError::NotFound("user"))?;

    tracing::info!(user_id = %user.id, by = %actor.id, "user reactivated");
    view(state, user.id).await
}
