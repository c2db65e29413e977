//! Authorization policy.
//!
//! Every permission question the service asks goes through [`authorize`]. The
//! rules are a static grant table keyed by `(role, entity, operation)`; a key
//! with no row is denied. Handlers consult the policy twice: once with an
//! unresolved [`Target::Kind`] before touching storage, so an under-privileged
//! caller is refused without learning whether the target exists, and once with
//! the loaded target's facts for area and tier checks.

use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{AppError, AppResult};
use crate::models::Role;

use self::Entity as E;
use self::Grant as G;
use self::Operation as O;
use crate::models::Role as R;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Area,
    User,
    Expediente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    ReadAll,
    ReadOne,
    Edit,
    Deactivate,
    Reactivate,
    /// Changing the role of an existing account.
    AssignRole,
}

/// Grant
///
/// What a matching table row still requires once the target is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// No further condition.
    Any,
    /// The target must lie in the actor's own area.
    OwnArea,
    /// The target account must hold the `user` role.
    UserTier,
}

/// Target
///
/// The thing being acted upon. `Kind` carries only the entity type and is
/// evaluated against roles alone; `Resolved` adds the facts read from storage
/// (or from the request, for creations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Kind(Entity),
    Resolved {
        entity: Entity,
        area: Option<Uuid>,
        role: Option<Role>,
    },
}

impl Target {
    pub fn in_area(entity: Entity, area: Option<Uuid>) -> Self {
        Target::Resolved {
            entity,
            area,
            role: None,
        }
    }

    pub fn account(area: Option<Uuid>, role: Role) -> Self {
        Target::Resolved {
            entity: Entity::User,
            area,
            role: Some(role),
        }
    }

    fn entity(&self) -> Entity {
        match self {
            Target::Kind(entity) | Target::Resolved { entity, .. } => *entity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Forbidden,
    ForbiddenArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(Denial::Forbidden) => Err(AppError::Forbidden),
            Decision::Deny(Denial::ForbiddenArea) => Err(AppError::ForbiddenArea),
        }
    }
}

/// Scope
///
/// How far a read-all query may reach for a given actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Area(Uuid),
}

impl Scope {
    /// The area filter a repository query should apply.
    pub fn area_filter(&self) -> Option<Uuid> {
        match self {
            Scope::All => None,
            Scope::Area(id) => Some(*id),
        }
    }
}

/// The grant table. Unlisted combinations are forbidden.
const GRANTS: &[(Role, Entity, Operation, Grant)] = &[
    // Admins may do everything, everywhere.
    (R::Admin, E::Area, O::Create, G::Any),
    (R::Admin, E::Area, O::ReadAll, G::Any),
    (R::Admin, E::Area, O::ReadOne, G::Any),
    (R::Admin, E::Area, O::Edit, G::Any),
    (R::Admin, E::Area, O::Deactivate, G::Any),
    (R::Admin, E::Area, O::Reactivate, G::Any),
    (R::Admin, E::User, O::Create, G::Any),
    (R::Admin, E::User, O::ReadAll, G::Any),
    (R::Admin, E::User, O::ReadOne, G::Any),
    (R::Admin, E::User, O::Edit, G::Any),
    (R::Admin, E::User, O::Deactivate, G::Any),
    (R::Admin, E::User, O::Reactivate, G::Any),
    (R::Admin, E::User, O::AssignRole, G::Any),
    (R::Admin, E::Expediente, O::Create, G::Any),
    (R::Admin, E::Expediente, O::ReadAll, G::Any),
    (R::Admin, E::Expediente, O::ReadOne, G::Any),
    (R::Admin, E::Expediente, O::Edit, G::Any),
    (R::Admin, E::Expediente, O::Deactivate, G::Any),
    (R::Admin, E::Expediente, O::Reactivate, G::Any),
    // Moderators: areas are read-only and unscoped.
    (R::Moderator, E::Area, O::ReadAll, G::Any),
    (R::Moderator, E::Area, O::ReadOne, G::Any),
    // Moderators manage plain users only, and see their own area's roster.
    (R::Moderator, E::User, O::Create, G::UserTier),
    (R::Moderator, E::User, O::ReadAll, G::OwnArea),
    (R::Moderator, E::User, O::ReadOne, G::OwnArea),
    (R::Moderator, E::User, O::Edit, G::UserTier),
    (R::Moderator, E::User, O::Deactivate, G::UserTier),
    (R::Moderator, E::User, O::Reactivate, G::UserTier),
    // Moderators work on their own area's records; the toggles are not area-scoped.
    (R::Moderator, E::Expediente, O::Create, G::OwnArea),
    (R::Moderator, E::Expediente, O::ReadAll, G::OwnArea),
    (R::Moderator, E::Expediente, O::ReadOne, G::OwnArea),
    (R::Moderator, E::Expediente, O::Edit, G::OwnArea),
    (R::Moderator, E::Expediente, O::Deactivate, G::Any),
    (R::Moderator, E::Expediente, O::Reactivate, G::Any),
    // Plain users may only look up a single area.
    (R::User, E::Area, O::ReadOne, G::Any),
];

/// Looks up the grant row for a role, entity and operation.
pub fn grant_for(role: Role, entity: Entity, operation: Operation) -> Option<Grant> {
    GRANTS
        .iter()
        .find(|(r, e, o, _)| *r == role && *e == entity && *o == operation)
        .map(|(_, _, _, grant)| *grant)
}

/// authorize
///
/// The single policy decision point. Role is checked first; the grant's
/// condition is only evaluated once the target is resolved.
pub fn authorize(actor: &Actor, operation: Operation, target: &Target) -> Decision {
    let Some(grant) = grant_for(actor.role, target.entity(), operation) else {
        return Decision::Deny(Denial::Forbidden);
    };

    let Target::Resolved { area, role, .. } = target else {
        return Decision::Allow;
    };

    match grant {
        Grant::Any => Decision::Allow,
        Grant::OwnArea => match (actor.area_id, area) {
            (Some(own), Some(target_area)) if own == *target_area => Decision::Allow,
            _ => Decision::Deny(Denial::ForbiddenArea),
        },
        Grant::UserTier => match role {
            Some(Role::User) => Decision::Allow,
            _ => Decision::Deny(Denial::Forbidden),
        },
    }
}

/// Like [`authorize`], but as a `Result` ready for `?`.
pub fn ensure(actor: &Actor, operation: Operation, target: &Target) -> AppResult<()> {
    let decision = authorize(actor, operation, target);
    if let Decision::Deny(denial) = decision {
        tracing::debug!(
            actor = %actor.id,
            role = %actor.role,
            ?operation,
            entity = ?target.entity(),
            ?denial,
            "authorization denied"
        );
    }
    decision.into_result()
}

/// scope
///
/// Narrows a read-all query for `entity`. An `OwnArea` grant confines the actor
/// to their own area; a moderator without an area gets `ForbiddenArea`.
pub fn scope(actor: &Actor, entity: Entity) -> AppResult<Scope> {
    match grant_for(actor.role, entity, Operation::ReadAll) {
        None => Err(AppError::Forbidden),
        Some(Grant::OwnArea) => actor
            .area_id
            .map(Scope::Area)
            .ok_or(AppError::ForbiddenArea),
        Some(_) => Ok(Scope::All),
    }
}
