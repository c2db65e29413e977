//! Lifecycle manager.
//!
//! Creation, partial edit and the soft deactivate/reactivate transitions for
//! users, areas and expedientes. Every operation receives the resolved
//! [`Actor`](crate::auth::Actor) and runs the policy's role gate before it reads
//! anything from storage.

pub mod areas;
pub mod expedientes;
pub mod users;

use crate::error::{AppError, AppResult};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Status
///
/// The two-state machine shared by every entity. Creation starts `Active`; there
/// is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn from_flag(active: bool) -> Self {
        if active {
            Status::Active
        } else {
            Status::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }

    pub fn deactivate(self, entity: &'static str) -> AppResult<Status> {
        match self {
            Status::Active => Ok(Status::Inactive),
            Status::Inactive => Err(AppError::AlreadyInactive(entity)),
        }
    }

    pub fn reactivate(self, entity: &'static str) -> AppResult<Status> {
        match self {
            Status::Inactive => Ok(Status::Active),
            Status::Active => Err(AppError::AlreadyActive(entity)),
        }
    }
}

/// Trims a required text field, rejecting blank input.
pub(crate) fn required(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field; blank collapses to `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Applies a partial edit to a required field. Absent keeps the old value.
pub(crate) fn patch_required(
    field: &str,
    current: &mut String,
    update: Option<String>,
) -> AppResult<()> {
    if let Some(value) = update {
        *current = required(field, &value)?;
    }
    Ok(())
}

/// Applies a partial edit to an optional field. An explicit empty string clears it.
pub(crate) fn patch_optional(current: &mut Option<String>, update: Option<String>) {
    if let Some(value) = update {
        *current = optional(Some(value));
    }
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_year(year: i32) -> AppResult<()> {
    if !(1..=9999).contains(&year) {
        return Err(AppError::validation("anio must be a valid year"));
    }
    Ok(())
}

