use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The RBAC tier of an account, stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Stored Entities (Mapped to Database) ---

/// User
///
/// The canonical account row from the `users` table. Not `Serialize`:
/// it carries the credential hash, and only `UserView` may reach the wire.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    // Optional only for admins.
    pub area_id: Option<Uuid>,
    // National id, unique among active users.
    pub dni: String,
    pub email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Area
///
/// An organizational department from the `areas` table.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub moderator_id: Option<Uuid>,
    // Always an admin.
    pub created_by: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Expediente
///
/// A case file from the `expedientes` table.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Expediente {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    // Business key, unique among active expedientes.
    pub record_number: String,
    pub box_label: String,
    pub year: i32,
    pub area_id: Uuid,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub active: bool,
}

// --- Read Models (Projections assembled by the query layer) ---

/// AreaSummary
///
/// The joined `{id, nombre}` fragment embedded in user and expediente views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AreaSummary {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
}

/// UserSummary
///
/// The joined `{id, username}` fragment for creator/editor/moderator references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

/// UserView
///
/// Presentation shape of an account. Never contains the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub dni: String,
    pub email: Option<String>,
    pub area: Option<AreaSummary>,
    pub active: bool,
    #[ts(type = "string")]
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// AreaView
///
/// Presentation shape of an area with its moderator and creator resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AreaView {
    pub id: Uuid,
    pub name: String,
    pub moderator: Option<UserSummary>,
    #[serde(rename = "createdBy")]
    pub created_by: UserSummary,
    pub active: bool,
    #[ts(type = "string")]
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// ExpedienteView
///
/// Presentation shape of a case file, keeping the original Spanish wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ExpedienteView {
    pub id: Uuid,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "numeroExpediente")]
    pub record_number: String,
    #[serde(rename = "caja")]
    pub box_label: String,
    #[serde(rename = "anio")]
    pub year: i32,
    pub area: AreaSummary,
    #[serde(rename = "creadoPor")]
    pub created_by: UserSummary,
    #[serde(rename = "editadoPor")]
    pub updated_by: Option<UserSummary>,
    #[ts(type = "string")]
    #[serde(rename = "fechaCreacion")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    #[serde(rename = "fechaActualizacion")]
    pub updated_at: Option<DateTime<Utc>>,
    pub active: bool,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credential pair for POST /api/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub dni: String,
    pub password: String,
}

/// CreateUserRequest
///
/// Input payload for POST /api/users.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub dni: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "areaId", default)]
    pub area_id: Option<Uuid>,
}

/// UpdateUserRequest
///
/// Partial update for PUT /api/users/{id}. The DNI is immutable and therefore absent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "areaId", skip_serializing_if = "Option::is_none")]
    pub area_id: Option<Uuid>,
}

/// CreateAreaRequest
///
/// Input payload for POST /api/areas.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateAreaRequest {
    pub name: String,
    #[serde(rename = "moderatorId", default)]
    pub moderator_id: Option<Uuid>,
}

/// UpdateAreaRequest
///
/// Partial update for PUT /api/areas/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAreaRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Absent leaves the moderator untouched; `null` unassigns it.
    #[serde(
        rename = "moderatorId",
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, format = Uuid)]
    #[ts(type = "string | null")]
    pub moderator_id: Option<Option<Uuid>>,
}

/// Maps a present field to `Some`, keeping an explicit `null` as `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// CreateExpedienteRequest
///
/// Input payload for POST /api/expedientes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateExpedienteRequest {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "areaId")]
    pub area_id: Uuid,
    #[serde(rename = "numeroExpediente")]
    pub record_number: String,
    #[serde(rename = "caja")]
    pub box_label: String,
    #[serde(rename = "anio")]
    pub year: i32,
}

/// UpdateExpedienteRequest
///
/// Partial update for PUT /api/expedientes/{id}. Absent fields keep their value;
/// an empty `descripcion` clears the description.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateExpedienteRequest {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "numeroExpediente", skip_serializing_if = "Option::is_none")]
    pub record_number: Option<String>,
    #[serde(rename = "caja", skip_serializing_if = "Option::is_none")]
    pub box_label: Option<String>,
    #[serde(rename = "anio", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "areaId", skip_serializing_if = "Option::is_none")]
    pub area_id: Option<Uuid>,
}

/// ExpedienteSearch
///
/// Query parameters of GET /api/expedientes/buscar. Text fields match
/// case-insensitively as substrings; number and year match exactly.
#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpedienteSearch {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub caja: Option<String>,
    #[serde(rename = "numeroExpediente")]
    pub numero_expediente: Option<String>,
    pub anio: Option<i32>,
    /// Absent means both active and inactive records.
    pub active: Option<bool>,
    #[serde(rename = "areaId")]
    pub area_id: Option<Uuid>,
}

// --- Response Payloads ---

/// LoginResponse
///
/// Output of a successful login: the account (without hash) and a 6-hour token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub usuario: UserView,
    pub token: String,
}

/// VerifyResponse
///
/// Output of GET /api/auth/verify.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// MeResponse
///
/// The resolved identity of the caller (GET /api/auth/me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    #[serde(rename = "areaId")]
    pub area_id: Option<Uuid>,
}
