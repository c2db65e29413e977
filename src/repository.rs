use crate::error::AppResult;
use crate::models::{
    Area, AreaSummary, AreaView, Expediente, ExpedienteView, User, UserSummary, UserView,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Role;

/// ExpedienteFilter
///
/// Storage-level search criteria. The caller has already narrowed `area_id`
/// according to the actor's scope; the repository applies filters verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpedienteFilter {
    pub area_id: Option<Uuid>,
    // Case-insensitive substring matches.
    pub title: Option<String>,
    pub description: Option<String>,
    pub box_label: Option<String>,
    // Exact matches.
    pub record_number: Option<String>,
    pub year: Option<i32>,
    // `None` returns both active and inactive rows.
    pub active: Option<bool>,
}

impl ExpedienteFilter {
    /// The active records of one area, or of every area.
    pub fn active_in(area_id: Option<Uuid>) -> Self {
        Self {
            area_id,
            active: Some(true),
            ..Self::default()
        }
    }
}

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers and the
/// lifecycle layer depend on this trait only, so tests can substitute an
/// in-memory store for Postgres.
///
/// Mutations take and return whole entities; soft-delete is a separate
/// `set_*_active` call so an edit can never flip the active flag by accident.
/// `set_*_active` returns `None` when the id does not exist.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_active_user_by_dni(&self, dni: &str) -> AppResult<Option<User>>;
    async fn get_user_view(&self, id: Uuid) -> AppResult<Option<UserView>>;
    // Active users ordered by username, optionally restricted to one area.
    async fn list_active_users(&self, area_id: Option<Uuid>) -> AppResult<Vec<UserView>>;
    async fn insert_user(&self, user: User) -> AppResult<User>;
    async fn update_user(&self, user: User) -> AppResult<User>;
    async fn set_user_active(&self, id: Uuid, active: bool) -> AppResult<Option<User>>;

    // --- Area Directory ---
    async fn get_area(&self, id: Uuid) -> AppResult<Option<Area>>;
    async fn get_area_view(&self, id: Uuid) -> AppResult<Option<AreaView>>;
    async fn list_active_areas(&self) -> AppResult<Vec<AreaView>>;
    async fn insert_area(&self, area: Area) -> AppResult<Area>;
    async fn update_area(&self, area: Area) -> AppResult<Area>;
    async fn set_area_active(&self, id: Uuid, active: bool) -> AppResult<Option<Area>>;

    // --- Record Store ---
    async fn get_expediente(&self, id: Uuid) -> AppResult<Option<Expediente>>;
    async fn get_expediente_view(&self, id: Uuid) -> AppResult<Option<ExpedienteView>>;
    // Id of the active expediente currently holding `record_number`, if any.
    async fn active_record_number_holder(&self, record_number: &str) -> AppResult<Option<Uuid>>;
    async fn search_expedientes(&self, filter: &ExpedienteFilter) -> AppResult<Vec<ExpedienteView>>;
    async fn insert_expediente(&self, expediente: Expediente) -> AppResult<Expediente>;
    async fn update_expediente(&self, expediente: Expediente) -> AppResult<Expediente>;
    async fn set_expediente_active(&self, id: Uuid, active: bool) -> AppResult<Option<Expediente>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Flat join rows, folded into the nested read models ---

#[derive(FromRow)]
struct UserViewRow {
    id: Uuid,
    username: String,
    role: Role,
    dni: String,
    email: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    area_ref_id: Option<Uuid>,
    area_name: Option<String>,
}

impl From<UserViewRow> for UserView {
    fn from(row: UserViewRow) -> Self {
        let area = match (row.area_ref_id, row.area_name) {
            (Some(id), Some(name)) => Some(AreaSummary { id, name }),
            _ => None,
        };
        UserView {
            id: row.id,
            username: row.username,
            role: row.role,
            dni: row.dni,
            email: row.email,
            area,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AreaViewRow {
    id: Uuid,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
    moderator_ref_id: Option<Uuid>,
    moderator_username: Option<String>,
    creator_id: Uuid,
    creator_username: String,
}

impl From<AreaViewRow> for AreaView {
    fn from(row: AreaViewRow) -> Self {
        let moderator = match (row.moderator_ref_id, row.moderator_username) {
            (Some(id), Some(username)) => Some(UserSummary { id, username }),
            _ => None,
        };
        AreaView {
            id: row.id,
            name: row.name,
            moderator,
            created_by: UserSummary {
                id: row.creator_id,
                username: row.creator_username,
            },
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ExpedienteViewRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    record_number: String,
    box_label: String,
    year: i32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    active: bool,
    area_ref_id: Uuid,
    area_name: String,
    creator_id: Uuid,
    creator_username: String,
    editor_id: Option<Uuid>,
    editor_username: Option<String>,
}

impl From<ExpedienteViewRow> for ExpedienteView {
    fn from(row: ExpedienteViewRow) -> Self {
        let updated_by = match (row.editor_id, row.editor_username) {
            (Some(id), Some(username)) => Some(UserSummary { id, username }),
            _ => None,
        };
        ExpedienteView {
            id: row.id,
            title: row.title,
            description: row.description,
            record_number: row.record_number,
            box_label: row.box_label,
            year: row.year,
            area: AreaSummary {
                id: row.area_ref_id,
                name: row.area_name,
            },
            created_by: UserSummary {
                id: row.creator_id,
                username: row.creator_username,
            },
            updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            active: row.active,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, password_hash, role, area_id, dni, email, active, created_at";
const AREA_COLUMNS: &str = "id, name, moderator_id, created_by, active, created_at";
const EXPEDIENTE_COLUMNS: &str = "id, title, description, record_number, box_label, year, \
     area_id, created_by, updated_by, created_at, updated_at, active";

const USER_VIEW_SELECT: &str = r#"
    SELECT u.id, u.username, u.role, u.dni, u.email, u.active, u.created_at,
           a.id AS area_ref_id, a.name AS area_name
    FROM users u
    LEFT JOIN areas a ON a.id = u.area_id
"#;

const AREA_VIEW_SELECT: &str = r#"
    SELECT a.id, a.name, a.active, a.created_at,
           m.id AS moderator_ref_id, m.username AS moderator_username,
           c.id AS creator_id, c.username AS creator_username
    FROM areas a
    LEFT JOIN users m ON m.id = a.moderator_id
    JOIN users c ON c.id = a.created_by
"#;

const EXPEDIENTE_VIEW_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.record_number, e.box_label, e.year,
           e.created_at, e.updated_at, e.active,
           a.id AS area_ref_id, a.name AS area_name,
           c.id AS creator_id, c.username AS creator_username,
           ed.id AS editor_id, ed.username AS editor_username
    FROM expedientes e
    JOIN areas a ON a.id = e.area_id
    JOIN users c ON c.id = e.created_by
    LEFT JOIN users ed ON ed.id = e.updated_by
"#;

/// Escapes LIKE metacharacters so user input is matched literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("%{}%", escaped)
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Uniqueness-among-active is enforced by the partial unique indexes created in
/// `migrations/`; their violations surface through `From<sqlx::Error>`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_user_by_dni(&self, dni: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE dni = $1 AND active = true");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(dni)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_view(&self, id: Uuid) -> AppResult<Option<UserView>> {
        let sql = format!("{USER_VIEW_SELECT} WHERE u.id = $1");
        let row = sqlx::query_as::<_, UserViewRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserView::from))
    }

    /// list_active_users
    ///
    /// Admin roster when `area_id` is `None`; a single area's roster otherwise.
    async fn list_active_users(&self, area_id: Option<Uuid>) -> AppResult<Vec<UserView>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(USER_VIEW_SELECT);
        builder.push(" WHERE u.active = true");
        if let Some(area_id) = area_id {
            builder.push(" AND u.area_id = ");
            builder.push_bind(area_id);
        }
        builder.push(" ORDER BY u.username ASC");

        let rows = builder
            .build_query_as::<UserViewRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserView::from).collect())
    }

    async fn insert_user(&self, user: User) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.password_hash)
            .bind(user.role)
            .bind(user.area_id)
            .bind(user.dni)
            .bind(user.email)
            .bind(user.active)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_user
    ///
    /// Persists every mutable column. `dni`, `active` and `created_at` are not written.
    async fn update_user(&self, user: User) -> AppResult<User> {
        let sql = format!(
            "UPDATE users SET username = $2, password_hash = $3, role = $4, area_id = $5, email = $6 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.password_hash)
            .bind(user.role)
            .bind(user.area_id)
            .bind(user.email)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> AppResult<Option<User>> {
        let sql = format!("UPDATE users SET active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_area(&self, id: Uuid) -> AppResult<Option<Area>> {
        let sql = format!("SELECT {AREA_COLUMNS} FROM areas WHERE id = $1");
        Ok(sqlx::query_as::<_, Area>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_area_view(&self, id: Uuid) -> AppResult<Option<AreaView>> {
        let sql = format!("{AREA_VIEW_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, AreaViewRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AreaView::from))
    }

    async fn list_active_areas(&self) -> AppResult<Vec<AreaView>> {
        let sql = format!("{AREA_VIEW_SELECT} WHERE a.active = true ORDER BY a.name ASC");
        let rows = sqlx::query_as::<_, AreaViewRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AreaView::from).collect())
    }

    async fn insert_area(&self, area: Area) -> AppResult<Area> {
        let sql = format!(
            "INSERT INTO areas ({AREA_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {AREA_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Area>(&sql)
            .bind(area.id)
            .bind(area.name)
            .bind(area.moderator_id)
            .bind(area.created_by)
            .bind(area.active)
            .bind(area.created_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_area(&self, area: Area) -> AppResult<Area> {
        let sql = format!(
            "UPDATE areas SET name = $2, moderator_id = $3 WHERE id = $1 RETURNING {AREA_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Area>(&sql)
            .bind(area.id)
            .bind(area.name)
            .bind(area.moderator_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn set_area_active(&self, id: Uuid, active: bool) -> AppResult<Option<Area>> {
        let sql = format!("UPDATE areas SET active = $2 WHERE id = $1 RETURNING {AREA_COLUMNS}");
        Ok(sqlx::query_as::<_, Area>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_expediente(&self, id: Uuid) -> AppResult<Option<Expediente>> {
        let sql = format!("SELECT {EXPEDIENTE_COLUMNS} FROM expedientes WHERE id = $1");
        Ok(sqlx::query_as::<_, Expediente>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_expediente_view(&self, id: Uuid) -> AppResult<Option<ExpedienteView>> {
        let sql = format!("{EXPEDIENTE_VIEW_SELECT} WHERE e.id = $1");
        let row = sqlx::query_as::<_, ExpedienteViewRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ExpedienteView::from))
    }

    async fn active_record_number_holder(&self, record_number: &str) -> AppResult<Option<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM expedientes WHERE record_number = $1 AND active = true",
        )
        .bind(record_number)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// search_expedientes
    ///
    /// Builds the dynamic search with QueryBuilder so every user-supplied value is
    /// a bound parameter. Text filters use ILIKE over escaped patterns.
    async fn search_expedientes(&self, filter: &ExpedienteFilter) -> AppResult<Vec<ExpedienteView>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(EXPEDIENTE_VIEW_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(area_id) = filter.area_id {
            builder.push(" AND e.area_id = ");
            builder.push_bind(area_id);
        }
        if let Some(active) = filter.active {
            builder.push(" AND e.active = ");
            builder.push_bind(active);
        }
        if let Some(title) = &filter.title {
            builder.push(" AND e.title ILIKE ");
            builder.push_bind(escape_like(title));
        }
        if let Some(description) = &filter.description {
            builder.push(" AND e.description ILIKE ");
            builder.push_bind(escape_like(description));
        }
        if let Some(box_label) = &filter.box_label {
            builder.push(" AND e.box_label ILIKE ");
            builder.push_bind(escape_like(box_label));
        }
        if let Some(record_number) = &filter.record_number {
            builder.push(" AND e.record_number = ");
            builder.push_bind(record_number.clone());
        }
        if let Some(year) = filter.year {
            builder.push(" AND e.year = ");
            builder.push_bind(year);
        }
        builder.push(" ORDER BY e.created_at DESC");

        let rows = builder
            .build_query_as::<ExpedienteViewRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ExpedienteView::from).collect())
    }

    async fn insert_expediente(&self, expediente: Expediente) -> AppResult<Expediente> {
        let sql = format!(
            "INSERT INTO expedientes ({EXPEDIENTE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {EXPEDIENTE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Expediente>(&sql)
            .bind(expediente.id)
            .bind(expediente.title)
            .bind(expediente.description)
            .bind(expediente.record_number)
            .bind(expediente.box_label)
            .bind(expediente.year)
            .bind(expediente.area_id)
            .bind(expediente.created_by)
            .bind(expediente.updated_by)
            .bind(expediente.created_at)
            .bind(expediente.updated_at)
            .bind(expediente.active)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_expediente(&self, expediente: Expediente) -> AppResult<Expediente> {
        let sql = format!(
            "UPDATE expedientes SET title = $2, description = $3, record_number = $4, box_label = $5, \
             year = $6, area_id = $7, updated_by = $8, updated_at = $9 \
             WHERE id = $1 RETURNING {EXPEDIENTE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Expediente>(&sql)
            .bind(expediente.id)
            .bind(expediente.title)
            .bind(expediente.description)
            .bind(expediente.record_number)
            .bind(expediente.box_label)
            .bind(expediente.year)
            .bind(expediente.area_id)
            .bind(expediente.updated_by)
            .bind(expediente.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn set_expediente_active(&self, id: Uuid, active: bool) -> AppResult<Option<Expediente>> {
        let sql = format!(
            "UPDATE expedientes SET active = $2 WHERE id = $1 RETURNING {EXPEDIENTE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Expediente>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?)
    }
}
