#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use expedientes_api::{
    AppConfig, AppState, MailerState, MockMailer, PasswordService,
    auth::{self, Actor},
    error::{AppError, AppResult, DUPLICATE_DNI, DUPLICATE_RECORD_NUMBER},
    models::{
        Area, AreaSummary, AreaView, Expediente, ExpedienteView, Role, User, UserSummary,
        UserView,
    },
    repository::{ExpedienteFilter, Repository, RepositoryState},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use uuid::Uuid;

/// The plain-text password of every seeded account.
pub const PASSWORD: &str = "secret123";

fn known_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        PasswordService::new()
            .hash_sync(PASSWORD)
            .expect("hashing the fixture password")
    })
    .clone()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("in-memory repository lock poisoned")
}

// --- IN-MEMORY REPOSITORY IMPLEMENTATION ---

/// InMemoryRepository
///
/// A `Repository` over hash maps. It enforces the same uniqueness-among-active
/// rules as the partial unique indexes, so lifecycle properties can be checked
/// without Postgres. Locks are always taken in the order users, areas, expedientes.
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<HashMap<Uuid, User>>,
    areas: Mutex<HashMap<Uuid, Area>>,
    expedientes: Mutex<HashMap<Uuid, Expediente>>,
}

impl InMemoryRepository {
    pub fn user_count(&self) -> usize {
        lock(&self.users).len()
    }

    pub fn raw_expediente(&self, id: Uuid) -> Option<Expediente> {
        lock(&self.expedientes).get(&id).cloned()
    }

    pub fn active_with_number(&self, number: &str) -> usize {
        lock(&self.expedientes)
            .values()
            .filter(|e| e.active && e.record_number == number)
            .count()
    }

    fn dni_taken(users: &HashMap<Uuid, User>, dni: &str, except: Uuid) -> bool {
        users
            .values()
            .any(|u| u.active && u.dni == dni && u.id != except)
    }

    fn number_taken(expedientes: &HashMap<Uuid, Expediente>, number: &str, except: Uuid) -> bool {
        expedientes
            .values()
            .any(|e| e.active && e.record_number == number && e.id != except)
    }

    fn user_view(areas: &HashMap<Uuid, Area>, user: &User) -> UserView {
        UserView {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            dni: user.dni.clone(),
            email: user.email.clone(),
            area: user
                .area_id
                .and_then(|id| areas.get(&id))
                .map(|a| AreaSummary {
                    id: a.id,
                    name: a.name.clone(),
                }),
            active: user.active,
            created_at: user.created_at,
        }
    }

    fn summary(users: &HashMap<Uuid, User>, id: Uuid) -> Option<UserSummary> {
        users.get(&id).map(|u| UserSummary {
            id: u.id,
            username: u.username.clone(),
        })
    }

    fn area_view(users: &HashMap<Uuid, User>, area: &Area) -> Option<AreaView> {
        Some(AreaView {
            id: area.id,
            name: area.name.clone(),
            moderator: area.moderator_id.and_then(|id| Self::summary(users, id)),
            created_by: Self::summary(users, area.created_by)?,
            active: area.active,
            created_at: area.created_at,
        })
    }

    fn expediente_view(
        users: &HashMap<Uuid, User>,
        areas: &HashMap<Uuid, Area>,
        e: &Expediente,
    ) -> Option<ExpedienteView> {
        let area = areas.get(&e.area_id)?;
        Some(ExpedienteView {
            id: e.id,
            title: e.title.clone(),
            description: e.description.clone(),
            record_number: e.record_number.clone(),
            box_label: e.box_label.clone(),
            year: e.year,
            area: AreaSummary {
                id: area.id,
                name: area.name.clone(),
            },
            created_by: Self::summary(users, e.created_by)?,
            updated_by: e.updated_by.and_then(|id| Self::summary(users, id)),
            created_at: e.created_at,
            updated_at: e.updated_at,
            active: e.active,
        })
    }
}

fn contains_ci(haystack: Option<&str>, needle: &Option<String>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack
            .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn find_active_user_by_dni(&self, dni: &str) -> AppResult<Option<User>> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.active && u.dni == dni)
            .cloned())
    }

    async fn get_user_view(&self, id: Uuid) -> AppResult<Option<UserView>> {
        let users = lock(&self.users);
        let areas = lock(&self.areas);
        Ok(users
            .get(&id)
            .map(|u| Self::user_view(&areas, u)))
    }

    async fn list_active_users(&self, area_id: Option<Uuid>) -> AppResult<Vec<UserView>> {
        let users = lock(&self.users);
        let areas = lock(&self.areas);
        let mut list: Vec<UserView> = users
            .values()
            .filter(|u| u.active)
            .filter(|u| area_id.is_none() || u.area_id == area_id)
            .map(|u| Self::user_view(&areas, u))
            .collect();
        list.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(list)
    }

    async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut users = lock(&self.users);
        let areas = lock(&self.areas);
        if user.active && Self::dni_taken(&users, &user.dni, user.id) {
            return Err(AppError::DuplicateKey(DUPLICATE_DNI.to_string()));
        }
        if let Some(area_id) = user.area_id {
            if !areas.contains_key(&area_id) {
                return Err(AppError::NotFound("referenced entity"));
            }
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let mut users = lock(&self.users);
        let stored = users.get_mut(&user.id).ok_or(AppError::NotFound("user"))?;
        stored.username = user.username;
        stored.password_hash = user.password_hash;
        stored.role = user.role;
        stored.area_id = user.area_id;
        stored.email = user.email;
        Ok(stored.clone())
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> AppResult<Option<User>> {
        let mut users = lock(&self.users);
        let Some(dni) = users.get(&id).map(|u| u.dni.clone()) else {
            return Ok(None);
        };
        if active && Self::dni_taken(&users, &dni, id) {
            return Err(AppError::DuplicateKey(DUPLICATE_DNI.to_string()));
        }
        Ok(users.get_mut(&id).map(|u| {
            u.active = active;
            u.clone()
        }))
    }

    async fn get_area(&self, id: Uuid) -> AppResult<Option<Area>> {
        Ok(lock(&self.areas).get(&id).cloned())
    }

    async fn get_area_view(&self, id: Uuid) -> AppResult<Option<AreaView>> {
        let users = lock(&self.users);
        let areas = lock(&self.areas);
        Ok(areas.get(&id).and_then(|a| Self::area_view(&users, a)))
    }

    async fn list_active_areas(&self) -> AppResult<Vec<AreaView>> {
        let users = lock(&self.users);
        let areas = lock(&self.areas);
        let mut list: Vec<AreaView> = areas
            .values()
            .filter(|a| a.active)
            .filter_map(|a| Self::area_view(&users, a))
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn insert_area(&self, area: Area) -> AppResult<Area> {
        let users = lock(&self.users);
        let mut areas = lock(&self.areas);
        if !users.contains_key(&area.created_by) {
            return Err(AppError::NotFound("referenced entity"));
        }
        areas.insert(area.id, area.clone());
        Ok(area)
    }

    async fn update_area(&self, area: Area) -> AppResult<Area> {
        let mut areas = lock(&self.areas);
        let stored = areas.get_mut(&area.id).ok_or(AppError::NotFound("area"))?;
        stored.name = area.name;
        stored.moderator_id = area.moderator_id;
        Ok(stored.clone())
    }

    async fn set_area_active(&self, id: Uuid, active: bool) -> AppResult<Option<Area>> {
        Ok(lock(&self.areas).get_mut(&id).map(|a| {
            a.active = active;
            a.clone()
        }))
    }

    async fn get_expediente(&self, id: Uuid) -> AppResult<Option<Expediente>> {
        Ok(lock(&self.expedientes).get(&id).cloned())
    }

    async fn get_expediente_view(&self, id: Uuid) -> AppResult<Option<ExpedienteView>> {
        let users = lock(&self.users);
        let areas = lock(&self.areas);
        let expedientes = lock(&self.expedientes);
        Ok(expedientes
            .get(&id)
            .and_then(|e| Self::expediente_view(&users, &areas, e)))
    }

    async fn active_record_number_holder(&self, record_number: &str) -> AppResult<Option<Uuid>> {
        Ok(lock(&self.expedientes)
            .values()
            .find(|e| e.active && e.record_number == record_number)
            .map(|e| e.id))
    }

    async fn search_expedientes(&self, filter: &ExpedienteFilter) -> AppResult<Vec<ExpedienteView>> {
        let users = lock(&self.users);
        let areas = lock(&self.areas);
        let expedientes = lock(&self.expedientes);
        let mut list: Vec<&Expediente> = expedientes
            .values()
            .filter(|e| filter.area_id.is_none_or(|a| e.area_id == a))
            .filter(|e| filter.active.is_none_or(|a| e.active == a))
            .filter(|e| filter.year.is_none_or(|y| e.year == y))
            .filter(|e| {
                filter
                    .record_number
                    .as_ref()
                    .is_none_or(|n| &e.record_number == n)
            })
            .filter(|e| contains_ci(Some(&e.title), &filter.title))
            .filter(|e| contains_ci(e.description.as_deref(), &filter.description))
            .filter(|e| contains_ci(Some(&e.box_label), &filter.box_label))
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list
            .into_iter()
            .filter_map(|e| Self::expediente_view(&users, &areas, e))
            .collect())
    }

    async fn insert_expediente(&self, expediente: Expediente) -> AppResult<Expediente> {
        let areas = lock(&self.areas);
        let mut expedientes = lock(&self.expedientes);
        if !areas.contains_key(&expediente.area_id) {
            return Err(AppError::NotFound("referenced entity"));
        }
        if expediente.active
            && Self::number_taken(&expedientes, &expediente.record_number, expediente.id)
        {
            return Err(AppError::DuplicateKey(DUPLICATE_RECORD_NUMBER.to_string()));
        }
        expedientes.insert(expediente.id, expediente.clone());
        Ok(expediente)
    }

    async fn update_expediente(&self, expediente: Expediente) -> AppResult<Expediente> {
        let mut expedientes = lock(&self.expedientes);
        let active = expedientes
            .get(&expediente.id)
            .map(|e| e.active)
            .ok_or(AppError::NotFound("expediente"))?;
        if active && Self::number_taken(&expedientes, &expediente.record_number, expediente.id) {
            return Err(AppError::DuplicateKey(DUPLICATE_RECORD_NUMBER.to_string()));
        }
        let stored = expedientes
            .get_mut(&expediente.id)
            .ok_or(AppError::NotFound("expediente"))?;
        stored.title = expediente.title;
        stored.description = expediente.description;
        stored.record_number = expediente.record_number;
        stored.box_label = expediente.box_label;
        stored.year = expediente.year;
        stored.area_id = expediente.area_id;
        stored.updated_by = expediente.updated_by;
        stored.updated_at = expediente.updated_at;
        Ok(stored.clone())
    }

    async fn set_expediente_active(&self, id: Uuid, active: bool) -> AppResult<Option<Expediente>> {
        let mut expedientes = lock(&self.expedientes);
        let Some(number) = expedientes.get(&id).map(|e| e.record_number.clone()) else {
            return Ok(None);
        };
        if active && Self::number_taken(&expedientes, &number, id) {
            return Err(AppError::DuplicateKey(DUPLICATE_RECORD_NUMBER.to_string()));
        }
        Ok(expedientes.get_mut(&id).map(|e| {
            e.active = active;
            e.clone()
        }))
    }
}

// --- FIXTURES ---

/// TestApp
///
/// An `AppState` wired to the in-memory repository and a recording mailer.
pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
    pub mailer: MockMailer,
}

pub fn test_app() -> TestApp {
    test_app_with_mailer(MockMailer::new())
}

pub fn test_app_with_mailer(mailer: MockMailer) -> TestApp {
    let repo = Arc::new(InMemoryRepository::default());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        mailer: Arc::new(mailer.clone()) as MailerState,
        passwords: PasswordService::new(),
        config: AppConfig::default(),
    };
    TestApp { state, repo, mailer }
}

pub fn actor(user: &User) -> Actor {
    Actor::from(user)
}

impl TestApp {
    pub async fn seed_user(&self, username: &str, role: Role, area_id: Option<Uuid>, dni: &str) -> User {
        self.repo
            .insert_user(User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password_hash: known_hash(),
                role,
                area_id,
                dni: dni.to_string(),
                email: None,
                active: true,
                created_at: Utc::now(),
            })
            .await
            .expect("seeding user")
    }

    pub async fn seed_admin(&self) -> User {
        self.seed_user("admin", Role::Admin, None, "10000000").await
    }

    pub async fn seed_area(&self, name: &str, created_by: &User) -> Area {
        self.repo
            .insert_area(Area {
                id: Uuid::new_v4(),
                name: name.to_string(),
                moderator_id: None,
                created_by: created_by.id,
                active: true,
                created_at: Utc::now(),
            })
            .await
            .expect("seeding area")
    }

    /// Seeds a record whose creation time is `age_minutes` in the past.
    pub async fn seed_expediente(
        &self,
        area: &Area,
        created_by: &User,
        number: &str,
        title: &str,
        age_minutes: i64,
    ) -> Expediente {
        self.repo
            .insert_expediente(Expediente {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: Some(format!("{title} description")),
                record_number: number.to_string(),
                box_label: "C-1".to_string(),
                year: 2024,
                area_id: area.id,
                created_by: created_by.id,
                updated_by: None,
                created_at: Utc::now() - Duration::minutes(age_minutes),
                updated_at: None,
                active: true,
            })
            .await
            .expect("seeding expediente")
    }

    pub fn token_for(&self, user: &User) -> String {
        auth::issue_token(user, &self.state.config.jwt_secret).expect("issuing token")
    }
}
