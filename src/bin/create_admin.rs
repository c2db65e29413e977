use chrono::Utc;
use expedientes_api::{
    config::AppConfig,
    init_tracing,
    models::{Role, User},
    password::PasswordService,
    repository::{PostgresRepository, Repository},
};
use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

/// create_admin
///
/// Seeds the first administrator account. Reads `ADMIN_USERNAME`,
/// `ADMIN_PASSWORD`, `ADMIN_DNI` and the optional `ADMIN_EMAIL`, and does nothing
/// when an active account already holds that DNI.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;
    init_tracing(&config.env);

    let username = required_var("ADMIN_USERNAME")?;
    let password = required_var("ADMIN_PASSWORD")?;
    let dni = required_var("ADMIN_DNI")?;
    let email = env::var("ADMIN_EMAIL").ok().filter(|e| !e.trim().is_empty());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let repo = PostgresRepository::new(pool);

    if let Some(existing) = repo.find_active_user_by_dni(&dni).await? {
        tracing::info!(user_id = %existing.id, "an active account with this DNI already exists, nothing to do");
        return Ok(());
    }

    let password_hash = PasswordService::new().hash(&password).await?;
    let admin = repo
        .insert_user(User {
            id: Uuid::new_v4(),
            username,
            password_hash,
            role: Role::Admin,
            area_id: None,
            dni,
            email,
            active: true,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(user_id = %admin.id, "admin account created");
    Ok(())
}

fn required_var(name: &'static str) -> Result<String, String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| format!("missing required environment variable: {name}"))
}
