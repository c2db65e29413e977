use expedientes_api::{
    AppState,
    config::AppConfig,
    create_router, init_tracing, mailer,
    password::PasswordService,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;

/// main
///
/// Entry point: configuration, logging, database, mail and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging, selected by APP_ENV.
    init_tracing(&config.env);
    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // 4. Schema migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Outbound mail: Mailgun when configured, otherwise disabled.
    if config.mail.is_none() {
        tracing::warn!("MAILGUN_* not configured, welcome mails are disabled");
    }
    let mailer = mailer::from_config(config.mail.as_ref());

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState {
        repo,
        mailer,
        passwords: PasswordService::new(),
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("FATAL: HTTP server error.");

    tracing::info!("Server stopped");
}

/// Resolves on Ctrl-C so in-flight requests can finish before exit.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
