use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod mailer;
pub mod models;
pub mod password;
pub mod policy;
pub mod repository;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use auth::Actor;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use mailer::{DisabledMailer, MailerState, MailgunMailer, MockMailer};
pub use password::PasswordService;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::login, handlers::auth::verify, handlers::auth::me,
        handlers::users::create_user, handlers::users::list_users, handlers::users::get_user,
        handlers::users::get_user_by_dni, handlers::users::update_user,
        handlers::users::deactivate_user, handlers::users::reactivate_user,
        handlers::areas::create_area, handlers::areas::list_areas, handlers::areas::get_area,
        handlers::areas::update_area, handlers::areas::deactivate_area,
        handlers::areas::reactivate_area,
        handlers::expedientes::create_expediente, handlers::expedientes::list_expedientes,
        handlers::expedientes::search_expedientes,
        handlers::expedientes::list_expedientes_by_area,
        handlers::expedientes::get_expediente, handlers::expedientes::update_expediente,
        handlers::expedientes::deactivate_expediente,
        handlers::expedientes::reactivate_expediente,
    ),
    components(
        schemas(
            models::Role, models::AreaSummary, models::UserSummary, models::UserView,
            models::AreaView, models::ExpedienteView, models::LoginRequest,
            models::LoginResponse, models::VerifyResponse, models::MeResponse,
            models::CreateUserRequest, models::UpdateUserRequest, models::CreateAreaRequest,
            models::UpdateAreaRequest, models::CreateExpedienteRequest,
            models::UpdateExpedienteRequest, error::ErrorBody,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "expedientes-api", description = "Records management API")
    )
)]
pub struct ApiDoc;

/// Registers the raw `Authorization` header token as the `token` security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

/// AppState
///
/// The single, immutable container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait (Postgres, or in-memory in tests).
    pub repo: RepositoryState,
    /// Outbound mail for the welcome message.
    pub mailer: MailerState,
    /// Argon2 hashing, run on the blocking pool.
    pub passwords: PasswordService,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for PasswordService {
    fn from_ref(app_state: &AppState) -> PasswordService {
        app_state.passwords.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Extracting `Actor` verifies the token and
/// loads the active user; a failure rejects with 401 before any handler runs.
/// The resolved actor is cached in the request extensions so handlers do not
/// hit the repository a second time.
async fn auth_middleware(actor: Actor, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(actor);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, the authentication layer and the observability stack.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with method, uri and the generated `x-request-id`
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

/// init_tracing
///
/// Installs the global subscriber: pretty output locally, JSON in production.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(env: &config::Env) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "expedientes_api=debug,tower_http=info".into());

    match env {
        config::Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        config::Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}
