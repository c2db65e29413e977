use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{LoginRequest, LoginResponse, Role, User},
    password::PasswordService,
    repository::{Repository, RepositoryState},
};

/// Lifetime of an issued session token.
pub const TOKEN_TTL_HOURS: i64 = 6;

/// Claims
///
/// The payload signed into every session token. The server keeps no session
/// state; a token is valid until `exp` as long as its subject stays active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Role at issuance. Informational only: authorization always uses the
    /// role stored in the database at request time.
    pub role: Role,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
}

/// Actor
///
/// The authenticated identity behind a request. It is the explicit context
/// object threaded into every policy decision and lifecycle operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub area_id: Option<Uuid>,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            area_id: user.area_id,
        }
    }
}

/// issue_token
///
/// Signs an HS256 token for `user` that expires after [`TOKEN_TTL_HOURS`].
pub fn issue_token(user: &User, secret: &str) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// decode_token
///
/// Validates signature and expiry. Every failure kind collapses to `InvalidToken`.
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("token rejected: {:?}", e.kind());
        AppError::InvalidToken
    })
}

/// authenticate
///
/// Resolves a presented token to a currently active user. A deleted or
/// deactivated subject invalidates an otherwise well-formed token.
pub async fn authenticate(repo: &dyn Repository, secret: &str, token: &str) -> AppResult<Actor> {
    let claims = decode_token(token, secret)?;

    match repo.get_user(claims.sub).await? {
        Some(user) if user.active => Ok(Actor::from(&user)),
        _ => Err(AppError::InvalidToken),
    }
}

/// login
///
/// Credential login by DNI. Only active users can log in. A missing user and a
/// wrong password both yield `InvalidCredentials`, so the response never reveals
/// which one happened.
pub async fn login(
    repo: &dyn Repository,
    passwords: &PasswordService,
    secret: &str,
    req: LoginRequest,
) -> AppResult<LoginResponse> {
    let dni = req.dni.trim();
    if dni.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("dni and password are required"));
    }

    let Some(user) = repo.find_active_user_by_dni(dni).await? else {
        passwords.verify_absent(&req.password).await?;
        tracing::warn!("login failed: no active account for the presented DNI");
        return Err(AppError::InvalidCredentials);
    };

    if !passwords.verify(&req.password, &user.password_hash).await? {
        tracing::warn!(user_id = %user.id, "login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&user, secret)?;
    let usuario = repo
        .get_user_view(user.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok(LoginResponse { usuario, token })
}

/// Extracts the token from the `Authorization` header. The raw token is the
/// canonical form; a `Bearer ` prefix is tolerated and stripped.
pub fn token_from_parts(parts: &Parts) -> Option<&str> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Actor Extractor Implementation
///
/// Makes `Actor` usable as a handler argument. When the authentication middleware
/// already resolved the actor it is taken from the request extensions; otherwise
/// the token is verified and its subject loaded from the repository.
///
/// Rejection: `AppError::InvalidToken` (401) on any failure.
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = token_from_parts(parts).ok_or(AppError::InvalidToken)?;
        authenticate(repo.as_ref(), &config.jwt_secret, token).await
    }
}
