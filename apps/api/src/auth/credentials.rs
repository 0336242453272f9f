use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::auth::token;
use crate::models::user::User;

/// Application-wide salt appended to every password before hashing.
/// Single-round and non-adaptive: see DESIGN.md before relying on it.
const PASSWORD_SALT: &str = "SkillSync_Salt";

const MIN_USERNAME_CHARS: usize = 3;
const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid input data: {}", .0.join(", "))]
    InvalidInput(Vec<String>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] token::TokenError),
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "confirmPassword")]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Envelope shared by every auth endpoint, success or failure.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user: None,
            token: None,
        }
    }
}

/// An authenticated identity plus a freshly issued bearer token.
#[derive(Debug)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl AuthSession {
    fn new(user: User, token_secret: &str) -> Result<Self, CredentialError> {
        let token = token::issue(token_secret, user.id, &user.username, Utc::now())?;
        Ok(Self { user, token })
    }

    pub fn into_response_body(self, message: &str) -> AuthResponse {
        AuthResponse {
            success: true,
            message: message.to_string(),
            user: Some(self.user),
            token: Some(self.token),
        }
    }
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CredentialError::UsernameTaken
            | CredentialError::EmailTaken
            | CredentialError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            CredentialError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            CredentialError::Database(e) => {
                tracing::error!("Credential store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication is temporarily unavailable".to_string(),
                )
            }
            CredentialError::Token(e) => {
                tracing::error!("Token issuance failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication is temporarily unavailable".to_string(),
                )
            }
        };
        (status, Json(AuthResponse::failure(message))).into_response()
    }
}

/// base64(SHA-256(password ‖ salt)).
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(PASSWORD_SALT.as_bytes());
    STANDARD.encode(hasher.finalize())
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

/// Field rules for registration. Every violation is reported, not just the first.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), CredentialError> {
    let mut problems = Vec::new();
    if req.username.trim().chars().count() < MIN_USERNAME_CHARS {
        problems.push(format!(
            "Username must be at least {MIN_USERNAME_CHARS} characters"
        ));
    }
    if !is_well_formed_email(&req.email) {
        problems.push("Please enter a valid email address".to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        problems.push(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        ));
    }
    if req.password != req.confirm_password {
        problems.push("Passwords do not match".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CredentialError::InvalidInput(problems))
    }
}

/// One `@`, a non-empty local part, a dotted domain, no whitespace.
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Registers a new identity. Username and email must both be unused (exact match).
pub async fn register(
    pool: &SqlitePool,
    token_secret: &str,
    req: &RegisterRequest,
) -> Result<AuthSession, CredentialError> {
    validate_registration(req)?;

    let username_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(&req.username)
            .fetch_one(pool)
            .await?;
    if username_taken {
        return Err(CredentialError::UsernameTaken);
    }

    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(&req.email)
            .fetch_one(pool)
            .await?;
    if email_taken {
        return Err(CredentialError::EmailTaken);
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, username, email, password_hash, created_at
        "#,
    )
    .bind(&req.username)
    .bind(&req.email)
    .bind(hash_password(&req.password))
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(map_unique_violation)?;

    tracing::info!("Registered user {} (id {})", user.username, user.id);
    AuthSession::new(user, token_secret)
}

/// A concurrent registration can slip past the existence checks; the unique
/// indexes still catch it.
fn map_unique_violation(err: sqlx::Error) -> CredentialError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return if db_err.message().contains("users.username") {
                CredentialError::UsernameTaken
            } else {
                CredentialError::EmailTaken
            };
        }
    }
    CredentialError::Database(err)
}

pub async fn authenticate(
    pool: &SqlitePool,
    token_secret: &str,
    req: &LoginRequest,
) -> Result<AuthSession, CredentialError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(CredentialError::InvalidInput(vec![
            "Username and password are required".to_string(),
        ]));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
    )
    .bind(&req.username)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => {
            AuthSession::new(user, token_secret)
        }
        _ => {
            tracing::warn!("Failed login attempt for username '{}'", req.username);
            Err(CredentialError::InvalidCredentials)
        }
    }
}

pub async fn find_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
