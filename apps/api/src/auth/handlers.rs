//! Axum route handlers for the Auth API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::credentials::{
    authenticate, find_user, register, AuthResponse, CredentialError, LoginRequest,
    RegisterRequest,
};
use crate::auth::token;
use crate::errors::AppError;
use crate::state::AppState;

/// Body rejections (bad JSON, wrong content type, wrong field types) become
/// `InvalidInput` so auth callers always get the envelope back.
fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CredentialError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::debug!("Rejected auth request body: {rejection}");
            Err(CredentialError::InvalidInput(vec![rejection.body_text()]))
        }
    }
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, CredentialError> {
    let request = read_body(payload)?;
    let session = register(&state.db, &state.config.token_secret, &request).await?;
    Ok(Json(session.into_response_body("Registration successful")))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, CredentialError> {
    let request = read_body(payload)?;
    let session = authenticate(&state.db, &state.config.token_secret, &request).await?;
    Ok(Json(session.into_response_body("Login successful")))
}

/// POST /auth/logout
///
/// Tokens are not tracked server-side; the client discards its copy.
pub async fn handle_logout() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": "Logout successful" }))
}

/// GET /auth/user/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    match find_user(&state.db, user_id).await? {
        Some(user) => Ok(Json(user).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(AuthResponse::failure("User not found")),
        )
            .into_response()),
    }
}

/// GET /auth/validate
///
/// Checks the signature of an `Authorization: Bearer <token>` header.
pub async fn handle_validate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(bearer) = bearer else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(AuthResponse::failure("Missing bearer token")),
        )
            .into_response();
    };

    match token::verify(&state.config.token_secret, bearer) {
        Ok(claims) => Json(json!({
            "success": true,
            "message": "Token is valid",
            "user_id": claims.user_id,
            "username": claims.username,
            "issued_at": claims.issued_at,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("Rejected bearer token: {e}");
            (
                StatusCode::UNAUTHORIZED,
                Json(AuthResponse::failure("Token is invalid")),
            )
                .into_response()
        }
    }
}
