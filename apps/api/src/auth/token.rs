//! Bearer tokens: `base64url(id:username:issued_at_ms) "." hex(HMAC-SHA256(payload))`.
//!
//! Clients treat the string as opaque. The server can check it with [`verify`].

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: i64,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("signing key rejected: {0}")]
    InvalidKey(String),
}

fn mac(secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TokenError::InvalidKey(e.to_string()))
}

pub fn issue(
    secret: &str,
    user_id: i64,
    username: &str,
    issued_at: DateTime<Utc>,
) -> Result<String, TokenError> {
    let payload = format!("{user_id}:{username}:{}", issued_at.timestamp_millis());
    let mut mac = mac(secret)?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!(
        "{}.{signature}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes())
    ))
}

pub fn verify(secret: &str, token: &str) -> Result<TokenClaims, TokenError> {
    let (encoded, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
    let payload = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| TokenError::Malformed)?;
    let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

    let mut mac = mac(secret)?;
    mac.update(&payload);
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let payload = String::from_utf8(payload).map_err(|_| TokenError::Malformed)?;
    // usernames may contain ':', so split the id off the front and the instant off the back
    let (id, rest) = payload.split_once(':').ok_or(TokenError::Malformed)?;
    let (username, millis) = rest.rsplit_once(':').ok_or(TokenError::Malformed)?;

    let user_id = id.parse::<i64>().map_err(|_| TokenError::Malformed)?;
    let millis = millis.parse::<i64>().map_err(|_| TokenError::Malformed)?;
    let issued_at = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or(TokenError::Malformed)?;

    Ok(TokenClaims {
        user_id,
        username: username.to_string(),
        issued_at,
    })
}
