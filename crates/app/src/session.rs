use std::time::Duration;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "domdash_session";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Authenticated user attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates signed session cookies.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
    secure_cookie: bool,
}

impl SessionManager {
    pub fn new(secret: &[u8], ttl: Duration, secure_cookie: bool) -> Self {
        // Expiry is checked against the application clock instead.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            secure_cookie,
        }
    }

    /// Signs a new session token for `username`.
    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: username.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(SessionError::Encode)
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| SessionError::Invalid(err.to_string()))?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(SessionError::Expired);
        }
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| SessionError::Invalid("exp_out_of_range".to_string()))?;

        Ok(Session {
            username: claims.sub,
            expires_at,
        })
    }

    /// Resolves the session carried by the request cookies, if any.
    pub fn from_headers(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Option<Session> {
        let token = cookie_value(headers, SESSION_COOKIE)?;
        match self.validate(token, now) {
            Ok(session) => Some(session),
            Err(err) => {
                debug!(stage = "auth", error = %err, "ignoring session cookie");
                None
            }
        }
    }

    /// `Set-Cookie` value storing `token`.
    pub fn cookie(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.ttl_secs,
            self.secure_suffix()
        )
    }

    /// `Set-Cookie` value removing the session.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.secure_suffix()
        )
    }

    fn secure_suffix(&self) -> &'static str {
        if self.secure_cookie {
            "; Secure"
        } else {
            ""
        }
    }
}

/// Returns the value of cookie `name` from the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("invalid session token: {0}")]
    Invalid(String),
    #[error("session expired")]
    Expired,
}
