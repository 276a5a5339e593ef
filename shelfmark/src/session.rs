//! Signed session tokens and the `token` cookie that carries them.
//!
//! A session is an HS256 JWT holding the user id (`sub`) and an expiry. Nothing is stored
//! server side: a session is active while the cookie holds a token that [`SessionIssuer::decode`]
//! accepts, and absent once logout overwrites the cookie or the token expires.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SESSION_COOKIE: &str = "token";

const MIN_SECRET_LEN: usize = 32;
const EXPIRY_LEEWAY_SECONDS: u64 = 5;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret is too short (min {MIN_SECRET_LEN} bytes)")]
    SecretTooShort,
    #[error("session lifetime {0:?} is out of range")]
    InvalidTtl(Duration),
    #[error("failed to sign session token: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("session token is expired")]
    Expired,
    #[error("session token is invalid: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("session token subject is not a user id")]
    InvalidSubject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<ObjectId, SessionError> {
        ObjectId::parse_str(&self.sub).map_err(|_| SessionError::InvalidSubject)
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
    secure: bool,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    pub fn new(secret: &str, ttl: Duration, secure: bool) -> Result<Self, SessionError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::SecretTooShort);
        }
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| SessionError::InvalidTtl(ttl))?;
        if ttl <= chrono::Duration::zero() {
            return Err(SessionError::InvalidTtl(Duration::ZERO));
        }

        let mut validation = Validation::default();
        validation.leeway = EXPIRY_LEEWAY_SECONDS;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
            secure,
        })
    }

    pub fn mint(&self, user_id: &ObjectId) -> Result<String, SessionError> {
        self.mint_at(user_id, Utc::now())
    }

    fn mint_at(&self, user_id: &ObjectId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: user_id.to_hex(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(SessionError::Encode)
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(err),
            })
    }

    /// The http-only cookie carrying `token`, expiring with it.
    pub fn cookie(&self, token: String) -> Cookie<'static> {
        let expires = OffsetDateTime::now_utc() + CookieDuration::seconds(self.ttl.num_seconds());
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .expires(expires)
            .build()
    }

    /// Overwrites the session cookie with an empty value that has already expired.
    pub fn cleared_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .expires(OffsetDateTime::now_utc() - CookieDuration::seconds(1))
            .build()
    }
}
