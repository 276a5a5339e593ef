use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::User;

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What callers get to see of a [`User`]. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct DataEnvelope {
    pub success: bool,
    pub message: String,
    pub data: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type SessionResponse = (StatusCode, CookieJar, Json<UserEnvelope>);

/// Mint a session for `user`, set it as the `token` cookie and answer with the user envelope.
pub fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
    status: StatusCode,
    message: String,
    failure: &'static str,
) -> Result<SessionResponse, ApiError> {
    let token = state
        .sessions
        .mint(&user.id)
        .map_err(ApiError::internal(failure))?;
    let jar = jar.add(state.sessions.cookie(token));
    Ok((
        status,
        jar,
        Json(UserEnvelope {
            success: true,
            message,
            user: user.into(),
        }),
    ))
}
