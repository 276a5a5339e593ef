use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::session::{SessionError, SESSION_COOKIE};
use crate::store::User;

use super::error::ApiError;
use super::state::AppState;

const LOGIN_REQUIRED: &str = "Please login first";

/// The user behind a valid session cookie. Rejects with 401 when there is none.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized(LOGIN_REQUIRED))?;

        let claims = state.sessions.decode(token).map_err(|err| {
            match err {
                SessionError::Expired => debug!("session token expired"),
                other => warn!(error = %other, "rejected session token"),
            }
            ApiError::Unauthorized(LOGIN_REQUIRED)
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized(LOGIN_REQUIRED))?;

        let user = state
            .users
            .find_by_id(&user_id)
            .await
            .map_err(ApiError::internal("Error fetching profile"))?
            .ok_or(ApiError::Unauthorized(LOGIN_REQUIRED))?;

        debug!(user_id = %user.id, "authorized request using session");
        Ok(CurrentUser(user))
    }
}
