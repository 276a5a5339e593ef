use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::oid::ObjectId;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::GlobalKeyExtractor,
    GovernorError, GovernorLayer,
};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::credentials::MAX_PASSWORD_BYTES;
use crate::store::{StoreError, User};

use super::auth::CurrentUser;
use super::error::ApiError;
use super::responses::{
    issue_session, DataEnvelope, ErrorEnvelope, HealthResponse, HomeResponse, LoginRequest,
    MessageEnvelope, RegisterRequest, SessionResponse, UserEnvelope,
};
use super::state::AppState;

const REGISTER_FAILED: &str = "Internal Server Error during registration";
const LOGIN_FAILED: &str = "Internal Server Error during login";
const LOOKUP_FAILED: &str = "Error fetching user by ID";

const USER_EXISTS: &str = "User already exists";
const USER_NOT_FOUND: &str = "Invalid ID, user does not exist";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router. `cors_origin` enables credentialed CORS for one frontend.
pub fn router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(50)
            .burst_size(50)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .expect("default governor config is valid"),
    );

    let api = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/user/{id}", get(user_by_id))
        .fallback(api_not_found)
        .method_not_allowed_fallback(api_method_not_allowed);

    let mut app = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .nest("/api", api)
        .layer(GovernorLayer::new(governor_conf).error_handler(rate_limited))
        .layer(tower_http::request_id::PropagateRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
        ))
        .layer(tower_http::request_id::SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            tower_http::request_id::MakeRequestUuid::default(),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    if let Some(origin) = cors_origin {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(true),
        );
    }

    app.with_state(state)
}

/// Answer governor rejections with the error envelope, keeping its rate-limit headers.
fn rate_limited(err: GovernorError) -> Response {
    let (status, headers) = match &err {
        GovernorError::TooManyRequests { headers, .. } => {
            (StatusCode::TOO_MANY_REQUESTS, headers.clone())
        }
        GovernorError::UnableToExtractKey => (StatusCode::INTERNAL_SERVER_ERROR, None),
        GovernorError::Other { code, headers, .. } => (*code, headers.clone()),
    };
    warn!(status = %status, error = %err, "request rejected by rate limiter");

    let body = ErrorEnvelope {
        success: false,
        message: err.to_string(),
        error: None,
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}

async fn api_not_found() -> ApiError {
    ApiError::NotFound("Route not found")
}

async fn api_method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed")
}

async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Welcome to home route",
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<SessionResponse, ApiError> {
    let Json(request) = body?;
    let name = request.name.trim();
    let email = request.email.trim();
    if name.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(String::from(
            "Name, email and password are required",
        )));
    }
    if request.password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    let existing = state
        .users
        .find_by_email(email)
        .await
        .map_err(ApiError::internal(REGISTER_FAILED))?;
    if existing.is_some() {
        debug!(email = %email, "registration rejected: email taken");
        return Err(ApiError::Conflict(USER_EXISTS));
    }

    let password_hash = state
        .passwords
        .hash(request.password)
        .await
        .map_err(ApiError::internal(REGISTER_FAILED))?;

    let user = match state
        .users
        .insert(User::new(name.to_string(), email.to_string(), password_hash))
        .await
    {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail(_)) => {
            debug!(email = %email, "registration rejected: email taken on insert");
            return Err(ApiError::Conflict(USER_EXISTS));
        }
        Err(err) => return Err(ApiError::internal(REGISTER_FAILED)(err)),
    };

    info!(user_id = %user.id, "user registered");
    issue_session(
        &state,
        jar,
        user,
        StatusCode::CREATED,
        String::from("User Registered Successfully and Logged in"),
        REGISTER_FAILED,
    )
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<SessionResponse, ApiError> {
    let Json(request) = body?;
    let email = request.email.trim();

    let Some(user) = state
        .users
        .find_by_email(email)
        .await
        .map_err(ApiError::internal(LOGIN_FAILED))?
    else {
        debug!(email = %email, "login rejected: unknown email");
        return Err(ApiError::BadRequest(String::from("Email does not exist")));
    };

    let matched = state
        .passwords
        .verify(request.password, user.password.clone())
        .await
        .map_err(ApiError::internal(LOGIN_FAILED))?;
    if !matched {
        warn!(user_id = %user.id, "login rejected: wrong password");
        return Err(ApiError::BadRequest(String::from(
            "Invalid Credentials or Wrong Password",
        )));
    }

    info!(user_id = %user.id, "user logged in");
    let message = format!("Welcome {}", user.name);
    issue_session(&state, jar, user, StatusCode::OK, message, LOGIN_FAILED)
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (StatusCode, CookieJar, Json<MessageEnvelope>) {
    debug!("session cleared");
    (
        StatusCode::OK,
        jar.add(state.sessions.cleared_cookie()),
        Json(MessageEnvelope {
            success: true,
            message: String::from("Logout successfully"),
        }),
    )
}

async fn profile(CurrentUser(user): CurrentUser) -> Json<UserEnvelope> {
    debug!(user_id = %user.id, "profile requested");
    Json(UserEnvelope {
        success: true,
        message: String::from("User profile fetched successfully"),
        user: user.into(),
    })
}

async fn user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataEnvelope>, ApiError> {
    // a malformed id cannot match any user
    let id = ObjectId::parse_str(&id).map_err(|_| ApiError::NotFound(USER_NOT_FOUND))?;

    let user = state
        .users
        .find_by_id(&id)
        .await
        .map_err(ApiError::internal(LOOKUP_FAILED))?
        .ok_or(ApiError::NotFound(USER_NOT_FOUND))?;

    debug!(user_id = %user.id, "user fetched by id");
    Ok(Json(DataEnvelope {
        success: true,
        message: String::from("User data fetched successfully"),
        data: user.into(),
    }))
}
