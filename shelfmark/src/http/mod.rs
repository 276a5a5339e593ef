//! HTTP layer: Axum router, handlers, and the JSON envelopes they answer with.
//!
//! Exposes the account endpoints under `/api` (`/register`, `/login`, `/logout`,
//! `/profile`, `/user/{id}`) plus `/` and `/health`.

mod auth;
mod error;
mod handlers;
mod responses;
mod state;


pub use handlers::router;
pub use state::AppState;
