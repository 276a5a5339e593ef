//! # shelfmark
//!
//! Backend for a bookmark and media library: user accounts with cookie-based sessions
//! over a MongoDB document store.
//!
//! ## Architecture
//!
//! - **Store**: `users` collection behind the `UserStore` trait (MongoDB or in-memory)
//! - **Credentials**: bcrypt hashing and verification on the blocking pool
//! - **Sessions**: HS256 JWTs carried in an http-only `token` cookie, no server-side state
//! - **HTTP**: Axum router with rate limiting, request IDs, optional CORS and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod config;
mod credentials;
mod http;
mod session;
mod store;

use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli, StoreKind};
use crate::credentials::PasswordHasher;
use crate::http::{router, AppState};
use crate::session::SessionIssuer;
use crate::store::{MemoryUserStore, MongoUserStore, UserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        store = ?config.store,
        database = %config.database,
        session_ttl = %humantime::format_duration(config.session_ttl),
        cookie_secure = config.cookie_secure,
        cors_origin = ?config.frontend_origin,
        "configuration loaded"
    );

    let passwords =
        PasswordHasher::new(config.bcrypt_cost).context("invalid bcrypt cost")?;
    let sessions = SessionIssuer::new(
        &config.jwt_secret,
        config.session_ttl,
        config.cookie_secure,
    )
    .context("failed to initialize session issuer")?;
    let users = open_store(&config).await?;

    let state = AppState {
        users,
        passwords,
        sessions: Arc::new(sessions),
    };
    info!(bcrypt_cost = state.passwords.cost(), "credential service ready");

    let app = router(state, config.frontend_origin.clone());
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "shelfmark listening");

    serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown.await;
            info!("shutting down gracefully");
        })
        .await
        .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match config.store {
        StoreKind::Mongo => {
            let store = MongoUserStore::connect(&config.mongodb_uri, &config.database)
                .await
                .context("failed to connect to mongodb")?;
            store
                .init_indexes()
                .await
                .context("failed to create user indexes")?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            warn!("using in-memory user store; accounts are lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}
