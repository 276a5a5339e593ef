use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderValue;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use thiserror::Error;

use crate::credentials::DEFAULT_BCRYPT_COST;

const DEFAULT_SESSION_TTL: &str = "7d";

#[derive(Debug, Parser)]
#[command(
    name = "shelfmark",
    version,
    about = "Bookmark and media backend with cookie-session accounts"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    #[arg(long, value_name = "URI")]
    pub mongodb_uri: Option<String>,

    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Session lifetime, e.g. `7d` or `12h`.
    #[arg(long, value_name = "DURATION")]
    pub session_ttl: Option<String>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mongo,
    Memory,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub store: StoreKind,
    pub mongodb_uri: String,
    pub database: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub frontend_origin: Option<HeaderValue>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind", &self.bind)
            .field("store", &self.store)
            .field("database", &self.database)
            .field("session_ttl", &self.session_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("frontend_origin", &self.frontend_origin)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid boolean value for env var {key}: {value}")]
    InvalidEnvBool { key: String, value: String },
    #[error("env var {key} is not valid unicode")]
    NonUnicodeEnv { key: String },
    #[error("no session secret configured; set JWT_SECRET or jwt_secret in the config file")]
    MissingSecret,
    #[error("invalid session ttl {value}: {source}")]
    InvalidDuration {
        value: String,
        source: humantime::DurationError,
    },
    #[error("invalid frontend origin {value}")]
    InvalidOrigin { value: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    store: Option<StoreKind>,
    mongodb_uri: Option<String>,
    database: Option<String>,
    jwt_secret: Option<String>,
    session_ttl: Option<String>,
    cookie_secure: Option<bool>,
    bcrypt_cost: Option<u32>,
    frontend_url: Option<String>,
}

/// Values read from the process environment.
#[derive(Debug, Default)]
struct EnvConfig {
    mongodb_uri: Option<String>,
    jwt_secret: Option<String>,
    cookie_secure: Option<bool>,
    frontend_url: Option<String>,
}

impl EnvConfig {
    fn read() -> Result<Self, ConfigError> {
        Ok(Self {
            mongodb_uri: read_env_string("MONGODB_URI")?,
            jwt_secret: read_env_string("JWT_SECRET")?,
            cookie_secure: read_env_bool("SHELFMARK_COOKIE_SECURE")?,
            frontend_url: read_env_string("FRONTEND_URL")?,
        })
    }
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;
        let from_env = EnvConfig::read()?;
        Self::resolve(cli, from_env, from_file)
    }

    /// Precedence: CLI, then environment, then config file, then defaults.
    fn resolve(cli: Cli, env: EnvConfig, file: FileConfig) -> Result<Self, ConfigError> {
        let bind = cli
            .bind
            .or(file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 4000)));
        let store = cli.store.or(file.store).unwrap_or(StoreKind::Mongo);
        let mongodb_uri = cli
            .mongodb_uri
            .or(env.mongodb_uri)
            .or(file.mongodb_uri)
            .unwrap_or_else(|| String::from("mongodb://localhost:27017"));
        let database = cli
            .database
            .or(file.database)
            .unwrap_or_else(|| String::from("shelfmark"));
        let jwt_secret = env
            .jwt_secret
            .or(file.jwt_secret)
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        let session_ttl = cli
            .session_ttl
            .or(file.session_ttl)
            .unwrap_or_else(|| String::from(DEFAULT_SESSION_TTL));
        let session_ttl = humantime::parse_duration(&session_ttl).map_err(|source| {
            ConfigError::InvalidDuration {
                value: session_ttl.clone(),
                source,
            }
        })?;
        let cookie_secure = env.cookie_secure.or(file.cookie_secure).unwrap_or(false);
        let bcrypt_cost = file.bcrypt_cost.unwrap_or(DEFAULT_BCRYPT_COST);
        let frontend_origin = env
            .frontend_url
            .or(file.frontend_url)
            .map(|url| parse_origin(&url))
            .transpose()?;

        Ok(Self {
            bind,
            store,
            mongodb_uri,
            database,
            jwt_secret,
            session_ttl,
            cookie_secure,
            bcrypt_cost,
            frontend_origin,
        })
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse_origin(raw: &str) -> Result<HeaderValue, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidOrigin {
            value: String::from(raw),
        });
    }
    HeaderValue::from_str(trimmed).map_err(|_| ConfigError::InvalidOrigin {
        value: String::from(raw),
    })
}

fn read_env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicodeEnv {
            key: String::from(key),
        }),
    }
}

fn read_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_bool_value(key, &value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from("<non-unicode>"),
        }),
    }
}

fn parse_bool_value(key: &str, raw: &str) -> Result<bool, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from(raw),
        }),
    }
}
