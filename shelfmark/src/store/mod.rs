//! User records and the stores that persist them.
//!
//! Two backends implement [`UserStore`]:
//!
//! - [`MongoUserStore`]: the `users` collection of a MongoDB database, with a unique
//!   index on `email`.
//! - [`MemoryUserStore`]: a `DashMap`-backed store for local runs and tests.
//!
//! Both enforce email uniqueness at insert time, so a duplicate that slips past the
//! handler's lookup still surfaces as [`StoreError::DuplicateEmail`].

mod memory;
mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryUserStore;
pub use mongo::MongoUserStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    /// bcrypt hash; never the plaintext.
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            name,
            email,
            password: password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait UserStore: std::fmt::Debug + Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    /// Persist a new user. Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn insert(&self, user: User) -> Result<User, StoreError>;
}
