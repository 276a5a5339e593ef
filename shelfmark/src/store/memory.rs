use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;

use super::{StoreError, User, UserStore};

/// Users keyed by id, plus an email -> id index that owns the uniqueness check.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<ObjectId, User>>,
    emails: Arc<DashMap<String, ObjectId>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(user.email)),
            Entry::Vacant(slot) => {
                // user lands before the index entry so a visible email always resolves
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::MemoryUserStore;
    use crate::store::{StoreError, User, UserStore};

    fn user(email: &str) -> User {
        User::new(
            String::from("Ada"),
            String::from(email),
            String::from("$2b$04$hash"),
        )
    }

    #[tokio::test]
    async fn insert_then_find_by_email_and_id() -> Result<()> {
        let store = MemoryUserStore::new();
        let created = store.insert(user("ada@example.com")).await?;

        let by_email = store.find_by_email("ada@example.com").await?.unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = store.find_by_id(&created.id).await?.unwrap();
        assert_eq!(by_id.email, "ada@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() -> Result<()> {
        let store = MemoryUserStore::new();
        store.insert(user("ada@example.com")).await?;

        let second = store.insert(user("ada@example.com")).await;
        assert!(matches!(second, Err(StoreError::DuplicateEmail(_))));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_inserts_with_same_email_admit_one() {
        let store = MemoryUserStore::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(user("race@example.com")).await.is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_lookups_return_none() -> Result<()> {
        let store = MemoryUserStore::new();
        assert!(store.find_by_email("nobody@example.com").await?.is_none());
        assert!(store
            .find_by_id(&mongodb::bson::oid::ObjectId::new())
            .await?
            .is_none());
        Ok(())
    }
}
