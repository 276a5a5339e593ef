use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::info;

use super::{StoreError, User, UserStore};

const USERS_COLLECTION: &str = "users";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl std::fmt::Debug for MongoUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoUserStore")
            .field("collection", &self.users.name())
            .finish_non_exhaustive()
    }
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(USERS_COLLECTION),
        }
    }

    /// Connect, ping the server and return a store over `database`.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        info!(database, "connected to mongodb");
        Ok(Self::new(&db))
    }

    pub async fn init_indexes(&self) -> Result<(), StoreError> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.users.create_index(email_index).await?;
        info!(collection = USERS_COLLECTION, "user indexes ready");
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        match self.users.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::DuplicateEmail(user.email)),
            Err(err) => Err(err.into()),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use mongodb::bson::{doc, from_document};
    use mongodb::error::{Error, ErrorKind, WriteError, WriteFailure};

    use super::{is_duplicate_key, MongoUserStore};

    fn write_error(code: i32) -> Error {
        let write_error: WriteError = from_document(doc! {
            "code": code,
            "codeName": "DuplicateKey",
            "errmsg": "E11000 duplicate key error collection: shelfmark.users index: email_1",
        })
        .unwrap();
        Error::from(ErrorKind::Write(WriteFailure::WriteError(write_error)))
    }

    #[test]
    fn duplicate_key_write_error_is_recognized() {
        assert!(is_duplicate_key(&write_error(11000)));
    }

    #[test]
    fn other_failures_are_not_duplicates() {
        assert!(!is_duplicate_key(&write_error(121)));
        let io = Error::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        assert!(!is_duplicate_key(&io));
    }

    #[tokio::test]
    async fn connect_rejects_malformed_uri() {
        let result = MongoUserStore::connect("not-a-mongodb-uri", "shelfmark").await;
        assert!(result.is_err());
    }
}
