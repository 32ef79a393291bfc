use crate::domain::user::{User, UserDocument, UserId};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, Database};
use std::fmt::Debug;

/// Collection-scoped access to user documents.
#[async_trait]
pub trait UserRepository: Debug + Send + Sync {
    /// Returns every document in store order.
    async fn find_all(&self) -> Result<Vec<UserDocument>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>>;

    /// Inserts a single user and returns the identifier assigned by the store.
    async fn insert(&self, user: &User) -> Result<UserId>;

    /// Shallow-merges `fields` into the document and returns it as it reads after the update.
    async fn update_fields(&self, id: UserId, fields: Document) -> Result<Option<UserDocument>>;

    /// Returns `false` if no document matched.
    async fn delete_by_id(&self, id: UserId) -> Result<bool>;

    /// Removes every document in the collection, returning how many were deleted.
    async fn delete_all(&self) -> Result<u64>;

    /// Inserts all users in one batch, returning how many were inserted.
    async fn insert_many(&self, users: &[User]) -> Result<usize>;

    async fn ping(&self) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct MongoUserRepository {
    db: Database,
    users: Collection<Document>,
}

impl MongoUserRepository {
    #[must_use]
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        let db = client.database(database);
        let users = db.collection(collection);
        Self { db, users }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn find_all(&self) -> Result<Vec<UserDocument>> {
        let cursor = self.users.find(doc! {}).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(UserDocument::from).collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>> {
        let doc = self.users.find_one(doc! { "_id": id.as_object_id() }).await?;
        Ok(doc.map(UserDocument::from))
    }

    async fn insert(&self, user: &User) -> Result<UserId> {
        let result = self.users.insert_one(user.to_document()?).await?;
        result.inserted_id.as_object_id().map(UserId::new).ok_or_else(|| {
            tracing::error!(inserted_id = %result.inserted_id, "Store returned a non-ObjectId identifier");
            AppError::Internal
        })
    }

    async fn update_fields(&self, id: UserId, fields: Document) -> Result<Option<UserDocument>> {
        let doc = self
            .users
            .find_one_and_update(doc! { "_id": id.as_object_id() }, doc! { "$set": fields })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(doc.map(UserDocument::from))
    }

    async fn delete_by_id(&self, id: UserId) -> Result<bool> {
        let result = self.users.delete_one(doc! { "_id": id.as_object_id() }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = self.users.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }

    async fn insert_many(&self, users: &[User]) -> Result<usize> {
        let docs = users.iter().map(User::to_document).collect::<Result<Vec<_>>>()?;
        let result = self.users.insert_many(docs).await?;
        Ok(result.inserted_ids.len())
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
