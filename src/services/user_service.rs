use crate::domain::user::{Preferences, User, UserDocument, UserId, epoch_seconds};
use crate::error::{AppError, Result};
use crate::storage::UserRepository;
use opentelemetry::{global, metrics::Counter};
use serde_json::{Map, Value};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
struct Metrics {
    created_total: Counter<u64>,
    updated_total: Counter<u64>,
    deleted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("users-api");
        Self {
            created_total: meter
                .u64_counter("users_created_total")
                .with_description("Total users created through the API")
                .build(),
            updated_total: meter
                .u64_counter("users_updated_total")
                .with_description("Total successful partial updates")
                .build(),
            deleted_total: meter
                .u64_counter("users_deleted_total")
                .with_description("Total users deleted through the API")
                .build(),
        }
    }
}

#[derive(Debug)]
pub struct CreateUserParams {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
    pub timezone: String,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    metrics: Metrics,
}

impl UserService {
    #[must_use]
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo, metrics: Metrics::new() }
    }

    /// Lists every user in the collection.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err, skip(self), fields(count = tracing::field::Empty))]
    pub async fn list(&self) -> Result<Vec<UserDocument>> {
        let users = self.repo.find_all().await?;
        tracing::Span::current().record("count", users.len());
        Ok(users)
    }

    /// Fetches a single user.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no user has this identifier.
    #[tracing::instrument(err(level = "debug"), skip(self, id), fields(user_id = %id))]
    pub async fn get(&self, id: UserId) -> Result<UserDocument> {
        self.repo.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Creates a user; both timestamps are set to the current time.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(err, skip(self, params), fields(user_id = tracing::field::Empty))]
    pub async fn create(&self, params: CreateUserParams) -> Result<UserDocument> {
        let now = epoch_seconds(OffsetDateTime::now_utc());
        let mut user = User {
            id: None,
            username: params.username,
            password: params.password,
            roles: params.roles,
            preferences: Preferences { timezone: params.timezone },
            active: params.active,
            created_ts: now,
            updated_ts: now,
        };

        let id = self.repo.insert(&user).await?;
        tracing::Span::current().record("user_id", tracing::field::display(id));
        self.metrics.created_total.add(1, &[]);

        user.id = Some(id.as_object_id());
        Ok(UserDocument::from(user.to_document()?))
    }

    /// Applies a partial update: each supplied top-level field replaces the stored one.
    ///
    /// An empty update returns the current document.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the update targets `_id` or uses an operator key.
    /// Returns `AppError::NotFound` if no user has this identifier.
    #[tracing::instrument(err(level = "debug"), skip(self, id, changes), fields(user_id = %id, field_count = changes.len()))]
    pub async fn update(&self, id: UserId, changes: Map<String, Value>) -> Result<UserDocument> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        if changes.contains_key("_id") {
            return Err(AppError::BadRequest("User ID cannot be modified".into()));
        }
        if let Some(key) = changes.keys().find(|key| key.starts_with('$')) {
            return Err(AppError::BadRequest(format!("Invalid field name: {key}")));
        }

        let update = mongodb::bson::to_document(&changes)
            .map_err(|e| AppError::BadRequest(format!("Unsupported field value: {e}")))?;

        let user = self.repo.update_fields(id, update).await?.ok_or(AppError::NotFound)?;
        self.metrics.updated_total.add(1, &[]);
        Ok(user)
    }

    /// Deletes a single user.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no user has this identifier.
    #[tracing::instrument(err(level = "debug"), skip(self, id), fields(user_id = %id))]
    pub async fn delete(&self, id: UserId) -> Result<()> {
        if !self.repo.delete_by_id(id).await? {
            return Err(AppError::NotFound);
        }
        self.metrics.deleted_total.add(1, &[]);
        Ok(())
    }
}
