use crate::error::AppError;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Store-assigned identifier of a user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(ObjectId);

impl UserId {
    #[must_use]
    pub const fn new(id: ObjectId) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl FromStr for UserId {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(raw).map(Self).map_err(|_| AppError::InvalidUserId)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
    Tester,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Tester => "tester",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub timezone: String,
}

/// The stored shape of a user, as written by the create endpoint and the import job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
    pub preferences: Preferences,
    pub active: bool,
    pub created_ts: f64,
    pub updated_ts: f64,
}

impl User {
    /// Converts the user into a BSON document ready for insertion.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if serialization fails.
    pub fn to_document(&self) -> Result<Document, AppError> {
        mongodb::bson::to_document(self).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize user document");
            AppError::Internal
        })
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn epoch_seconds(at: OffsetDateTime) -> f64 {
    at.unix_timestamp_nanos() as f64 / 1_000_000_000.0
}

/// A user document as read back from the store.
///
/// Partial updates may add or retype arbitrary fields, so reads are not
/// forced into [`User`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserDocument(Document);

impl UserDocument {
    #[must_use]
    pub fn id(&self) -> Option<UserId> {
        self.0.get_object_id("_id").ok().map(UserId)
    }

    /// Renders the document as JSON with `_id` as a plain hex string.
    #[must_use]
    pub fn into_json(mut self) -> serde_json::Value {
        if let Ok(id) = self.0.get_object_id("_id") {
            self.0.insert("_id", id.to_hex());
        }
        Bson::Document(self.0).into_relaxed_extjson()
    }
}

impl From<Document> for UserDocument {
    fn from(doc: Document) -> Self {
        Self(doc)
    }
}
