use crate::domain::fixture::{Fixture, FixtureUser};
use crate::domain::user::{Preferences, Role, User, epoch_seconds};
use crate::error::ImportError;
use crate::storage::UserRepository;
use std::path::Path;
use std::sync::Arc;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub cleared: u64,
    pub imported: usize,
}

/// Destructive reload of the users collection from a fixture file.
///
/// The collection is wiped before the fixture is read. A failure at any later
/// step leaves it empty; there is no rollback.
#[derive(Clone, Debug)]
pub struct UserImporter {
    repo: Arc<dyn UserRepository>,
}

impl UserImporter {
    #[must_use]
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Clears the collection, maps every fixture record and inserts them in one batch.
    ///
    /// # Errors
    /// Returns `ImportError::Io` or `ImportError::Fixture` if the fixture cannot be read or parsed,
    /// `ImportError::MalformedTimestamp` if any `created_at` is not ISO-8601,
    /// and `ImportError::Store` if a database call fails.
    #[tracing::instrument(err, skip(self, path), fields(fixture = %path.display()))]
    pub async fn run(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let cleared = self.repo.delete_all().await?;
        tracing::info!(cleared, "Cleared the users collection");

        let bytes =
            tokio::fs::read(path).await.map_err(|source| ImportError::Io { path: path.to_path_buf(), source })?;
        let fixture: Fixture = serde_json::from_slice(&bytes)?;

        let users = fixture.users.into_iter().map(to_user).collect::<Result<Vec<_>, _>>()?;

        if users.is_empty() {
            tracing::info!("No users to import");
            return Ok(ImportSummary { cleared, imported: 0 });
        }

        let imported = self.repo.insert_many(&users).await?;
        tracing::info!(imported, "Imported users");

        Ok(ImportSummary { cleared, imported })
    }
}

/// Roles granted by the fixture flags, always in admin, manager, tester order.
#[must_use]
pub fn derive_roles(record: &FixtureUser) -> Vec<Role> {
    [
        (record.is_user_admin, Role::Admin),
        (record.is_user_manager, Role::Manager),
        (record.is_user_tester, Role::Tester),
    ]
    .into_iter()
    .filter_map(|(granted, role)| granted.then_some(role))
    .collect()
}

/// Parses an ISO-8601 timestamp into epoch seconds.
///
/// A trailing `Z` means UTC; values without an offset are taken as UTC.
/// The date and time may be separated by a space, and a bare date means
/// midnight UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized;
    let raw = if raw.as_bytes().get(10) == Some(&b' ') {
        normalized = format!("{}T{}", &raw[..10], &raw[11..]);
        normalized.as_str()
    } else {
        raw
    };

    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(epoch_seconds(at));
    }
    if let Ok(at) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(epoch_seconds(at));
    }
    if let Ok(at) = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(epoch_seconds(at.assume_utc()));
    }
    Date::parse(raw, &Iso8601::DEFAULT).ok().map(|day| epoch_seconds(day.midnight().assume_utc()))
}

/// Maps a fixture record to the stored user shape.
///
/// # Errors
/// Returns `ImportError::MalformedTimestamp` if `created_at` cannot be parsed.
pub fn to_user(record: FixtureUser) -> Result<User, ImportError> {
    let roles = derive_roles(&record).into_iter().map(|role| role.as_str().to_string()).collect();

    let Some(created_ts) = parse_timestamp(&record.created_at) else {
        return Err(ImportError::MalformedTimestamp { username: record.user, value: record.created_at });
    };

    Ok(User {
        id: None,
        username: record.user,
        password: record.password,
        roles,
        preferences: Preferences { timezone: record.user_timezone },
        active: record.is_user_active,
        created_ts,
        updated_ts: created_ts,
    })
}
