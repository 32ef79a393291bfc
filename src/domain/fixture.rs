use serde::Deserialize;

/// Top-level shape of the import fixture file.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub users: Vec<FixtureUser>,
}

/// A user record as it appears in the fixture, before mapping to [`crate::domain::user::User`].
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub is_user_admin: bool,
    #[serde(default)]
    pub is_user_manager: bool,
    #[serde(default)]
    pub is_user_tester: bool,
    pub user_timezone: String,
    pub is_user_active: bool,
    pub created_at: String,
}
