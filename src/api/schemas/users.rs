use crate::services::user_service::CreateUserParams;
use serde::Deserialize;

const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub preferences: Option<Preferences>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct Preferences {
    pub timezone: String,
}

const fn default_active() -> bool {
    true
}

impl From<CreateUser> for CreateUserParams {
    fn from(request: CreateUser) -> Self {
        Self {
            username: request.username,
            password: request.password,
            roles: request.roles,
            timezone: request.preferences.map_or_else(|| DEFAULT_TIMEZONE.to_string(), |p| p.timezone),
            active: request.active,
        }
    }
}
