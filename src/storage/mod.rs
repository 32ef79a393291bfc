use crate::config::DatabaseConfig;
use mongodb::Client;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};

pub mod user_repo;

pub use user_repo::{MongoUserRepository, UserRepository};

/// Opens the MongoDB client using the Stable API v1.
///
/// The driver connects lazily, so this only fails on a malformed connection
/// string or unresolvable SRV record.
///
/// # Errors
/// Returns `mongodb::error::Error` if the connection string cannot be parsed.
pub async fn init_client(config: &DatabaseConfig) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.url).await?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    Client::with_options(options)
}
