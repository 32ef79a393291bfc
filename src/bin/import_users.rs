#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use std::sync::Arc;
use tracing::Instrument;
use users_api::config::ImportConfig;
use users_api::services::user_import::UserImporter;
use users_api::storage::{self, MongoUserRepository};
use users_api::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ImportConfig::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    users_api::setup_panic_hook();

    let client = storage::init_client(&config.database).await?;
    let database = config.database.database_name();
    let repo = MongoUserRepository::new(&client, &database, &config.database.collection);

    let result = UserImporter::new(Arc::new(repo))
        .run(&config.fixture)
        .instrument(tracing::info_span!("import_users", database = %database))
        .await;

    client.shutdown().await;
    telemetry_guard.shutdown();

    let summary = result?;
    tracing::info!(cleared = summary.cleared, imported = summary.imported, "Import finished");
    Ok(())
}
