pub mod completions;
pub mod config;
pub mod provider;
pub mod scheduler;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};

use sharesync_cache::{DatabasePool, SqliteStateRepository};
use sharesync_core::config::Config;
use sharesync_core::domain::{Account, DriveType};
use sharesync_core::ports::AccountRepository;
use sharesync_providers::DriveManager;
use sharesync_core::ports::ProviderClient;

/// Opens the configured SQLite state store, shared by every subcommand that
/// reads or writes persisted accounts/configs/tasks.
pub(crate) async fn open_state() -> Result<Arc<SqliteStateRepository>> {
    let config = Config::load_or_default(&Config::default_path());
    let pool = DatabasePool::new(&config.database.path, config.database.max_connections)
        .await
        .context("failed to open database pool")?;
    Ok(Arc::new(SqliteStateRepository::new(pool.pool().clone())))
}

/// Loads the account identified by `account_id`, erroring if it does not
/// exist rather than silently falling back to a default.
pub(crate) async fn load_account(
    state: &SqliteStateRepository,
    account_id: sharesync_core::domain::newtypes::AccountId,
) -> Result<Account> {
    AccountRepository::get(state, account_id)
        .await
        .context("failed to query account")?
        .with_context(|| format!("no account with id {account_id}"))
}

/// Builds a provider client for `account` using a process-local
/// [`DriveManager`] — one per CLI invocation, since admin commands are
/// one-shot processes rather than the long-lived daemon.
pub(crate) fn client_for(drive_type: DriveType, credentials: &str) -> Arc<dyn ProviderClient> {
    DriveManager::default().get_or_create(drive_type, credentials)
}
