//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! - [`ProviderClient`] — C1, one cloud-drive provider's operations.
//! - [`StateRepository`] — C8, typed persistence for accounts, configs,
//!   tasks/items, and cache rows.

pub mod provider_client;
pub mod state_repository;

pub use provider_client::{
    ListingFilter, NoopFilter, OrderBy, OrderDirection, ProviderClient, Speed, TransferExt, UserInfo,
};
pub use state_repository::{
    AccountRepository, FileCacheRepository, StateRepository, SyncConfigRepository, SyncTaskRepository,
};
