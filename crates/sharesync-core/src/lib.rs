//! sharesync-core — domain logic and business rules
//!
//! Hexagonal architecture core with:
//! - **Domain entities** — `Account`, `SyncConfig`, `SyncTask`/`SyncTaskItem`,
//!   `FileCache`, `BaseFileInfo`, compiled-rule raw shapes
//! - **Port definitions** — `ProviderClient` (C1), `StateRepository` (C8)
//! - **Config** — `Config`/`ConfigBuilder` for the daemon and CLI
//!
//! The domain module contains pure business logic with no external
//! dependencies; ports define trait interfaces that `sharesync-providers`
//! and `sharesync-cache` implement.

pub mod config;
pub mod domain;
pub mod ports;
