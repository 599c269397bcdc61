//! Rule engine for sharesync (C4)
//!
//! Compiles the `ExclusionRule`/`RenameRule` rows persisted on a
//! `SyncConfig` into matchers used by the diff engine: an [`ItemFilter`]
//! that decides whether an item (and, for folders, its whole subtree) is
//! skipped, and a [`RenameSet`] that rewrites an item's path before it is
//! compared against the target tree.

pub mod error;
pub mod matcher;

pub use error::RuleError;
pub use matcher::{CompiledExclusionRule, CompiledRenameRule, ItemFilter, RenameSet};
