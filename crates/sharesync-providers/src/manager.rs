//! Drive Manager (C2) — a process-wide registry of provider clients keyed
//! by `(drive_type, hash(credentials))`, with idle eviction.
//!
//! Grounded on `original_source/.../yp_service.py`'s `BaseDrive` client-cache
//! class: exactly one client per `(drive_type, credentials)` tuple at any
//! instant, never shared across distinct credentials, sweep triggered by
//! call arrival rather than a background task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use sharesync_core::domain::DriveType;
use sharesync_core::ports::ProviderClient;
use tracing::{debug, info};

use crate::alist::AlistClient;
use crate::baidu::BaiduClient;
use crate::quark::QuarkClient;

/// Identifies one cached client: its drive type plus a hash of its credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    drive_type: DriveType,
    credentials_hash: [u8; 32],
}

fn hash_credentials(credentials: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(credentials.as_bytes());
    hasher.finalize().into()
}

struct CacheEntry {
    client: Arc<dyn ProviderClient>,
    last_used: Instant,
}

/// Registry of live provider clients, one per `(drive_type, credentials)`.
///
/// `max_idle` and `cleanup_interval` mirror spec §4.2's defaults (30 minutes
/// and 1 hour respectively) unless overridden via [`DriveManager::new`].
pub struct DriveManager {
    clients: DashMap<CacheKey, CacheEntry>,
    last_sweep: std::sync::Mutex<Instant>,
    max_idle: Duration,
    cleanup_interval: Duration,
}

impl DriveManager {
    pub fn new(max_idle: Duration, cleanup_interval: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            last_sweep: std::sync::Mutex::new(Instant::now()),
            max_idle,
            cleanup_interval,
        }
    }

    /// Looks up or creates the client for `(drive_type, credentials)`,
    /// refreshing its `last_used` timestamp, then triggers an idle sweep if
    /// `cleanup_interval` has elapsed since the last one.
    pub fn get_or_create(
        &self,
        drive_type: DriveType,
        credentials: &str,
    ) -> Arc<dyn ProviderClient> {
        let key = CacheKey {
            drive_type,
            credentials_hash: hash_credentials(credentials),
        };

        let client = {
            let mut entry = self.clients.entry(key).or_insert_with(|| {
                debug!(?drive_type, "creating new provider client");
                CacheEntry {
                    client: build_client(drive_type, credentials),
                    last_used: Instant::now(),
                }
            });
            entry.last_used = Instant::now();
            entry.client.clone()
        };

        self.sweep_if_due();
        client
    }

    /// Number of cached clients, for diagnostics/tests.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn sweep_if_due(&self) {
        let mut last_sweep = self.last_sweep.lock().unwrap();
        if last_sweep.elapsed() < self.cleanup_interval {
            return;
        }
        *last_sweep = Instant::now();
        drop(last_sweep);

        let max_idle = self.max_idle;
        let before = self.clients.len();
        self.clients.retain(|_, entry| entry.last_used.elapsed() < max_idle);
        let evicted = before - self.clients.len();
        if evicted > 0 {
            info!(evicted, "evicted idle provider clients");
        }
    }
}

impl Default for DriveManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(1800), Duration::from_secs(3600))
    }
}

fn build_client(drive_type: DriveType, credentials: &str) -> Arc<dyn ProviderClient> {
    match drive_type {
        DriveType::BaiduDrive => Arc::new(BaiduClient::new(credentials)),
        DriveType::QuarkDrive => Arc::new(QuarkClient::new(credentials)),
        DriveType::AlistDrive => Arc::new(AlistClient::new(credentials)),
    }
}
