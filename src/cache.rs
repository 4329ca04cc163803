//! Sheet Cache
//!
//! Holds the last successfully fetched collection and its timestamp as one
//! immutable snapshot. Refreshes serialize on an async mutex; readers never
//! wait for a refresh, they clone the current snapshot pointer.

use crate::ingestion::SheetSource;
use crate::record::SheetCollection;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Collection plus the time it was fetched
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub collection: SheetCollection,
    pub last_updated: DateTime<Local>,
}

impl CacheSnapshot {
    pub fn last_updated_label(&self) -> String {
        self.last_updated.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Updated { records: usize, sheets: usize },
    Retained,
}

pub struct SheetCache {
    source: Arc<dyn SheetSource>,
    current: RwLock<Option<Arc<CacheSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl SheetCache {
    pub fn new(source: Arc<dyn SheetSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current snapshot, possibly stale, `None` until the first success
    pub fn read(&self) -> Option<Arc<CacheSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.read().map(|s| s.last_updated)
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// Fetch through the source and swap the snapshot on success. A failed
    /// fetch leaves the previous snapshot untouched.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;
        info!("Refreshing sheet data");

        match self.source.fetch_all().await {
            Some(collection) => {
                let records = collection.total_records();
                let sheets = collection.sheet_count();
                let snapshot = Arc::new(CacheSnapshot {
                    collection,
                    last_updated: Local::now(),
                });
                *self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot);
                info!(records, sheets, "Sheet cache updated");
                RefreshOutcome::Updated { records, sheets }
            }
            None => {
                warn!(
                    has_previous = self.is_loaded(),
                    "No data fetched; keeping the previous cache"
                );
                RefreshOutcome::Retained
            }
        }
    }

    /// Return the snapshot, fetching once first if nothing is cached yet
    pub async fn ensure_loaded(&self) -> Option<Arc<CacheSnapshot>> {
        if let Some(snapshot) = self.read() {
            return Some(snapshot);
        }
        self.refresh().await;
        self.read()
    }
}

/// Refresh `cache` every `period` until the task is aborted. The first
/// refresh happens one full period after spawning.
pub fn spawn_refresh_loop(cache: Arc<SheetCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "Background refresh started");

        loop {
            ticker.tick().await;
            let outcome = cache.refresh().await;
            info!(?outcome, "Scheduled refresh finished");
        }
    })
}
