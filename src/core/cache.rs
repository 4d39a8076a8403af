use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;

use super::orchestrator::Orchestrator;
use crate::models::{FetchResult, FetchStatus};

/// One cached fetch, valid until `expires_at`. Entries are replaced
/// wholesale on a successful re-fetch and otherwise retained forever:
/// an expired entry is the fallback value when the next refresh fails.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: FetchResult,
    pub expires_at: DateTime<Utc>,
}

type Slot = Arc<AsyncMutex<Option<CacheEntry>>>;

/// Memoizes orchestrator results per (source_id, params) with the source's
/// TTL, and serves stale-but-present data when a refresh fails.
///
/// The per-key async lock makes check-then-fetch atomic for that key, so
/// concurrent readers of the same key trigger at most one upstream call;
/// different keys proceed in parallel.
pub struct CacheLayer {
    orchestrator: Orchestrator,
    slots: Mutex<HashMap<(String, String), Slot>>,
}

impl CacheLayer {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, source_id: &str, params: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry((source_id.to_string(), params.to_string()))
            .or_default()
            .clone()
    }

    pub async fn get(&self, source_id: &str, params: &str) -> FetchResult {
        let slot = self.slot(source_id, params);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if Utc::now() < entry.expires_at {
                tracing::debug!(source = source_id, params, "cache hit");
                return entry.result.with_status(FetchStatus::Fresh);
            }
        }

        match self.orchestrator.resolve(source_id, params).await {
            Ok(result) => {
                let ttl = self
                    .orchestrator
                    .ttl_for(source_id)
                    .unwrap_or(std::time::Duration::ZERO);
                let expires_at =
                    result.fetched_at + chrono::Duration::seconds(ttl.as_secs() as i64);
                *guard = Some(CacheEntry { result: result.clone(), expires_at });
                result
            }
            Err(err) => match guard.as_ref() {
                Some(entry) => {
                    tracing::warn!(
                        source = source_id,
                        params,
                        "refresh failed ({err}); serving stale data from {}",
                        entry.result.fetched_at
                    );
                    entry.result.with_status(FetchStatus::Stale)
                }
                None => {
                    tracing::warn!(source = source_id, params, "unavailable: {err}");
                    FetchResult::unavailable(source_id, params, err)
                }
            },
        }
    }
}
