use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::FetchError;
use crate::fetcher::{
    cboe::{CboePutCallAdapter, CboeVixAdapter},
    coingecko::CoinGeckoAdapter,
    finra::FinraMarginAdapter,
    fred::FredAdapter,
    holdings::HoldingsAdapter,
    local_proxy::LocalProxyAdapter,
    prices::PriceAdapter,
    shiller::ShillerAdapter,
    SourceAdapter,
};
use crate::models::FetchResult;

/// Resolves a (source, params) request to a fresh table by walking the
/// source's candidate endpoints in declared order. Attempts are bounded by
/// the candidate count; there is no backoff and no cache fallback here (the
/// cache layer owns fail-soft).
pub struct Orchestrator {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    /// All the real upstream adapters, wired from settings.
    pub fn with_defaults(settings: &Settings) -> Self {
        let mut orchestrator = Self::new();
        orchestrator.register(Arc::new(PriceAdapter::new(settings)));
        orchestrator.register(Arc::new(FredAdapter::new(settings)));
        orchestrator.register(Arc::new(CboeVixAdapter::new(settings)));
        orchestrator.register(Arc::new(CboePutCallAdapter::new(settings)));
        orchestrator.register(Arc::new(FinraMarginAdapter::new(settings)));
        orchestrator.register(Arc::new(ShillerAdapter::new(settings)));
        orchestrator.register(Arc::new(HoldingsAdapter::new(settings)));
        orchestrator.register(Arc::new(CoinGeckoAdapter::new(settings)));
        orchestrator.register(Arc::new(LocalProxyAdapter::new(settings)));
        orchestrator
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.source_id().to_string(), adapter);
    }

    pub fn ttl_for(&self, source_id: &str) -> Option<Duration> {
        self.adapters.get(source_id).map(|a| a.ttl())
    }

    pub async fn resolve(&self, source_id: &str, params: &str) -> Result<FetchResult, FetchError> {
        let adapter = self
            .adapters
            .get(source_id)
            .ok_or_else(|| FetchError::network(format!("unknown source '{source_id}'")))?;

        let candidates = adapter.candidates(params);
        if candidates.is_empty() {
            return Err(FetchError::network(format!(
                "no endpoints for '{source_id}' with params '{params}'"
            )));
        }

        let total = candidates.len();
        let mut last_err = FetchError::network("no candidates attempted");

        for (attempt, endpoint) in candidates.iter().enumerate() {
            tracing::debug!(source = source_id, %endpoint, "fetching candidate {}/{}", attempt + 1, total);

            let outcome = match adapter.retrieve(endpoint).await {
                Ok(raw) => adapter.parse(&raw, params),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(data) if data.is_empty() => {
                    last_err = FetchError::parse(format!("empty table from {endpoint}"));
                    tracing::warn!(source = source_id, %endpoint, "candidate returned an empty table");
                }
                Ok(data) => {
                    tracing::info!(source = source_id, params, "fetched via candidate {}/{}", attempt + 1, total);
                    return Ok(FetchResult::fresh(source_id, params, data));
                }
                Err(err) => {
                    tracing::warn!(source = source_id, %endpoint, "candidate failed: {err}");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
