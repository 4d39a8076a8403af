#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use macro_dashboard::error::FetchError;
use macro_dashboard::fetcher::{Endpoint, SourceAdapter};
use macro_dashboard::models::{DataPoint, Holding, HoldingsTable, NormalizedSeries, TableData, Unit};

/// Call-counting stub standing in for a real upstream. `retrieve` is
/// overridden so no test ever touches the network; every retrieve counts as
/// one "network call" against the dedup/TTL properties.
pub struct StubAdapter {
    source_id: String,
    ttl: Duration,
    data: HashMap<String, TableData>,
    endpoints: usize,
    /// How many leading candidates fail before one succeeds.
    failing_endpoints: usize,
    delay: Duration,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl StubAdapter {
    pub fn new(source_id: &str, ttl: Duration, data: TableData) -> Self {
        let mut map = HashMap::new();
        map.insert(String::new(), data);
        Self {
            source_id: source_id.to_string(),
            ttl,
            data: map,
            endpoints: 1,
            failing_endpoints: 0,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Serve different tables for different params (e.g. the proxy source's
    /// market_cap and gdp columns).
    pub fn with_data(mut self, params: &str, data: TableData) -> Self {
        self.data.insert(params.to_string(), data);
        self
    }

    pub fn with_endpoints(mut self, total: usize, failing: usize) -> Self {
        self.endpoints = total;
        self.failing_endpoints = failing;
        self
    }

    /// Make every retrieve slow, to widen the race window in dedup tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn candidates(&self, _params: &str) -> Vec<Endpoint> {
        (0..self.endpoints)
            .map(|i| Endpoint::Http(format!("stub://{}/{}", self.source_id, i)))
            .collect()
    }

    async fn retrieve(&self, endpoint: &Endpoint) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::network("stub forced failure"));
        }

        let Endpoint::Http(url) = endpoint else {
            return Err(FetchError::network("stub expects http endpoints"));
        };
        let index: usize = url.rsplit('/').next().and_then(|i| i.parse().ok()).unwrap_or(0);
        if index < self.failing_endpoints {
            return Err(FetchError::network(format!("candidate {index} down")));
        }

        Ok(Vec::new())
    }

    fn parse(&self, _raw: &[u8], params: &str) -> Result<TableData, FetchError> {
        self.data
            .get(params)
            .or_else(|| self.data.get(""))
            .cloned()
            .ok_or_else(|| FetchError::parse(format!("stub has no data for '{params}'")))
    }
}

pub fn daily_series(source_id: &str, values: &[f64]) -> TableData {
    let points = values
        .iter()
        .enumerate()
        .map(|(i, &value)| DataPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(i as i64),
            value,
        })
        .collect();
    TableData::Series(NormalizedSeries::from_points(source_id, Unit::Index, points))
}

pub fn monthly_series(source_id: &str, start_year: i32, values: &[f64]) -> TableData {
    let points = values
        .iter()
        .enumerate()
        .map(|(i, &value)| DataPoint {
            timestamp: Utc
                .with_ymd_and_hms(start_year + i as i32 / 12, (i % 12) as u32 + 1, 1, 0, 0, 0)
                .unwrap(),
            value,
        })
        .collect();
    TableData::Series(NormalizedSeries::from_points(source_id, Unit::Index, points))
}

pub fn holdings_table(weights: &[f64]) -> TableData {
    TableData::Holdings(HoldingsTable {
        source_id: "holdings".to_string(),
        as_of: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        rows: weights
            .iter()
            .enumerate()
            .map(|(i, &weight)| Holding {
                ticker: format!("T{i:03}"),
                name: format!("Holding {i}"),
                weight,
            })
            .collect(),
    })
}
