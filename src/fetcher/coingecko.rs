use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::tabular::fill_template;
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_COINGECKO};
use crate::error::FetchError;
use crate::models::{AssetQuote, TableData};

/// Spot quotes from the public CoinGecko markets API. `params` is the
/// comma-separated id list, e.g. "bitcoin,ethereum".
pub struct CoinGeckoAdapter {
    settings: SourceSettings,
}

impl CoinGeckoAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_COINGECKO) }
    }
}

#[derive(Deserialize)]
struct MarketRow {
    id: String,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
}

#[async_trait]
impl SourceAdapter for CoinGeckoAdapter {
    fn source_id(&self) -> &str {
        SRC_COINGECKO
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn candidates(&self, params: &str) -> Vec<Endpoint> {
        if params.trim().is_empty() {
            return Vec::new();
        }
        self.settings
            .candidates
            .iter()
            .filter_map(|template| fill_template(template, &[("ids", params)]))
            .map(Endpoint::Http)
            .collect()
    }

    fn parse(&self, raw: &[u8], _params: &str) -> Result<TableData, FetchError> {
        let rows: Vec<MarketRow> = serde_json::from_slice(raw)
            .map_err(|e| FetchError::parse(format!("coingecko body: {e}")))?;

        let quotes = rows
            .into_iter()
            .filter_map(|row| {
                Some(AssetQuote {
                    id: row.id,
                    price: row.current_price?,
                    change_24h_pct: row.price_change_percentage_24h,
                    change_7d_pct: row.price_change_percentage_7d_in_currency,
                })
            })
            .collect();

        Ok(TableData::Quotes(quotes))
    }
}
