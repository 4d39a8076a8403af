use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::tabular::{fill_template, find_column, parse_date, read_csv, utc_midnight};
use super::{Endpoint, SourceAdapter};
use crate::config::{InstrumentSymbols, Settings, SourceSettings, SRC_PRICES};
use crate::error::FetchError;
use crate::models::{DataPoint, NormalizedSeries, TableData, Unit};

/// Daily close prices. Stooq is the primary provider, Yahoo's CSV download
/// endpoint the fallback; both come back as date/close CSV, with the column
/// spellings differing between the two (and drifting over time).
pub struct PriceAdapter {
    settings: SourceSettings,
    instruments: BTreeMap<String, InstrumentSymbols>,
}

impl PriceAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.source(SRC_PRICES),
            instruments: settings.instruments.clone(),
        }
    }
}

#[async_trait]
impl SourceAdapter for PriceAdapter {
    fn source_id(&self) -> &str {
        SRC_PRICES
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn candidates(&self, params: &str) -> Vec<Endpoint> {
        let Some(symbols) = self.instruments.get(params) else {
            return Vec::new();
        };
        let now = Utc::now().timestamp().to_string();

        self.settings
            .candidates
            .iter()
            .filter_map(|template| {
                fill_template(
                    template,
                    &[
                        ("stooq", symbols.stooq.as_str()),
                        ("yahoo", symbols.yahoo.as_str()),
                        ("now", now.as_str()),
                    ],
                )
            })
            .map(Endpoint::Http)
            .collect()
    }

    fn parse(&self, raw: &[u8], _params: &str) -> Result<TableData, FetchError> {
        let (headers, records) = read_csv(raw)?;

        let date_col = find_column(&headers, &["date"])
            .ok_or_else(|| FetchError::schema(format!("no date column in {headers:?}")))?;
        // Stooq says "Close", Yahoo sometimes only has "Adj Close"
        let close_col = find_column(&headers, &["close", "adj_close", "adjclose"])
            .ok_or_else(|| FetchError::schema(format!("no close column in {headers:?}")))?;

        let mut points = Vec::new();
        for record in &records {
            let Some(date) = record.get(date_col).and_then(parse_date) else {
                continue;
            };
            // Yahoo pads delisted days with "null"
            let Some(value) = record.get(close_col).and_then(|v| v.trim().parse::<f64>().ok())
            else {
                continue;
            };
            points.push(DataPoint { timestamp: utc_midnight(date), value });
        }

        Ok(TableData::Series(NormalizedSeries::from_points(
            SRC_PRICES,
            Unit::Index,
            points,
        )))
    }
}
