use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::tabular::{find_column, parse_date, read_csv, utc_midnight};
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_LOCAL_PROXY};
use crate::error::FetchError;
use crate::models::{DataPoint, NormalizedSeries, TableData, Unit};

/// Optional local CSV standing in for the discontinued Wilshire/GDP feeds
/// (header `date,market_cap,gdp`). Just another source to the pipeline: a
/// missing file surfaces as Unavailable for this source, nothing more.
/// `params` selects the column: "market_cap" or "gdp".
pub struct LocalProxyAdapter {
    settings: SourceSettings,
    path: PathBuf,
}

impl LocalProxyAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.source(SRC_LOCAL_PROXY),
            path: settings.local_proxy_path.clone(),
        }
    }

    fn aliases(params: &str) -> Option<&'static [&'static str]> {
        match params {
            "market_cap" => Some(&["market_cap", "wilshire", "total_market_cap"]),
            "gdp" => Some(&["gdp", "nominal_gdp"]),
            _ => None,
        }
    }
}

#[async_trait]
impl SourceAdapter for LocalProxyAdapter {
    fn source_id(&self) -> &str {
        SRC_LOCAL_PROXY
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn candidates(&self, params: &str) -> Vec<Endpoint> {
        if Self::aliases(params).is_none() {
            return Vec::new();
        }
        vec![Endpoint::File(self.path.clone())]
    }

    fn parse(&self, raw: &[u8], params: &str) -> Result<TableData, FetchError> {
        let aliases = Self::aliases(params)
            .ok_or_else(|| FetchError::parse(format!("unknown proxy column '{params}'")))?;

        let (headers, records) = read_csv(raw)?;

        let date_col = find_column(&headers, &["date"])
            .ok_or_else(|| FetchError::schema(format!("no date column in {headers:?}")))?;
        let value_col = find_column(&headers, aliases)
            .ok_or_else(|| FetchError::schema(format!("no '{params}' column in {headers:?}")))?;

        let mut points = Vec::new();
        for record in &records {
            let Some(date) = record.get(date_col).and_then(parse_date) else {
                continue;
            };
            if let Some(value) = record.get(value_col).and_then(|v| v.trim().parse::<f64>().ok()) {
                points.push(DataPoint { timestamp: utc_midnight(date), value });
            }
        }

        Ok(TableData::Series(NormalizedSeries::from_points(
            format!("{SRC_LOCAL_PROXY}:{params}"),
            Unit::Billions,
            points,
        )))
    }
}
