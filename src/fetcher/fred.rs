use std::time::Duration;

use async_trait::async_trait;

use super::tabular::{fill_template, find_column, parse_date, read_csv, utc_midnight};
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_FRED};
use crate::error::FetchError;
use crate::models::{DataPoint, NormalizedSeries, TableData, Unit};

/// FRED series via the keyless public CSV download endpoint. `params` is the
/// series id (e.g. "DGS10", "BAMLH0A0HYM2").
pub struct FredAdapter {
    settings: SourceSettings,
}

impl FredAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_FRED) }
    }

    // Rates come back in percentage points, GDP in billions. Anything we
    // have not classified stays a raw index.
    fn unit_for(series_id: &str) -> Unit {
        let sid = series_id.to_uppercase();
        if sid.starts_with("DGS") || sid.starts_with("BAML") {
            Unit::Percent
        } else if sid == "GDP" || sid == "GDPC1" {
            Unit::Billions
        } else {
            Unit::Index
        }
    }
}

#[async_trait]
impl SourceAdapter for FredAdapter {
    fn source_id(&self) -> &str {
        SRC_FRED
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
            .filter_map(|template| fill_template(template, &[("sid", params)]))
            .map(Endpoint::Http)
            .collect()
    }

    fn parse(&self, raw: &[u8], params: &str) -> Result<TableData, FetchError> {
        let (headers, records) = read_csv(raw)?;

        let date_col = find_column(&headers, &["date", "observation_date"])
            .ok_or_else(|| FetchError::schema(format!("no date column in {headers:?}")))?;
        // The value column is headed with the series id itself; older dumps
        // say VALUE. Failing both, take the column next to the date.
        let normalized_sid = params.trim().to_lowercase();
        let value_col = find_column(&headers, &[normalized_sid.as_str(), "value"])
            .or_else(|| (headers.len() >= 2).then_some(if date_col == 0 { 1 } else { 0 }))
            .ok_or_else(|| FetchError::schema(format!("no value column in {headers:?}")))?;

        let mut points = Vec::new();
        for record in &records {
            let Some(date) = record.get(date_col).and_then(parse_date) else {
                continue;
            };
            let Some(value_str) = record.get(value_col).map(str::trim) else {
                continue;
            };
            // FRED marks missing observations with "."
            if value_str == "." {
                continue;
            }
            if let Ok(value) = value_str.parse::<f64>() {
                points.push(DataPoint { timestamp: utc_midnight(date), value });
            }
        }

        Ok(TableData::Series(NormalizedSeries::from_points(
            format!("{SRC_FRED}:{params}"),
            Self::unit_for(params),
            points,
        )))
    }
}
