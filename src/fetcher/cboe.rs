//! CBOE public CSV files: VIX daily history and the put/call ratio table.

use std::time::Duration;

use async_trait::async_trait;

use super::tabular::{find_column, parse_date, read_csv, utc_midnight};
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_CBOE_PUTCALL, SRC_CBOE_VIX};
use crate::error::FetchError;
use crate::models::{DataPoint, NormalizedSeries, TableData, Unit};

fn parse_dated_column(
    raw: &[u8],
    value_col_of: impl Fn(&[String]) -> Option<usize>,
    source_id: &str,
    unit: Unit,
) -> Result<TableData, FetchError> {
    let (headers, records) = read_csv(raw)?;

    let date_col = find_column(&headers, &["date"])
        .ok_or_else(|| FetchError::schema(format!("no date column in {headers:?}")))?;
    let value_col = value_col_of(&headers)
        .ok_or_else(|| FetchError::schema(format!("no value column in {headers:?}")))?;

    let mut points = Vec::new();
    for record in &records {
        let Some(date) = record.get(date_col).and_then(parse_date) else {
            continue;
        };
        if let Some(value) = record.get(value_col).and_then(|v| v.trim().parse::<f64>().ok()) {
            points.push(DataPoint { timestamp: utc_midnight(date), value });
        }
    }

    Ok(TableData::Series(NormalizedSeries::from_points(source_id, unit, points)))
}

pub struct CboeVixAdapter {
    settings: SourceSettings,
}

impl CboeVixAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_CBOE_VIX) }
    }
}

#[async_trait]
impl SourceAdapter for CboeVixAdapter {
    fn source_id(&self) -> &str {
        SRC_CBOE_VIX
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn candidates(&self, _params: &str) -> Vec<Endpoint> {
        self.settings.candidates.iter().cloned().map(Endpoint::Http).collect()
    }

    fn parse(&self, raw: &[u8], _params: &str) -> Result<TableData, FetchError> {
        parse_dated_column(
            raw,
            |headers| find_column(headers, &["close", "vix_close", "vix"]),
            SRC_CBOE_VIX,
            Unit::Index,
        )
    }
}

/// Put/call ratios. `params` picks the ratio family: "total" (preferred for
/// the sentiment composite) falls back to the equity-only column when the
/// total one disappears from the file.
pub struct CboePutCallAdapter {
    settings: SourceSettings,
}

impl CboePutCallAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_CBOE_PUTCALL) }
    }
}

#[async_trait]
impl SourceAdapter for CboePutCallAdapter {
    fn source_id(&self) -> &str {
        SRC_CBOE_PUTCALL
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn candidates(&self, _params: &str) -> Vec<Endpoint> {
        self.settings.candidates.iter().cloned().map(Endpoint::Http).collect()
    }

    fn parse(&self, raw: &[u8], params: &str) -> Result<TableData, FetchError> {
        let family = if params.trim().is_empty() { "total" } else { params.trim() };

        parse_dated_column(
            raw,
            |headers| {
                headers
                    .iter()
                    .position(|h| h.contains(family) && h.contains("ratio"))
                    .or_else(|| headers.iter().position(|h| h.contains(family)))
                    .or_else(|| {
                        headers
                            .iter()
                            .position(|h| h.contains("equity") && h != "date")
                    })
            },
            SRC_CBOE_PUTCALL,
            Unit::Ratio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vix_history() {
        let body = b"DATE,OPEN,HIGH,LOW,CLOSE\n\
                     01/02/2024,13.2,13.9,12.9,13.1\n\
                     01/03/2024,13.3,14.5,13.2,14.0\n";
        let adapter = CboeVixAdapter::new(&Settings::default());
        let table = adapter.parse(body, "").unwrap();
        let series = table.as_series().unwrap();
        assert_eq!(series.values(), vec![13.1, 14.0]);
    }

    #[test]
    fn test_parse_vix_close_header_variant() {
        let body = b"Date,VIX Close\n2024-01-02,13.1\n";
        let adapter = CboeVixAdapter::new(&Settings::default());
        let table = adapter.parse(body, "").unwrap();
        assert_eq!(table.as_series().unwrap().values(), vec![13.1]);
    }

    #[test]
    fn test_parse_putcall_total() {
        let body = b"DATE,CALL,PUT,TOTAL P/C Ratio,EQUITY P/C Ratio\n\
                     2024-01-02,100,90,0.90,0.65\n";
        let adapter = CboePutCallAdapter::new(&Settings::default());
        let table = adapter.parse(body, "total").unwrap();
        assert_eq!(table.as_series().unwrap().values(), vec![0.90]);
    }

    #[test]
    fn test_parse_putcall_falls_back_to_equity() {
        let body = b"DATE,EQUITY P/C Ratio\n2024-01-02,0.65\n";
        let adapter = CboePutCallAdapter::new(&Settings::default());
        let table = adapter.parse(body, "total").unwrap();
        assert_eq!(table.as_series().unwrap().values(), vec![0.65]);
    }

    #[test]
    fn test_parse_no_usable_column() {
        let body = b"DATE,SOMETHING\n2024-01-02,1\n";
        let adapter = CboePutCallAdapter::new(&Settings::default());
        assert!(matches!(
            adapter.parse(body, "total").unwrap_err(),
            FetchError::SchemaDrift(_)
        ));
    }
}
