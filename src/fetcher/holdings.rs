use std::time::Duration;

use async_trait::async_trait;

use super::tabular::{find_column, normalize_header, parse_date, utc_midnight};
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_HOLDINGS};
use crate::error::FetchError;
use crate::models::{Holding, HoldingsTable, TableData};

/// SPY daily holdings CSV from the fund sponsor. The file opens with a few
/// preamble lines (fund name, as-of date) before the actual header row, so
/// we scan for the row that mentions both ticker and weight.
pub struct HoldingsAdapter {
    settings: SourceSettings,
}

impl HoldingsAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_HOLDINGS) }
    }
}

#[async_trait]
impl SourceAdapter for HoldingsAdapter {
    fn source_id(&self) -> &str {
        SRC_HOLDINGS
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
        let text = String::from_utf8_lossy(raw);
        let lines: Vec<&str> = text.lines().collect();

        let mut as_of = None;
        let mut header_idx = None;
        for (idx, line) in lines.iter().take(20).enumerate() {
            let lower = line.to_lowercase();
            if lower.contains("ticker") && lower.contains("weight") {
                header_idx = Some(idx);
                break;
            }
            // Preamble rows carry the as-of date, e.g. "Holdings: As of 02-Jan-2024"
            if as_of.is_none() && lower.contains("as of") {
                as_of = line
                    .split(',')
                    .filter_map(|field| {
                        let field = field.trim();
                        // Strip the "Holdings: As of" prose around the date
                        let field = match field.to_lowercase().find("as of") {
                            Some(pos) => field[pos + 5..].trim(),
                            None => field,
                        };
                        parse_date(field).or_else(|| {
                            chrono::NaiveDate::parse_from_str(field, "%d-%b-%Y").ok()
                        })
                    })
                    .next();
            }
        }
        let header_idx = header_idx
            .ok_or_else(|| FetchError::schema("no ticker/weight header row in holdings file"))?;

        let body = lines[header_idx..].join("\n");
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FetchError::parse(format!("holdings headers: {e}")))?
            .iter()
            .map(normalize_header)
            .collect();

        let ticker_col = find_column(&headers, &["ticker", "symbol"])
            .ok_or_else(|| FetchError::schema(format!("no ticker column in {headers:?}")))?;
        let weight_col = find_column(&headers, &["weight", "weight_(%)", "weight_%"])
            .ok_or_else(|| FetchError::schema(format!("no weight column in {headers:?}")))?;
        let name_col = find_column(&headers, &["name", "security_name", "company"]);

        let mut rows = Vec::new();
        for record in reader.records().flatten() {
            let Some(ticker) = record.get(ticker_col).map(str::trim).filter(|t| !t.is_empty())
            else {
                continue;
            };
            // Sponsor files publish weights as percentages
            let Some(weight) = record
                .get(weight_col)
                .and_then(|w| w.trim().trim_end_matches('%').parse::<f64>().ok())
            else {
                continue;
            };
            let name = name_col
                .and_then(|idx| record.get(idx))
                .unwrap_or("")
                .trim()
                .to_string();

            rows.push(Holding {
                ticker: ticker.to_string(),
                name,
                weight: weight / 100.0,
            });
        }

        Ok(TableData::Holdings(HoldingsTable {
            source_id: SRC_HOLDINGS.to_string(),
            as_of: as_of.map(utc_midnight),
            rows,
        }))
    }
}
