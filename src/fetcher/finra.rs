use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Reader};

use super::tabular::{cell_to_date, cell_to_f64, cell_to_string, normalize_header};
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_FINRA_MARGIN};
use crate::error::FetchError;
use crate::models::{DataPoint, NormalizedSeries, TableData, Unit};

/// FINRA monthly margin statistics workbook. The file path moves every year
/// (hence several candidate URLs) and the sheet layout drifts: the date
/// column is "Date" or "Month", and the debit-balance column has been
/// reworded repeatedly. We locate both by content, not position.
pub struct FinraMarginAdapter {
    settings: SourceSettings,
}

impl FinraMarginAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_FINRA_MARGIN) }
    }
}

#[async_trait]
impl SourceAdapter for FinraMarginAdapter {
    fn source_id(&self) -> &str {
        SRC_FINRA_MARGIN
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
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(raw.to_vec()))
            .map_err(|e| FetchError::parse(format!("margin workbook: {e}")))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FetchError::parse("margin workbook has no sheets"))?
            .map_err(|e| FetchError::parse(format!("margin sheet: {e}")))?;

        let rows: Vec<_> = range.rows().collect();

        // 1. Locate the header row (the sheet carries preamble text above it)
        let mut header_row = None;
        for (idx, row) in rows.iter().take(15).enumerate() {
            let has_date = row.iter().any(|cell| {
                cell_to_string(cell)
                    .map(|s| matches!(normalize_header(&s).as_str(), "date" | "month" | "month/year"))
                    .unwrap_or(false)
            });
            if has_date {
                header_row = Some(idx);
                break;
            }
        }
        let header_row = header_row
            .ok_or_else(|| FetchError::schema("no Date/Month header row in margin sheet"))?;

        let headers: Vec<String> = rows[header_row]
            .iter()
            .map(|cell| cell_to_string(cell).map(|s| normalize_header(&s)).unwrap_or_default())
            .collect();

        let date_col = headers
            .iter()
            .position(|h| matches!(h.as_str(), "date" | "month" | "month/year"))
            .ok_or_else(|| FetchError::schema("margin sheet lost its date column"))?;
        let value_col = headers
            .iter()
            .position(|h| h.contains("debit") && h.contains("balances"))
            .ok_or_else(|| {
                FetchError::schema(format!("no debit-balances column in {headers:?}"))
            })?;

        // 2. Collect the monthly rows below the header
        let mut points = Vec::new();
        for row in rows.iter().skip(header_row + 1) {
            let Some(date) = row.get(date_col).and_then(cell_to_date) else {
                continue;
            };
            if let Some(value) = row.get(value_col).and_then(cell_to_f64) {
                points.push(DataPoint {
                    timestamp: date.and_hms_opt(0, 0, 0).unwrap().and_utc(),
                    value,
                });
            }
        }

        if points.is_empty() {
            return Err(FetchError::parse("margin sheet yielded no rows"));
        }

        Ok(TableData::Series(NormalizedSeries::from_points(
            SRC_FINRA_MARGIN,
            Unit::Millions,
            points,
        )))
    }
}
