use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Reader};

use super::tabular::{cell_to_f64, cell_to_string, fractional_year_date, normalize_header};
use super::{Endpoint, SourceAdapter};
use crate::config::{Settings, SourceSettings, SRC_SHILLER};
use crate::error::FetchError;
use crate::models::{DataPoint, NormalizedSeries, TableData, Unit};

/// Yale/Shiller long-run dataset (monthly XLS, sheet "Data"). One workbook
/// carries several columns we need, so `params` selects one of "price",
/// "earnings" or "cape"; each selection is its own cache entry.
///
/// Dates are fractional years in hundredths: 1871.01 is January 1871,
/// 1871.1 is October.
pub struct ShillerAdapter {
    settings: SourceSettings,
}

impl ShillerAdapter {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.source(SRC_SHILLER) }
    }

    fn column_matches(header: &str, params: &str) -> bool {
        match params {
            "price" => matches!(header, "p" | "price"),
            "earnings" => matches!(header, "e" | "earnings"),
            "cape" => header.contains("cape"),
            _ => false,
        }
    }

    fn unit_for(params: &str) -> Unit {
        match params {
            "cape" => Unit::Ratio,
            _ => Unit::UsdPrice,
        }
    }
}

#[async_trait]
impl SourceAdapter for ShillerAdapter {
    fn source_id(&self) -> &str {
        SRC_SHILLER
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn candidates(&self, params: &str) -> Vec<Endpoint> {
        if !matches!(params, "price" | "earnings" | "cape") {
            return Vec::new();
        }
        self.settings.candidates.iter().cloned().map(Endpoint::Http).collect()
    }

    fn parse(&self, raw: &[u8], params: &str) -> Result<TableData, FetchError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(raw.to_vec()))
            .map_err(|e| FetchError::parse(format!("shiller workbook: {e}")))?;

        let range = workbook
            .worksheet_range("Data")
            .map_err(|e| FetchError::schema(format!("no 'Data' sheet: {e}")))?;

        let rows: Vec<_> = range.rows().collect();

        // Header sits below several title rows; find the row starting with "Date"
        let mut header_row = None;
        for (idx, row) in rows.iter().take(12).enumerate() {
            let first = row.first().and_then(cell_to_string).unwrap_or_default();
            if normalize_header(&first) == "date" {
                header_row = Some(idx);
                break;
            }
        }
        let header_row =
            header_row.ok_or_else(|| FetchError::schema("no Date header row in Data sheet"))?;

        let headers: Vec<String> = rows[header_row]
            .iter()
            .map(|cell| cell_to_string(cell).map(|s| normalize_header(&s)).unwrap_or_default())
            .collect();

        let value_col = headers
            .iter()
            .position(|h| Self::column_matches(h, params))
            .ok_or_else(|| {
                FetchError::schema(format!("no '{params}' column in {headers:?}"))
            })?;

        let mut points = Vec::new();
        for row in rows.iter().skip(header_row + 1) {
            let Some(date) = row.first().and_then(cell_to_f64).and_then(fractional_year_date)
            else {
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
            return Err(FetchError::parse(format!("no '{params}' rows in Data sheet")));
        }

        Ok(TableData::Series(NormalizedSeries::from_points(
            format!("{SRC_SHILLER}:{params}"),
            Self::unit_for(params),
            points,
        )))
    }
}
