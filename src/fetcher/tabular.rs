//! Shared helpers for turning upstream CSV/XLS bodies into rows: header
//! normalization, alias-based column resolution, and the date formats the
//! providers actually emit.

use calamine::Data;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FetchError;

/// Providers disagree on header casing and spacing ("VIX Close", "vix_close",
/// "Adj Close"). Everything is compared in trim/lowercase/underscore form.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Resolve a canonical field to a column index via its accepted alias
/// spellings. Aliases must already be in normalized form.
pub fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        if let Some(idx) = headers.iter().position(|h| h == alias) {
            return Some(idx);
        }
    }
    None
}

/// Looser resolution for sources that rename columns freely (FINRA): the
/// first header containing every needle wins.
pub fn find_column_containing(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| needles.iter().all(|needle| h.contains(needle)))
}

/// Read a CSV body into normalized headers plus records.
pub fn read_csv(raw: &[u8]) -> Result<(Vec<String>, Vec<csv::StringRecord>), FetchError> {
    // A UTF-8 BOM would otherwise glue itself onto the first header
    let raw = raw.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(raw);
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(raw);

    let headers = reader
        .headers()
        .map_err(|e| FetchError::parse(format!("csv headers: {e}")))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        // One mangled row should not sink the file
        match record {
            Ok(rec) => records.push(rec),
            Err(e) => tracing::debug!("skipping malformed csv row: {e}"),
        }
    }

    Ok((headers, records))
}

/// The date spellings seen across the CSV sources (ISO, US slash, and the
/// abbreviated month forms FINRA uses).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    // Month-only spellings land on the first of the month
    for fmt in ["%b-%y", "%b-%Y", "%B %Y", "%Y-%m"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("01-{s}"), &format!("%d-{fmt}")) {
            return Some(date);
        }
    }
    None
}

/// Excel serial date (days since 1899-12-30, the convention both FINRA and
/// Shiller workbooks use for real date cells).
pub fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=200_000.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_days(chrono::Days::new(serial as u64)))
}

/// Shiller encodes months as a year with hundredths: 1871.01 is January,
/// 1871.1 is October.
pub fn fractional_year_date(value: f64) -> Option<NaiveDate> {
    if !(1800.0..=2200.0).contains(&value) {
        return None;
    }
    let year = value.trunc() as i32;
    let month = ((value - value.trunc()) * 100.0).round() as u32;
    let month = month.clamp(1, 12);
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

pub fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

pub fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.trim().to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

pub fn cell_to_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::Float(f) => excel_serial_date(*f),
        Data::Int(i) => excel_serial_date(*i as f64),
        Data::DateTime(dt) => excel_serial_date(dt.as_f64()),
        Data::DateTimeIso(s) => {
            let prefix = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
        }
        Data::String(s) => parse_date(s),
        _ => None,
    }
}

/// Fill `{name}` placeholders in a URL template. Returns `None` when a
/// placeholder stays unresolved, so the caller can drop that candidate
/// instead of sending a broken URL upstream.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> Option<String> {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    if out.contains('{') {
        return None;
    }
    Some(out)
}
