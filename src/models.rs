use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Unit/scale of a series, so callers can format values correctly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Unit {
    /// Raw index level (e.g. S&P 500 close, VIX)
    Index,
    /// Percentage points (e.g. HY OAS 4.26 -> "4.26%")
    Percent,
    /// USD price
    UsdPrice,
    /// Dimensionless ratio (e.g. P/E, put/call, market cap / GDP)
    Ratio,
    /// Already in billions from source
    Billions,
    /// Already in millions from source (e.g. FINRA margin statistics)
    Millions,
}

/// A time series in the common shape every adapter normalizes into:
/// timestamps strictly increasing and unique. Gaps are allowed (non-trading
/// days). The constructor sorts and deduplicates; on duplicate timestamps
/// the last parsed value wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub source_id: String,
    pub unit: Unit,
    points: Vec<DataPoint>,
}

impl NormalizedSeries {
    pub fn from_points(source_id: impl Into<String>, unit: Unit, mut points: Vec<DataPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);

        let mut deduped: Vec<DataPoint> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(prev) if prev.timestamp == p.timestamp => *prev = p,
                _ => deduped.push(p),
            }
        }

        Self {
            source_id: source_id.into(),
            unit,
            points: deduped,
        }
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One row of a cross-sectional holdings snapshot. Weight is a fraction
/// (0.07 = 7% of the fund).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingsTable {
    pub source_id: String,
    pub as_of: Option<DateTime<Utc>>,
    pub rows: Vec<Holding>,
}

/// A spot quote from the public market-data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetQuote {
    pub id: String,
    pub price: f64,
    pub change_24h_pct: Option<f64>,
    pub change_7d_pct: Option<f64>,
}

/// What an adapter parses a response body into. Most sources are time
/// series; holdings and spot quotes are cross-sectional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableData {
    Series(NormalizedSeries),
    Holdings(HoldingsTable),
    Quotes(Vec<AssetQuote>),
}

impl TableData {
    pub fn is_empty(&self) -> bool {
        match self {
            TableData::Series(s) => s.is_empty(),
            TableData::Holdings(h) => h.rows.is_empty(),
            TableData::Quotes(q) => q.is_empty(),
        }
    }

    pub fn as_series(&self) -> Option<&NormalizedSeries> {
        match self {
            TableData::Series(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_holdings(&self) -> Option<&HoldingsTable> {
        match self {
            TableData::Holdings(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_quotes(&self) -> Option<&[AssetQuote]> {
        match self {
            TableData::Quotes(q) => Some(q),
            _ => None,
        }
    }
}

/// Availability of a fetch result. `Stale` means the value came from an
/// expired cache entry after a failed refresh; it is a degraded success,
/// not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    Fresh,
    Stale,
    Unavailable,
}

/// The outcome of resolving one source, annotated with when the data was
/// actually retrieved. `Unavailable` carries no data and an error reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub source_id: String,
    pub params: String,
    pub status: FetchStatus,
    pub fetched_at: DateTime<Utc>,
    pub data: Option<TableData>,
    pub error: Option<String>,
}

impl FetchResult {
    pub fn fresh(source_id: &str, params: &str, data: TableData) -> Self {
        Self {
            source_id: source_id.to_string(),
            params: params.to_string(),
            status: FetchStatus::Fresh,
            fetched_at: Utc::now(),
            data: Some(data),
            error: None,
        }
    }

    pub fn unavailable(source_id: &str, params: &str, err: FetchError) -> Self {
        Self {
            source_id: source_id.to_string(),
            params: params.to_string(),
            status: FetchStatus::Unavailable,
            fetched_at: Utc::now(),
            data: None,
            error: Some(err.to_string()),
        }
    }

    /// Clone with a different status label. The original `fetched_at` is
    /// kept so callers can see how old a stale value actually is.
    pub fn with_status(&self, status: FetchStatus) -> Self {
        let mut out = self.clone();
        out.status = status;
        out
    }

    pub fn series(&self) -> Option<&NormalizedSeries> {
        self.data.as_ref().and_then(|d| d.as_series())
    }

    pub fn holdings(&self) -> Option<&HoldingsTable> {
        self.data.as_ref().and_then(|d| d.as_holdings())
    }

    pub fn quotes(&self) -> Option<&[AssetQuote]> {
        self.data.as_ref().and_then(|d| d.as_quotes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_series_sorts_and_dedups() {
        let points = vec![
            DataPoint { timestamp: ts(3), value: 3.0 },
            DataPoint { timestamp: ts(1), value: 1.0 },
            DataPoint { timestamp: ts(3), value: 30.0 },
            DataPoint { timestamp: ts(2), value: 2.0 },
        ];
        let series = NormalizedSeries::from_points("test", Unit::Index, points);

        assert_eq!(series.len(), 3);
        // Last value wins on the duplicated timestamp
        assert_eq!(series.values(), vec![1.0, 2.0, 30.0]);
        assert!(series.points().windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_relabel_keeps_fetched_at() {
        let series = NormalizedSeries::from_points("test", Unit::Index, vec![]);
        let mut result = FetchResult::fresh("test", "", TableData::Series(series));
        result.fetched_at = ts(1);

        let stale = result.with_status(FetchStatus::Stale);
        assert_eq!(stale.status, FetchStatus::Stale);
        assert_eq!(stale.fetched_at, ts(1));
        assert!(stale.data.is_some());
    }
}
