use chrono::Datelike;

use crate::models::DataPoint;

/// Year-over-year growth of a monthly series: `(v_t - v_prior) / v_prior`
/// where the prior point is the one twelve calendar months earlier, matched
/// by exact year and month. Months whose prior point is missing produce no
/// value; there is no interpolation.
pub fn yoy_series(points: &[DataPoint]) -> Vec<DataPoint> {
    points
        .iter()
        .filter_map(|current| {
            let prior = points.iter().find(|p| {
                p.timestamp.year() == current.timestamp.year() - 1
                    && p.timestamp.month() == current.timestamp.month()
            })?;
            if prior.value == 0.0 {
                return None;
            }
            Some(DataPoint {
                timestamp: current.timestamp,
                value: (current.value - prior.value) / prior.value,
            })
        })
        .collect()
}

/// Latest YoY growth, or `None` when no month has a 12-months-prior match.
pub fn latest_yoy(points: &[DataPoint]) -> Option<f64> {
    yoy_series(points).last().map(|p| p.value)
}
