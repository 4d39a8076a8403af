use chrono::{DateTime, Utc};

use crate::models::DataPoint;

/// Align a slow series onto a master series by forward fill: for each master
/// timestamp, pair it with the latest slow value at or before it. Financial
/// data mixes frequencies constantly (daily closes against monthly earnings,
/// quarterly GDP), and forward fill is the standard join for that.
///
/// Master timestamps before the first slow point are dropped.
pub fn align_series(
    master: &[DataPoint],
    slow: &[DataPoint],
) -> Vec<(DateTime<Utc>, f64, f64)> {
    let mut result = Vec::with_capacity(master.len());
    let mut slow_iter = slow.iter().peekable();
    let mut last_slow: Option<f64> = None;

    for point in master {
        while let Some(next) = slow_iter.peek() {
            if next.timestamp <= point.timestamp {
                last_slow = Some(next.value);
                slow_iter.next();
            } else {
                break;
            }
        }
        if let Some(slow_value) = last_slow {
            result.push((point.timestamp, point.value, slow_value));
        }
    }

    result
}

/// Forward-fill several series onto the union of their timestamps. Rows are
/// emitted only once every series has produced at least one value, so the
/// warm-up period is skipped.
pub fn align_series_multi(series_list: &[&[DataPoint]]) -> Vec<(DateTime<Utc>, Vec<f64>)> {
    if series_list.is_empty() {
        return Vec::new();
    }

    let mut timestamps: Vec<DateTime<Utc>> = series_list
        .iter()
        .flat_map(|s| s.iter().map(|p| p.timestamp))
        .collect();
    timestamps.sort();
    timestamps.dedup();

    let mut iters: Vec<_> = series_list.iter().map(|s| s.iter().peekable()).collect();
    let mut current: Vec<Option<f64>> = vec![None; series_list.len()];
    let mut result = Vec::new();

    for ts in timestamps {
        for (i, iter) in iters.iter_mut().enumerate() {
            while let Some(point) = iter.peek() {
                if point.timestamp <= ts {
                    current[i] = Some(point.value);
                    iter.next();
                } else {
                    break;
                }
            }
        }

        if current.iter().all(|v| v.is_some()) {
            result.push((ts, current.iter().map(|v| v.unwrap_or(0.0)).collect()));
        }
    }

    result
}

/// Rolling sum over the trailing `window` points (used for trailing
/// twelve-month earnings from monthly figures). Emits nothing for the
/// first `window - 1` points.
pub fn rolling_sum(points: &[DataPoint], window: usize) -> Vec<DataPoint> {
    if window == 0 || points.len() < window {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(points.len() - window + 1);
    let mut sum: f64 = points[..window].iter().map(|p| p.value).sum();
    result.push(DataPoint { timestamp: points[window - 1].timestamp, value: sum });

    for i in window..points.len() {
        sum += points[i].value - points[i - window].value;
        result.push(DataPoint { timestamp: points[i].timestamp, value: sum });
    }

    result
}
