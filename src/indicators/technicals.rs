use crate::models::DataPoint;

/// Simple moving average over the trailing `period` values.
pub fn calculate_sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let sum: f64 = data.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Wilder-smoothed RSI. Needs `period + 1` points; an all-gain window
/// (zero average loss) is RSI 100, not a division blowup.
pub fn calculate_rsi(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period + 1 {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;

    // First period
    for i in 1..=period {
        let diff = data[i] - data[i - 1];
        if diff > 0.0 {
            gains += diff;
        } else {
            losses -= diff;
        }
    }

    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    // Smoothing
    for i in (period + 1)..data.len() {
        let diff = data[i] - data[i - 1];
        if diff > 0.0 {
            avg_gain = (avg_gain * (period - 1) as f64 + diff) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64) / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 - diff) / period as f64;
        }
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

/// Decline from the running peak: `(p - max_so_far) / max_so_far`, always
/// <= 0 and exactly 0 at a new all-time high. The peak never resets
/// mid-series.
pub fn drawdown_series(points: &[DataPoint]) -> Vec<DataPoint> {
    let mut running_max = f64::NEG_INFINITY;
    points
        .iter()
        .map(|p| {
            running_max = running_max.max(p.value);
            DataPoint {
                timestamp: p.timestamp,
                value: (p.value - running_max) / running_max,
            }
        })
        .collect()
}

/// Latest drawdown value, or `None` on an empty series.
pub fn current_drawdown(points: &[DataPoint]) -> Option<f64> {
    drawdown_series(points).last().map(|p| p.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn points(values: &[f64]) -> Vec<DataPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| DataPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64),
                value,
            })
            .collect()
    }

    #[test]
    fn test_sma_identity_on_constant_series() {
        let data = vec![42.5; 10];
        assert_eq!(calculate_sma(&data, 10), Some(42.5));
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 3), None);
        assert_eq!(calculate_sma(&[], 1), None);
    }

    #[test]
    fn test_rsi_needs_period_plus_one() {
        let data: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert_eq!(calculate_rsi(&data, 14), None);
    }

    #[test]
    fn test_rsi_monotonic_rise_is_100() {
        let data: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        assert_eq!(calculate_rsi(&data, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_monotonic_fall_is_0() {
        let data: Vec<f64> = (0..40).map(|i| 1000.0 - i as f64).collect();
        let rsi = calculate_rsi(&data, 14).unwrap();
        assert!(rsi.abs() < 1e-9);
    }

    #[test]
    fn test_drawdown_values() {
        let dd = drawdown_series(&points(&[100.0, 110.0, 95.0, 120.0]));
        assert_eq!(dd[0].value, 0.0); // first point is the peak so far
        assert_eq!(dd[1].value, 0.0); // new high
        assert!((dd[2].value - (95.0 - 110.0) / 110.0).abs() < 1e-12);
        assert_eq!(dd[3].value, 0.0); // recovered to a new high
    }

    #[test]
    fn test_drawdown_peak_never_resets() {
        let dd = drawdown_series(&points(&[100.0, 50.0, 60.0]));
        assert!((dd[2].value - (60.0 - 100.0) / 100.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_rsi_is_bounded(values in proptest::collection::vec(0.01f64..10_000.0, 15..120)) {
            if let Some(rsi) = calculate_rsi(&values, 14) {
                prop_assert!((0.0..=100.0).contains(&rsi), "rsi out of range: {rsi}");
            }
        }

        #[test]
        fn prop_drawdown_never_positive(values in proptest::collection::vec(0.01f64..10_000.0, 1..120)) {
            for dd in drawdown_series(&points(&values)) {
                prop_assert!(dd.value <= 1e-12, "positive drawdown: {}", dd.value);
            }
        }

        #[test]
        fn prop_sma_within_value_range(values in proptest::collection::vec(0.01f64..10_000.0, 5..60)) {
            if let Some(sma) = calculate_sma(&values, 5) {
                let tail = &values[values.len() - 5..];
                let min = tail.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(sma >= min - 1e-9 && sma <= max + 1e-9);
            }
        }
    }
}
