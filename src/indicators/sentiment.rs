use crate::core::timeseries::align_series_multi;
use crate::models::{DataPoint, NormalizedSeries};

// Fixed component weights for the composite. All three inputs rise with
// fear, so the weighted z-score is a "fear" axis; the logistic map turns it
// into a greed score with the same orientation as the familiar 0-100
// fear/greed gauges (high = greed).
const W_VIX: f64 = 0.4;
const W_PUTCALL: f64 = 0.3;
const W_HY_OAS: f64 = 0.3;

/// Minimum aligned observations before z-scores mean anything.
const MIN_OVERLAP: usize = 30;

/// Composite sentiment from VIX, total put/call ratio and HY OAS.
///
/// The three series are forward-filled onto their common timeline; each is
/// standardized against its own mean and deviation over that window; the
/// weighted sum `0.4*z_vix + 0.3*z_pcr + 0.3*z_oas` is mapped through
/// `100 / (1 + e^z)`. Neutral markets score 50; panics drive the score
/// toward 0, froth toward 100. A degenerate (constant) component
/// contributes z = 0.
pub fn greed_score_series(
    vix: &NormalizedSeries,
    putcall: &NormalizedSeries,
    hy_oas: &NormalizedSeries,
) -> Vec<DataPoint> {
    let aligned = align_series_multi(&[vix.points(), putcall.points(), hy_oas.points()]);
    if aligned.len() < MIN_OVERLAP {
        return Vec::new();
    }

    let stats: Vec<(f64, f64)> = (0..3)
        .map(|i| {
            let column: Vec<f64> = aligned.iter().map(|(_, values)| values[i]).collect();
            mean_and_std(&column)
        })
        .collect();

    aligned
        .iter()
        .map(|(timestamp, values)| {
            let z = |i: usize| {
                let (mean, std) = stats[i];
                if std == 0.0 {
                    0.0
                } else {
                    (values[i] - mean) / std
                }
            };
            let fear = W_VIX * z(0) + W_PUTCALL * z(1) + W_HY_OAS * z(2);
            DataPoint {
                timestamp: *timestamp,
                value: 100.0 / (1.0 + fear.exp()),
            }
        })
        .collect()
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;
    use chrono::{TimeZone, Utc};

    fn daily(source: &str, values: Vec<f64>) -> NormalizedSeries {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| DataPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64),
                value,
            })
            .collect();
        NormalizedSeries::from_points(source, Unit::Index, points)
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((W_VIX + W_PUTCALL + W_HY_OAS - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_inputs_score_neutral_50() {
        let vix = daily("vix", vec![15.0; 40]);
        let pcr = daily("pcr", vec![0.9; 40]);
        let oas = daily("oas", vec![4.0; 40]);

        let scores = greed_score_series(&vix, &pcr, &oas);
        assert_eq!(scores.len(), 40);
        for score in &scores {
            assert!((score.value - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rising_fear_lowers_score_and_stays_bounded() {
        let ramp: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let vix = daily("vix", ramp.clone());
        let pcr = daily("pcr", ramp.clone());
        let oas = daily("oas", ramp);

        let scores = greed_score_series(&vix, &pcr, &oas);
        let first = scores.first().unwrap().value;
        let last = scores.last().unwrap().value;
        assert!(first > last, "score should fall as fear rises");
        for score in &scores {
            assert!((0.0..=100.0).contains(&score.value));
        }
    }

    #[test]
    fn test_short_overlap_is_insufficient() {
        let vix = daily("vix", vec![15.0; 10]);
        let pcr = daily("pcr", vec![0.9; 10]);
        let oas = daily("oas", vec![4.0; 10]);
        assert!(greed_score_series(&vix, &pcr, &oas).is_empty());
    }
}
