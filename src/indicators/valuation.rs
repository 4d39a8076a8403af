use crate::core::timeseries::{align_series, rolling_sum};
use crate::models::{DataPoint, NormalizedSeries};

/// Trailing-twelve-month P/E: daily closes divided by the trailing sum of
/// twelve monthly earnings figures, forward-filled onto the price dates.
/// Dates whose TTM earnings are not positive are dropped (a P/E against
/// zero or negative earnings is undefined, not infinite).
pub fn ttm_pe_series(prices: &NormalizedSeries, monthly_earnings: &NormalizedSeries) -> Vec<DataPoint> {
    let ttm_eps = rolling_sum(monthly_earnings.points(), 12);
    if ttm_eps.is_empty() {
        return Vec::new();
    }

    align_series(prices.points(), &ttm_eps)
        .into_iter()
        .filter(|(_, _, eps)| *eps > 0.0)
        .map(|(timestamp, close, eps)| DataPoint { timestamp, value: close / eps })
        .collect()
}
