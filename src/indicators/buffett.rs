use crate::core::timeseries::align_series;
use crate::models::{DataPoint, NormalizedSeries};

/// Buffett indicator: total market capitalization over GDP. Both inputs come
/// from the local proxy table in the same scale (billions), so the ratio is
/// dimensionless; 1.5 means the market is worth 150% of GDP. GDP is
/// forward-filled onto the market-cap dates; non-positive GDP rows are
/// dropped.
pub fn buffett_series(market_cap: &NormalizedSeries, gdp: &NormalizedSeries) -> Vec<DataPoint> {
    align_series(market_cap.points(), gdp.points())
        .into_iter()
        .filter(|(_, _, gdp_value)| *gdp_value > 0.0)
        .map(|(timestamp, cap, gdp_value)| DataPoint { timestamp, value: cap / gdp_value })
        .collect()
}
