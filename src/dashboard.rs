//! The surface the rendering layer consumes: per-indicator reports carrying
//! a value and/or series, a "data as of" timestamp, and an availability
//! flag. Rendering never touches adapters or cache internals, and a failed
//! source degrades exactly one tile to "unavailable" instead of sinking the
//! page.

use chrono::{DateTime, Utc};

use crate::config::{
    Settings, SRC_CBOE_PUTCALL, SRC_CBOE_VIX, SRC_COINGECKO, SRC_FINRA_MARGIN, SRC_FRED,
    SRC_HOLDINGS, SRC_LOCAL_PROXY, SRC_PRICES, SRC_SHILLER,
};
use crate::core::cache::CacheLayer;
use crate::core::orchestrator::Orchestrator;
use crate::indicators::buffett::buffett_series;
use crate::indicators::concentration::top_n_concentration;
use crate::indicators::margin::yoy_series;
use crate::indicators::sentiment::greed_score_series;
use crate::indicators::technicals::{calculate_rsi, calculate_sma, current_drawdown};
use crate::indicators::valuation::ttm_pe_series;
use crate::models::{AssetQuote, DataPoint, FetchResult, FetchStatus, NormalizedSeries, Unit};

/// FRED series id for the high-yield option-adjusted spread used by the
/// sentiment composite.
const HY_OAS_SERIES: &str = "BAMLH0A0HYM2";

#[derive(Debug, Clone)]
pub struct IndicatorReport {
    pub name: String,
    pub value: Option<f64>,
    pub series: Option<NormalizedSeries>,
    pub as_of: Option<DateTime<Utc>>,
    pub status: FetchStatus,
    pub source: String,
    pub note: Option<String>,
}

impl IndicatorReport {
    fn unavailable(name: &str, source: &str, note: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            series: None,
            as_of: None,
            status: FetchStatus::Unavailable,
            source: source.to_string(),
            note,
        }
    }

    fn from_points(
        name: &str,
        source: &str,
        status: FetchStatus,
        unit: Unit,
        points: Vec<DataPoint>,
    ) -> Self {
        if points.is_empty() {
            return Self {
                name: name.to_string(),
                value: None,
                series: None,
                as_of: None,
                status,
                source: source.to_string(),
                note: Some("insufficient data".to_string()),
            };
        }

        let series = NormalizedSeries::from_points(slugify(name), unit, points);
        Self {
            name: name.to_string(),
            value: series.last().map(|p| p.value),
            as_of: series.last_timestamp(),
            status,
            source: source.to_string(),
            note: None,
            series: Some(series),
        }
    }
}

/// Per-instrument trend diagnostics, all derived from one price series.
#[derive(Debug, Clone)]
pub struct TrendReport {
    pub instrument: String,
    pub close: Option<NormalizedSeries>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub rsi_14: Option<f64>,
    pub drawdown: Option<f64>,
    /// Last close relative to the 200-day average, e.g. 0.03 = 3% above.
    pub dist_200dma: Option<f64>,
    pub golden_cross: Option<bool>,
    pub as_of: Option<DateTime<Utc>>,
    pub status: FetchStatus,
}

#[derive(Debug, Clone)]
pub struct QuotesReport {
    pub quotes: Vec<AssetQuote>,
    pub status: FetchStatus,
    pub fetched_at: DateTime<Utc>,
}

/// The six headline tiles, computed concurrently.
#[derive(Debug, Clone)]
pub struct Overview {
    pub ttm_pe: IndicatorReport,
    pub cape: IndicatorReport,
    pub buffett: IndicatorReport,
    pub margin_debt_yoy: IndicatorReport,
    pub concentration_top10: IndicatorReport,
    pub sentiment: IndicatorReport,
}

impl Overview {
    pub fn reports(&self) -> [&IndicatorReport; 6] {
        [
            &self.ttm_pe,
            &self.cape,
            &self.buffett,
            &self.margin_debt_yoy,
            &self.concentration_top10,
            &self.sentiment,
        ]
    }
}

pub struct Dashboard {
    cache: CacheLayer,
}

impl Dashboard {
    pub fn new(settings: &Settings) -> Self {
        Self::with_orchestrator(Orchestrator::with_defaults(settings))
    }

    /// Wire against an explicit orchestrator (tests register stub adapters
    /// this way).
    pub fn with_orchestrator(orchestrator: Orchestrator) -> Self {
        Self { cache: CacheLayer::new(orchestrator) }
    }

    pub async fn overview(&self) -> Overview {
        let (ttm_pe, cape, buffett, margin_debt_yoy, concentration_top10, sentiment) = tokio::join!(
            self.ttm_pe(),
            self.cape(),
            self.buffett_indicator(),
            self.margin_debt_yoy(),
            self.concentration_top10(),
            self.sentiment(),
        );

        Overview { ttm_pe, cape, buffett, margin_debt_yoy, concentration_top10, sentiment }
    }

    pub async fn ttm_pe(&self) -> IndicatorReport {
        let name = "S&P 500 TTM P/E";
        let source = "Prices: Stooq/Yahoo; Earnings: Yale/Shiller";

        let (prices, earnings) = tokio::join!(
            self.cache.get(SRC_PRICES, "spx"),
            self.cache.get(SRC_SHILLER, "earnings"),
        );

        match (prices.series(), earnings.series()) {
            (Some(price_series), Some(earnings_series)) => IndicatorReport::from_points(
                name,
                source,
                worst_status(&[&prices, &earnings]),
                Unit::Ratio,
                ttm_pe_series(price_series, earnings_series),
            ),
            _ => IndicatorReport::unavailable(name, source, first_error(&[&prices, &earnings])),
        }
    }

    pub async fn cape(&self) -> IndicatorReport {
        let name = "Shiller CAPE";
        let source = "Yale/Shiller";

        let result = self.cache.get(SRC_SHILLER, "cape").await;
        match result.series() {
            Some(series) => IndicatorReport::from_points(
                name,
                source,
                result.status,
                Unit::Ratio,
                series.points().to_vec(),
            ),
            None => IndicatorReport::unavailable(name, source, result.error.clone()),
        }
    }

    pub async fn buffett_indicator(&self) -> IndicatorReport {
        let name = "Buffett Indicator";
        let source = "Local proxy (Wilshire + GDP)";

        let (cap, gdp) = tokio::join!(
            self.cache.get(SRC_LOCAL_PROXY, "market_cap"),
            self.cache.get(SRC_LOCAL_PROXY, "gdp"),
        );

        match (cap.series(), gdp.series()) {
            (Some(cap_series), Some(gdp_series)) => IndicatorReport::from_points(
                name,
                source,
                worst_status(&[&cap, &gdp]),
                Unit::Ratio,
                buffett_series(cap_series, gdp_series),
            ),
            _ => IndicatorReport::unavailable(name, source, first_error(&[&cap, &gdp])),
        }
    }

    pub async fn margin_debt_yoy(&self) -> IndicatorReport {
        let name = "Margin Debt YoY";
        let source = "FINRA";

        let result = self.cache.get(SRC_FINRA_MARGIN, "margin_debt").await;
        match result.series() {
            Some(series) => IndicatorReport::from_points(
                name,
                source,
                result.status,
                Unit::Ratio,
                yoy_series(series.points()),
            ),
            None => IndicatorReport::unavailable(name, source, result.error.clone()),
        }
    }

    pub async fn concentration_top10(&self) -> IndicatorReport {
        let name = "SPY Top-10 Concentration";
        let source = "State Street (SPY holdings)";

        let result = self.cache.get(SRC_HOLDINGS, "spy").await;
        let Some(table) = result.holdings() else {
            return IndicatorReport::unavailable(name, source, result.error.clone());
        };

        match top_n_concentration(table, 10) {
            Some(conc) => IndicatorReport {
                name: name.to_string(),
                value: Some(conc.top_n),
                series: None,
                as_of: table.as_of.or(Some(result.fetched_at)),
                status: result.status,
                source: source.to_string(),
                note: conc.suspect.then(|| {
                    format!("weights sum to {:.1}%; snapshot suspect", conc.total * 100.0)
                }),
            },
            None => IndicatorReport {
                note: Some("insufficient data".to_string()),
                status: result.status,
                ..IndicatorReport::unavailable(name, source, None)
            },
        }
    }

    pub async fn sentiment(&self) -> IndicatorReport {
        let name = "Sentiment (greed proxy 0-100)";
        let source = "CBOE (VIX, Put/Call), FRED (HY OAS)";

        let (vix, putcall, hy_oas) = tokio::join!(
            self.cache.get(SRC_CBOE_VIX, "vix"),
            self.cache.get(SRC_CBOE_PUTCALL, "total"),
            self.cache.get(SRC_FRED, HY_OAS_SERIES),
        );

        match (vix.series(), putcall.series(), hy_oas.series()) {
            (Some(vix_series), Some(pcr_series), Some(oas_series)) => IndicatorReport::from_points(
                name,
                source,
                worst_status(&[&vix, &putcall, &hy_oas]),
                Unit::Index,
                greed_score_series(vix_series, pcr_series, oas_series),
            ),
            _ => IndicatorReport::unavailable(name, source, first_error(&[&vix, &putcall, &hy_oas])),
        }
    }

    pub async fn asset_trend(&self, instrument: &str) -> TrendReport {
        let result = self.cache.get(SRC_PRICES, instrument).await;

        let Some(series) = result.series() else {
            return TrendReport {
                instrument: instrument.to_string(),
                close: None,
                sma_50: None,
                sma_200: None,
                rsi_14: None,
                drawdown: None,
                dist_200dma: None,
                golden_cross: None,
                as_of: None,
                status: FetchStatus::Unavailable,
            };
        };

        let closes = series.values();
        let sma_50 = calculate_sma(&closes, 50);
        let sma_200 = calculate_sma(&closes, 200);
        let last_close = closes.last().copied();

        TrendReport {
            instrument: instrument.to_string(),
            sma_50,
            sma_200,
            rsi_14: calculate_rsi(&closes, 14),
            drawdown: current_drawdown(series.points()),
            dist_200dma: match (last_close, sma_200) {
                (Some(close), Some(sma)) if sma > 0.0 => Some(close / sma - 1.0),
                _ => None,
            },
            golden_cross: match (sma_50, sma_200) {
                (Some(fast), Some(slow)) => Some(fast > slow),
                _ => None,
            },
            as_of: series.last_timestamp(),
            status: result.status,
            close: Some(series.clone()),
        }
    }

    pub async fn crypto_quotes(&self, ids: &str) -> QuotesReport {
        let result = self.cache.get(SRC_COINGECKO, ids).await;
        QuotesReport {
            quotes: result.quotes().map(<[AssetQuote]>::to_vec).unwrap_or_default(),
            status: result.status,
            fetched_at: result.fetched_at,
        }
    }

    /// Raw access for tiles that plot a source directly (e.g. treasury
    /// yields from FRED). Still cache-mediated.
    pub async fn raw_series(&self, source_id: &str, params: &str) -> FetchResult {
        self.cache.get(source_id, params).await
    }
}

fn worst_status(results: &[&FetchResult]) -> FetchStatus {
    if results.iter().any(|r| r.status == FetchStatus::Unavailable) {
        FetchStatus::Unavailable
    } else if results.iter().any(|r| r.status == FetchStatus::Stale) {
        FetchStatus::Stale
    } else {
        FetchStatus::Fresh
    }
}

fn first_error(results: &[&FetchResult]) -> Option<String> {
    results.iter().find_map(|r| r.error.clone())
}

fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
