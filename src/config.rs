use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

// ============================================================================
// SOURCE IDS
// ============================================================================

pub const SRC_PRICES: &str = "prices";
pub const SRC_FRED: &str = "fred";
pub const SRC_CBOE_VIX: &str = "cboe_vix";
pub const SRC_CBOE_PUTCALL: &str = "cboe_putcall";
pub const SRC_FINRA_MARGIN: &str = "finra_margin";
pub const SRC_SHILLER: &str = "shiller";
pub const SRC_HOLDINGS: &str = "holdings";
pub const SRC_COINGECKO: &str = "coingecko";
pub const SRC_LOCAL_PROXY: &str = "local_proxy";

/// Per-source knobs an operator can override without code changes:
/// validity window, network timeout, and the ordered candidate URL list.
/// Templates may contain `{stooq}`, `{yahoo}`, `{sid}`, `{ids}`, `{now}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    pub candidates: Vec<String>,
}

impl SourceSettings {
    fn new(ttl_secs: u64, timeout_secs: u64, candidates: &[&str]) -> Self {
        Self {
            ttl_secs,
            timeout_secs,
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Symbol pair for a price instrument: Stooq is tried first, Yahoo is the
/// fallback (the two providers spell the same index differently).
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentSymbols {
    pub stooq: String,
    pub yahoo: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: BTreeMap<String, SourceSettings>,
    pub instruments: BTreeMap<String, InstrumentSymbols>,
    pub local_proxy_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let mut sources = BTreeMap::new();

        sources.insert(
            SRC_PRICES.to_string(),
            SourceSettings::new(1800, 20, &[
                "https://stooq.com/q/d/l/?s={stooq}&i=d",
                "https://query1.finance.yahoo.com/v7/finance/download/{yahoo}?period1=0&period2={now}&interval=1d&events=history&includeAdjustedClose=true",
            ]),
        );
        sources.insert(
            SRC_FRED.to_string(),
            SourceSettings::new(604_800, 20, &[
                "https://fred.stlouisfed.org/series/{sid}/downloaddata/{sid}.csv",
            ]),
        );
        sources.insert(
            SRC_CBOE_VIX.to_string(),
            SourceSettings::new(86_400, 20, &[
                "https://cdn.cboe.com/api/global/us_indices/daily_prices/VIX_History.csv",
            ]),
        );
        sources.insert(
            SRC_CBOE_PUTCALL.to_string(),
            SourceSettings::new(86_400, 20, &[
                "https://cdn.cboe.com/api/global/us_indices/put_call_ratio/historical_put_call_ratios.csv",
            ]),
        );
        // FINRA moves the statistics file every year; candidates are tried in order.
        sources.insert(
            SRC_FINRA_MARGIN.to_string(),
            SourceSettings::new(2_592_000, 30, &[
                "https://www.finra.org/sites/default/files/2024-07/industry-margin-statistics.xlsx",
                "https://www.finra.org/sites/default/files/2023-07/industry-margin-statistics.xlsx",
                "https://www.finra.org/sites/default/files/industry-margin-statistics.xlsx",
            ]),
        );
        sources.insert(
            SRC_SHILLER.to_string(),
            SourceSettings::new(604_800, 30, &[
                "http://www.econ.yale.edu/~shiller/data/ie_data.xls",
            ]),
        );
        sources.insert(
            SRC_HOLDINGS.to_string(),
            SourceSettings::new(43_200, 20, &[
                "https://www.ssga.com/us/en/institutional/etfs/library-content/products/fund-data/etfs/us/holdings-daily-us-en-spy.csv",
            ]),
        );
        sources.insert(
            SRC_COINGECKO.to_string(),
            SourceSettings::new(300, 20, &[
                "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd&ids={ids}&price_change_percentage=1h,24h,7d",
            ]),
        );
        sources.insert(
            SRC_LOCAL_PROXY.to_string(),
            SourceSettings::new(604_800, 20, &[]),
        );

        let mut instruments = BTreeMap::new();
        let pairs: &[(&str, &str, &str)] = &[
            ("spx", "^spx", "^GSPC"),
            ("ndx", "^ndx", "^NDX"),
            ("rut", "^rut", "^RUT"),
            ("stoxx600", "stoxx600", "^STOXX"),
            ("dax", "^dax", "^GDAXI"),
            ("ftse", "^ukx", "^FTSE"),
            ("nikkei", "^nkx", "^N225"),
            ("topix", "topix", "^TOPX"),
            ("hang_seng", "^hsi", "^HSI"),
            ("wti", "cl.f", "CL=F"),
            ("brent", "br.f", "BZ=F"),
            ("gold", "xauusd", "GC=F"),
            ("copper", "hg.f", "HG=F"),
        ];
        for (key, stooq, yahoo) in pairs {
            instruments.insert(
                key.to_string(),
                InstrumentSymbols { stooq: stooq.to_string(), yahoo: yahoo.to_string() },
            );
        }

        Self {
            sources,
            instruments,
            local_proxy_path: PathBuf::from("data/wilshire_5000_proxy.csv"),
        }
    }
}

impl Settings {
    /// Per-source settings, falling back to a conservative default for
    /// sources registered outside the built-in table (e.g. test stubs).
    pub fn source(&self, id: &str) -> SourceSettings {
        self.sources
            .get(id)
            .cloned()
            .unwrap_or_else(|| SourceSettings::new(3600, 20, &[]))
    }

    /// Load overrides from a TOML file on top of the defaults. Only the
    /// fields present in the file are replaced, so an operator can redirect
    /// one broken candidate list without restating TTLs.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let overlay: SettingsFile =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

        let mut settings = Self::default();
        settings.apply(overlay);
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing or unreadable file just means
    /// defaults (with a warning), so the dashboard still comes up.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("settings: {err:#}; using defaults");
                Self::default()
            }
        }
    }

    fn apply(&mut self, overlay: SettingsFile) {
        for (id, over) in overlay.sources {
            let mut merged = self.source(&id);
            if let Some(ttl) = over.ttl_secs {
                merged.ttl_secs = ttl;
            }
            if let Some(timeout) = over.timeout_secs {
                merged.timeout_secs = timeout;
            }
            if let Some(candidates) = over.candidates {
                merged.candidates = candidates;
            }
            self.sources.insert(id, merged);
        }
        for (key, symbols) in overlay.instruments {
            self.instruments.insert(key, symbols);
        }
        if let Some(path) = overlay.local_proxy_path {
            self.local_proxy_path = path;
        }
    }
}

// On-disk shape: everything optional so partial overrides merge cleanly.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    sources: BTreeMap<String, SourceSettingsFile>,
    instruments: BTreeMap<String, InstrumentSymbols>,
    local_proxy_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceSettingsFile {
    ttl_secs: Option<u64>,
    timeout_secs: Option<u64>,
    candidates: Option<Vec<String>>,
}
