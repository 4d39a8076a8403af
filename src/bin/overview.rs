use std::path::Path;

use macro_dashboard::models::FetchStatus;
use macro_dashboard::{Dashboard, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "macro_dashboard=info".into()),
        )
        .init();

    let config_path =
        std::env::var("MACRO_DASHBOARD_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let settings = Settings::load_or_default(Path::new(&config_path));

    let dashboard = Dashboard::new(&settings);
    let overview = dashboard.overview().await;

    println!("{:<28} | {:>12} | {:<12} | {:<12}", "Indicator", "Value", "As of", "Status");
    println!("{}", "-".repeat(72));

    for report in overview.reports() {
        let value = match report.value {
            Some(v) => format!("{v:.4}"),
            None => "-".to_string(),
        };
        let as_of = report
            .as_of
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = match report.status {
            FetchStatus::Fresh => "fresh",
            FetchStatus::Stale => "STALE",
            FetchStatus::Unavailable => "UNAVAILABLE",
        };
        println!("{:<28} | {:>12} | {:<12} | {:<12}", report.name, value, as_of, status);
        if let Some(note) = &report.note {
            println!("{:<28} |   note: {}", "", note);
        }
    }

    let trend = dashboard.asset_trend("spx").await;
    println!("\nS&P 500 trend:");
    println!(
        "  rsi14={:?} sma50={:?} sma200={:?} drawdown={:?} golden_cross={:?}",
        trend.rsi_14, trend.sma_50, trend.sma_200, trend.drawdown, trend.golden_cross
    );

    Ok(())
}
