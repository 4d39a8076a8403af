use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;

use crate::error::FetchError;
use crate::models::TableData;

pub mod cboe;
pub mod coingecko;
pub mod finra;
pub mod fred;
pub mod holdings;
pub mod local_proxy;
pub mod prices;
pub mod shiller;
pub mod tabular;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; MacroDashboardBot/1.0)";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// One candidate location for a source's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Http(String),
    File(PathBuf),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Http(url) => write!(f, "{url}"),
            Endpoint::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// GET a body with a finite timeout. Non-2xx statuses are network errors,
/// same as an unreachable host.
pub async fn get_bytes(url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    let resp = HTTP_CLIENT.get(url).timeout(timeout).send().await?;

    if !resp.status().is_success() {
        return Err(FetchError::network(format!("HTTP {} from {}", resp.status(), url)));
    }

    Ok(resp.bytes().await?.to_vec())
}

/// One upstream provider family. Adapters hold configuration only; no state
/// survives between calls, so distinct sources are safe to fetch concurrently.
///
/// `params` selects what to fetch within the family: an instrument key for
/// prices, a series id for FRED, a column name for multi-column files.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    /// Validity window for cached results of this source.
    fn ttl(&self) -> Duration;

    fn timeout(&self) -> Duration {
        Duration::from_secs(20)
    }

    /// Ordered candidate endpoints (primary first). Empty when the params
    /// are unknown to this adapter.
    fn candidates(&self, params: &str) -> Vec<Endpoint>;

    /// Transport only. The default covers HTTP and local files; test stubs
    /// override this to serve canned bodies and count calls.
    async fn retrieve(&self, endpoint: &Endpoint) -> Result<Vec<u8>, FetchError> {
        match endpoint {
            Endpoint::Http(url) => get_bytes(url, self.timeout()).await,
            Endpoint::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| FetchError::network(format!("{}: {}", path.display(), e))),
        }
    }

    /// Pure: raw body in, normalized table out. Never panics on malformed
    /// input; unexpected-but-recognizable layouts are `SchemaDrift`.
    fn parse(&self, raw: &[u8], params: &str) -> Result<TableData, FetchError>;
}
