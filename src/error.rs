use thiserror::Error;

/// Failure taxonomy for the fetch pipeline.
///
/// Staleness is deliberately not represented here: a stale value is a
/// degraded success carried on [`FetchResult`](crate::models::FetchResult),
/// not an error.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Connection failure, timeout, non-success HTTP status, or a missing
    /// local file.
    #[error("network error: {0}")]
    Network(String),

    /// Body retrieved but malformed (unreadable CSV/XLS/JSON, or empty).
    #[error("parse error: {0}")]
    Parse(String),

    /// Body is a recognizable table but an expected column is gone.
    #[error("schema drift: {0}")]
    SchemaDrift(String),
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaDrift(msg.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
