//! Centralised error types for the exporter.

use thiserror::Error;

/// Failure to obtain scores for a single domain.
///
/// These never abort a probe: the publisher logs them, records them in the
/// probe report and moves on to the next target.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error fetching {0}: {1}")]
    Transport(String, #[source] reqwest::Error),

    #[error("unexpected HTML response for domain {0}")]
    UnexpectedHtml(String),

    #[error("Decode error for {0}: {1}")]
    Decode(String, #[source] serde_json::Error),
}

impl FetchError {
    /// Short, stable label used for the `outcome` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(..) => "transport",
            FetchError::UnexpectedHtml(_) => "unexpected_html",
            FetchError::Decode(..) => "decode",
        }
    }

    /// The domain the failed fetch was for.
    pub fn domain(&self) -> &str {
        match self {
            FetchError::Transport(d, _) | FetchError::UnexpectedHtml(d) | FetchError::Decode(d, _) => d,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Missing '{0}' parameter")]
    MissingParameter(&'static str),

    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Failed to bind {0}: {1}")]
    Bind(String, #[source] std::io::Error),

    #[error("Listener setup failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("HTTP server error: {0}")]
    Server(#[from] hyper::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
