//! fetcher.rs
//!
//! Talks to the Spamhaus intel API: one GET per domain, body classified as
//! either an HTML error page or the JSON overview document.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::Settings;
use crate::errors::{ExporterError, FetchError};

/// Base of the public overview endpoint; `<domain>/overview` is appended.
pub const DEFAULT_UPSTREAM_URL: &str =
    "https://www.spamhaus.org/api/v1/sia-proxy/api/intel/v2/byobject/domain/";

/// Overall reputation plus the five sub-scores for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DomainScores {
    pub score: f64,
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Dimensions {
    pub human: f64,
    pub identity: f64,
    pub infra: f64,
    pub malware: f64,
    pub smtp: f64,
}

impl Dimensions {
    /// `(label, value)` pairs in exposition order.
    pub fn labelled(&self) -> [(&'static str, f64); 5] {
        [
            ("human", self.human),
            ("identity", self.identity),
            ("infra", self.infra),
            ("malware", self.malware),
            ("smtp", self.smtp),
        ]
    }
}

/// Client for the upstream overview endpoint.
#[derive(Debug, Clone)]
pub struct SpamhausClient {
    client: Client,
    base_url: String,
}

impl SpamhausClient {
    /// Build a client from settings. No default headers are set and, unless
    /// `upstream_timeout` is configured, requests may block indefinitely.
    pub fn new(settings: &Settings) -> Result<Self, ExporterError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.upstream_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(SpamhausClient {
            client: builder.build()?,
            base_url: settings.upstream_url.clone(),
        })
    }

    /// Overview URL for `domain`. The domain is not validated or escaped.
    pub fn overview_url(&self, domain: &str) -> String {
        format!("{}{}/overview", self.base_url, domain)
    }

    /// Fetch and classify the overview document for `domain`.
    pub async fn fetch(&self, domain: &str) -> Result<DomainScores, FetchError> {
        let url = self.overview_url(domain);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(domain.to_string(), e))?;
        let status = resp.status();

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(domain.to_string(), e))?;

        debug!(domain = %domain, %status, bytes = body.len(), "Upstream responded");

        parse_overview(domain, &body)
    }
}

/// Classify an upstream body. Error pages come back as HTML, so a leading
/// `<` short-circuits before any JSON decoding is attempted.
pub fn parse_overview(domain: &str, body: &[u8]) -> Result<DomainScores, FetchError> {
    if body.first() == Some(&b'<') {
        return Err(FetchError::UnexpectedHtml(domain.to_string()));
    }

    serde_json::from_slice(body).map_err(|e| FetchError::Decode(domain.to_string(), e))
}
