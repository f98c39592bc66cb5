//! probe.rs
//!
//! The fetch-and-publish cycle: reset the score registry, walk the targets in
//! order, and render what succeeded.
//!
//! One long-lived registry is shared by `/probe` and `/metrics`. A single
//! async mutex serializes reset + repopulate + render, so a reader never sees
//! a half-reset registry. Concurrent probes queue behind each other, and with
//! no upstream timeout configured a hanging upstream stalls every waiter.

use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::errors::{ExporterError, FetchError};
use crate::fetcher::{DomainScores, SpamhausClient};
use crate::metrics::{encode_text, ExporterMetrics, ScoreMetrics};

/// Result of fetching one target.
#[derive(Debug)]
pub struct DomainOutcome {
    pub domain: String,
    pub result: Result<DomainScores, FetchError>,
}

impl DomainOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-domain outcomes of one probe plus the snapshot rendered at its end.
#[derive(Debug)]
pub struct ProbeReport {
    pub outcomes: Vec<DomainOutcome>,
    pub body: String,
}

impl ProbeReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DomainOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DomainOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Owns the score registry and the upstream client.
pub struct Prober {
    client: SpamhausClient,
    scores: Mutex<ScoreMetrics>,
    telemetry: ExporterMetrics,
}

impl Prober {
    pub fn new(client: SpamhausClient) -> Result<Self, ExporterError> {
        Ok(Prober {
            client,
            scores: Mutex::new(ScoreMetrics::new()?),
            telemetry: ExporterMetrics::new()?,
        })
    }

    /// Replace the registry contents with fresh scores for `targets`.
    ///
    /// Fetch failures are logged and reported but never abort the batch; a
    /// probe where every target fails still succeeds with an empty snapshot.
    /// An empty target list is rejected before the registry is touched.
    #[instrument(skip(self, targets), fields(count = targets.len()))]
    pub async fn probe(&self, targets: &[String]) -> Result<ProbeReport, ExporterError> {
        if targets.is_empty() {
            return Err(ExporterError::MissingParameter("target"));
        }

        let scores = self.scores.lock().await;
        self.telemetry.probes.inc();
        scores.reset();

        let mut outcomes = Vec::with_capacity(targets.len());
        for domain in targets {
            let start = Instant::now();
            let result = self.client.fetch(domain).await;
            self.telemetry
                .fetch_duration
                .observe(start.elapsed().as_secs_f64());

            match &result {
                Ok(data) => {
                    scores.record(domain, data);
                    self.telemetry.fetches.with_label_values(&["success"]).inc();
                }
                Err(e) => {
                    self.telemetry.fetches.with_label_values(&[e.kind()]).inc();
                    error!(domain = %domain, error = %e, "Error fetching data for domain");
                }
            }

            outcomes.push(DomainOutcome { domain: domain.clone(), result });
        }

        let body = encode_text(&scores.gather())?;
        drop(scores);

        let ok = outcomes.iter().filter(|o| o.is_success()).count();
        info!(succeeded = ok, failed = outcomes.len() - ok, "Probe complete");

        Ok(ProbeReport { outcomes, body })
    }

    /// Render the score registry as left by the last probe, followed by the
    /// exporter's own metrics. Waits for any in-flight probe.
    pub async fn render(&self) -> Result<String, ExporterError> {
        let mut families = self.scores.lock().await.gather();
        families.extend(self.telemetry.gather());
        encode_text(&families)
    }

    /// Render only the score registry.
    pub async fn render_scores(&self) -> Result<String, ExporterError> {
        let families = self.scores.lock().await.gather();
        encode_text(&families)
    }
}
