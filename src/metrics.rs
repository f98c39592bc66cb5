//! Prometheus registries and metric definitions.
//!
//! Two registries are kept apart: [`ScoreMetrics`] carries only the
//! republished reputation gauges and is what `/probe` renders, while
//! [`ExporterMetrics`] instruments the exporter itself and is only added to
//! the `/metrics` output.

use prometheus::proto::MetricFamily;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::errors::ExporterError;
use crate::fetcher::DomainScores;

/// Gauges holding the scores of the most recent probe.
#[derive(Clone)]
pub struct ScoreMetrics {
    registry: Registry,
    score: GaugeVec,
    dimension: GaugeVec,
}

impl ScoreMetrics {
    pub fn new() -> Result<Self, ExporterError> {
        let registry = Registry::new();

        let score = GaugeVec::new(
            Opts::new("spamhaus_score", "Spamhaus score for the given domain"),
            &["domain"],
        )?;
        let dimension = GaugeVec::new(
            Opts::new(
                "spamhaus_score_dimension",
                "Spamhaus dimension scores for the given domain",
            ),
            &["domain", "dimension"],
        )?;

        registry.register(Box::new(score.clone()))?;
        registry.register(Box::new(dimension.clone()))?;

        Ok(ScoreMetrics { registry, score, dimension })
    }

    /// Drop every labelled child of both gauge vectors.
    pub fn reset(&self) {
        self.score.reset();
        self.dimension.reset();
    }

    /// Set the overall gauge and all five dimension gauges for `domain`.
    pub fn record(&self, domain: &str, scores: &DomainScores) {
        self.score.with_label_values(&[domain]).set(scores.score);
        for (name, value) in scores.dimensions.labelled() {
            self.dimension.with_label_values(&[domain, name]).set(value);
        }
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Self-instrumentation: probe and fetch counters plus fetch latency.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    pub probes: IntCounter,
    pub fetches: IntCounterVec,
    pub fetch_duration: Histogram,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, ExporterError> {
        let registry = Registry::new_custom(Some("spamhaus_exporter".into()), None)?;

        let probes = IntCounter::with_opts(Opts::new("probes_total", "Total number of probe requests"))?;
        let fetches = IntCounterVec::new(
            Opts::new("fetches_total", "Upstream fetch attempts by outcome"),
            &["outcome"],
        )?;
        let fetch_duration = Histogram::with_opts(HistogramOpts::new(
            "fetch_duration_seconds",
            "Duration of upstream fetch+parse in seconds",
        ))?;

        registry.register(Box::new(probes.clone()))?;
        registry.register(Box::new(fetches.clone()))?;
        registry.register(Box::new(fetch_duration.clone()))?;

        Ok(ExporterMetrics { registry, probes, fetches, fetch_duration })
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Encode metric families in the text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, ExporterError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    // The text encoder only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// MIME type expected by Prometheus scrapers.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
