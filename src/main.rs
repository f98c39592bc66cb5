//! Entrypoint: set up tracing, parse the listen address, and serve `/probe`,
//! `/metrics` and `/healthz` until the process is killed.

use std::net::TcpListener;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use spamhaus_exporter::config::{Cli, Settings};
use spamhaus_exporter::errors::ExporterError;
use spamhaus_exporter::fetcher::SpamhausClient;
use spamhaus_exporter::probe::Prober;
use spamhaus_exporter::server;

/// **Workflow**:
/// 1. Initialise tracing/logging from `RUST_LOG` (or default to `info`).
/// 2. Parse `-web.listen-address` and build `Settings`.
/// 3. Build the upstream client and the shared score registry.
/// 4. Bind the port (failure is fatal) and serve.
#[tokio::main]
async fn main() -> Result<(), ExporterError> {
    // ───────────────────────────────────────────────────────────────
    // 1. Initialise tracing / logging
    // ───────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // ───────────────────────────────────────────────────────────────
    // 2. Load configuration
    // ───────────────────────────────────────────────────────────────
    let cli = Cli::from_env();
    let settings = Settings::new(&cli)?;
    info!(?settings, "Loaded configuration");

    // ───────────────────────────────────────────────────────────────
    // 3. Upstream client & registry
    // ───────────────────────────────────────────────────────────────
    let client = SpamhausClient::new(&settings)?;
    let prober = Arc::new(Prober::new(client)?);

    // ───────────────────────────────────────────────────────────────
    // 4. Bind & serve
    // ───────────────────────────────────────────────────────────────
    let addr = settings.bind_addr()?;
    let listener = TcpListener::bind(addr).map_err(|e| {
        error!(%addr, error = %e, "Failed to bind listen address");
        ExporterError::Bind(addr.to_string(), e)
    })?;

    server::serve(listener, prober).await
}
