//! Type-safe configuration: a single command-line flag layered over built-in
//! defaults with the `config` crate.
//!
//! The exporter deliberately reads no config file and no application
//! environment variables; `-web.listen-address` is the only knob exposed to
//! operators.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use serde::Deserialize;

use crate::errors::ExporterError;
use crate::fetcher::DEFAULT_UPSTREAM_URL;

/// Port the HTTP server binds when no flag is given.
pub const DEFAULT_LISTEN_ADDRESS: &str = "8080";

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(version, about = "Prometheus exporter for Spamhaus domain reputation scores")]
pub struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", value_name = "PORT", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,
}

impl Cli {
    /// Parse the process arguments, accepting the single-dash
    /// `-web.listen-address` spelling as well as the double-dash one.
    pub fn from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrite single-dash long flags (`-web.listen-address`) into the
/// double-dash form clap understands. The program name is left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| match arg.to_str() {
            Some(s) if i > 0 && s.starts_with("-web.") => OsString::from(format!("-{s}")),
            _ => arg,
        })
        .collect()
}

/// Top-level application settings.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Port (or `host:port`) for the HTTP server
    pub listen_address: String,

    /// Base of the upstream overview URL; the domain and `/overview` are appended
    pub upstream_url: String,

    /// Optional deadline for each upstream request. Unset means no timeout.
    #[serde(default, with = "humantime_serde")]
    pub upstream_timeout: Option<Duration>,
}

impl Settings {
    /// Built-in defaults, ready for further overrides.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("listen_address", DEFAULT_LISTEN_ADDRESS)?
            .set_default("upstream_url", DEFAULT_UPSTREAM_URL)
    }

    /// Defaults overridden by the command line.
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let cfg = Self::builder()?
            .set_override("listen_address", cli.listen_address.as_str())?
            .build()?;

        cfg.try_deserialize()
    }

    /// Resolve `listen_address` into a socket address.
    ///
    /// A bare port (or `:port`) binds every IPv4 interface only. Pass
    /// `[::]:port` to listen on IPv6 as well where the host is dual-stack.
    pub fn bind_addr(&self) -> Result<SocketAddr, ExporterError> {
        let raw = self.listen_address.trim();
        let candidate = if raw.starts_with(':') {
            format!("0.0.0.0{raw}")
        } else if raw.contains(':') {
            raw.to_string()
        } else {
            format!("0.0.0.0:{raw}")
        };

        candidate
            .parse()
            .map_err(|_| ExporterError::InvalidListenAddress(self.listen_address.clone()))
    }
}
