//! Library entrypoint: re‑export modules

pub mod config;
pub mod errors;
pub mod fetcher;
pub mod metrics;
pub mod probe;
pub mod server;
