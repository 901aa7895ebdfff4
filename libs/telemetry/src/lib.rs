//! Tracing setup shared by the feishu bot binaries.
//!
//! Logs go to stdout through `tracing-subscriber` (text or JSON, filtered by
//! `RUST_LOG`). Spans are additionally exported over OTLP when `ENABLE_OTEL`
//! is set and an endpoint is configured.

mod config;
mod tracing_init;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use tracing_init::{init_telemetry, telemetry_enabled};
