//! LARDER Telemetry - Structured Logging
//!
//! Operations emit `tracing` events and spans; this module installs the
//! subscriber that renders them.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig, DEFAULT_FILTER};
