//! LARDER Service - Cache-Aside Orchestration
//!
//! This crate provides [`ItemCacheService`], which serves item reads from a
//! cache region when it can and from the authoritative entity store when it
//! must, tracking where each read was served from with shared counters.
//!
//! Transport (HTTP routing, request marshalling) lives outside this crate;
//! callers hand it an [`ItemId`](larder_core::ItemId) or an
//! [`ItemDraft`](larder_core::ItemDraft) and receive typed results.

pub mod counters;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use counters::{CounterSnapshot, MetricsCounters};
pub use service::ItemCacheService;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
