//! Storefront Telemetry
//!
//! Structured logging for the API layer. Request spans come from
//! `tower-http`'s `TraceLayer`; cache events are emitted by the storage
//! crate and land in the same subscriber.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
