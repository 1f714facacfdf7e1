//! Observability: codec counters and the sink they flow through.
//!
//! Library code never touches the counters directly; it emits
//! [`MetricsEvent`]s through [`sink::record`]. Structured log lines go through
//! `tracing` at the call sites and need a subscriber installed by the host.

pub(crate) mod metrics;
pub(crate) mod sink;

#[cfg(test)]
mod tests;

// re-exports
pub use metrics::CodecMetrics;
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset, with_metrics_sink};
