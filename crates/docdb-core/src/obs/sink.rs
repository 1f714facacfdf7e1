//! Metrics sink boundary.
//!
//! Codec, producer and lookup paths report through [`MetricsEvent`] and
//! [`record`]; this module is the only bridge to the counter state.
use crate::obs::metrics::{self, CodecMetrics, bump};
use std::cell::RefCell;

thread_local! {
    pub(super) static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    RecordEncoded { fields: u64, bytes: u64 },
    HeaderDecoded { fields: u64 },
    FieldLookup { hit: bool },
    PayloadDecoded,
    JsonParse { ok: bool },
    MalformedRejected,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink; used whenever no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::RecordEncoded { fields, bytes } => {
                bump(&mut m.records_encoded, 1);
                bump(&mut m.fields_encoded, fields);
                bump(&mut m.bytes_encoded, bytes);
            }
            MetricsEvent::HeaderDecoded { fields } => {
                bump(&mut m.headers_decoded, 1);
                bump(&mut m.header_fields, fields);
            }
            MetricsEvent::FieldLookup { hit: true } => bump(&mut m.field_lookup_hits, 1),
            MetricsEvent::FieldLookup { hit: false } => bump(&mut m.field_lookup_misses, 1),
            MetricsEvent::PayloadDecoded => bump(&mut m.payloads_decoded, 1),
            MetricsEvent::JsonParse { ok: true } => bump(&mut m.json_parsed, 1),
            MetricsEvent::JsonParse { ok: false } => bump(&mut m.json_failed, 1),
            MetricsEvent::MalformedRejected => bump(&mut m.malformed_rejected, 1),
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` comes from a live `&dyn MetricsSink` installed by
        //   `with_metrics_sink`, whose guard restores the previous slot on
        //   every exit, unwinding included.
        // - Only a shared reference is materialized and it does not outlive
        //   this synchronous call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the counters of the current thread.
#[must_use]
pub fn metrics_report() -> CodecMetrics {
    metrics::snapshot()
}

/// Reset the counters of the current thread.
pub fn metrics_reset() {
    metrics::reset();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The erased pointer is installed only for the dynamic scope of `f`;
    //   `Guard` puts the previous value back on all exits.
    // - `record` dereferences it synchronously and never stores it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}
