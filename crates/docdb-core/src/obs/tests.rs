use crate::obs::{
    MetricsEvent, MetricsSink, metrics_report, metrics_reset,
    sink::{SINK_OVERRIDE, record},
    with_metrics_sink,
};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::atomic::{AtomicUsize, Ordering},
};

struct CountingSink<'a> {
    calls: &'a AtomicUsize,
}

impl MetricsSink for CountingSink<'_> {
    fn record(&self, _: MetricsEvent) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn clear_override() {
    SINK_OVERRIDE.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

#[test]
fn global_sink_folds_events_into_counters() {
    clear_override();
    metrics_reset();

    record(MetricsEvent::RecordEncoded {
        fields: 3,
        bytes: 40,
    });
    record(MetricsEvent::RecordEncoded {
        fields: 1,
        bytes: 12,
    });
    record(MetricsEvent::HeaderDecoded { fields: 3 });
    record(MetricsEvent::FieldLookup { hit: true });
    record(MetricsEvent::FieldLookup { hit: false });
    record(MetricsEvent::FieldLookup { hit: false });
    record(MetricsEvent::PayloadDecoded);
    record(MetricsEvent::JsonParse { ok: true });
    record(MetricsEvent::JsonParse { ok: false });
    record(MetricsEvent::MalformedRejected);

    let report = metrics_report();
    assert_eq!(report.records_encoded, 2);
    assert_eq!(report.fields_encoded, 4);
    assert_eq!(report.bytes_encoded, 52);
    assert_eq!(report.headers_decoded, 1);
    assert_eq!(report.header_fields, 3);
    assert_eq!(report.field_lookup_hits, 1);
    assert_eq!(report.field_lookup_misses, 2);
    assert_eq!(report.payloads_decoded, 1);
    assert_eq!(report.json_parsed, 1);
    assert_eq!(report.json_failed, 1);
    assert_eq!(report.malformed_rejected, 1);

    metrics_reset();
    assert_eq!(metrics_report(), crate::obs::CodecMetrics::default());
}

#[test]
fn counters_saturate() {
    clear_override();
    metrics_reset();

    record(MetricsEvent::RecordEncoded {
        fields: u64::MAX,
        bytes: u64::MAX,
    });
    record(MetricsEvent::RecordEncoded {
        fields: 1,
        bytes: 1,
    });

    let report = metrics_report();
    assert_eq!(report.fields_encoded, u64::MAX);
    assert_eq!(report.bytes_encoded, u64::MAX);
    assert_eq!(report.records_encoded, 2);
}

#[test]
fn with_metrics_sink_routes_and_restores_nested_overrides() {
    clear_override();
    metrics_reset();

    let outer_calls = AtomicUsize::new(0);
    let inner_calls = AtomicUsize::new(0);
    let outer = CountingSink {
        calls: &outer_calls,
    };
    let inner = CountingSink {
        calls: &inner_calls,
    };

    with_metrics_sink(&outer, || {
        record(MetricsEvent::PayloadDecoded);
        assert_eq!(outer_calls.load(Ordering::SeqCst), 1);

        with_metrics_sink(&inner, || {
            record(MetricsEvent::PayloadDecoded);
        });

        // back on the outer sink
        record(MetricsEvent::PayloadDecoded);
    });

    assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
    assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
    SINK_OVERRIDE.with(|cell| {
        assert!(cell.borrow().is_none());
    });

    // overrides bypass the thread-local counters
    assert_eq!(metrics_report().payloads_decoded, 0);
    record(MetricsEvent::PayloadDecoded);
    assert_eq!(metrics_report().payloads_decoded, 1);
}

#[test]
fn with_metrics_sink_restores_override_on_panic() {
    clear_override();

    let calls = AtomicUsize::new(0);
    let sink = CountingSink { calls: &calls };

    let panicked = catch_unwind(AssertUnwindSafe(|| {
        with_metrics_sink(&sink, || {
            record(MetricsEvent::MalformedRejected);
            panic!("unwind through the guard");
        });
    }))
    .is_err();
    assert!(panicked);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    SINK_OVERRIDE.with(|cell| {
        assert!(cell.borrow().is_none());
    });

    record(MetricsEvent::MalformedRejected);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn with_metrics_sink_returns_the_closure_value() {
    let calls = AtomicUsize::new(0);
    let sink = CountingSink { calls: &calls };

    assert_eq!(with_metrics_sink(&sink, || 7), 7);
}
