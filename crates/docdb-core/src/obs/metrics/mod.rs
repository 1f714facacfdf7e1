use std::cell::RefCell;

///
/// CodecMetrics
/// Ephemeral, in-memory counters for the value layer on this thread.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CodecMetrics {
    // Encoding
    pub records_encoded: u64,
    pub fields_encoded: u64,
    pub bytes_encoded: u64,

    // Decoding
    pub headers_decoded: u64,
    pub header_fields: u64,
    pub payloads_decoded: u64,
    pub malformed_rejected: u64,

    // Random access
    pub field_lookup_hits: u64,
    pub field_lookup_misses: u64,

    // Producers
    pub json_parsed: u64,
    pub json_failed: u64,
}

thread_local! {
    static CODEC_METRICS: RefCell<CodecMetrics> = RefCell::new(CodecMetrics::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&CodecMetrics) -> R) -> R {
    CODEC_METRICS.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut CodecMetrics) -> R) -> R {
    CODEC_METRICS.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset() {
    with_state_mut(|m| *m = CodecMetrics::default());
}

/// Point-in-time copy of the counters.
pub(crate) fn snapshot() -> CodecMetrics {
    with_state(Clone::clone)
}

// Saturating add for u64 counters.
pub(crate) const fn bump(counter: &mut u64, by: u64) {
    *counter = counter.saturating_add(by);
}
