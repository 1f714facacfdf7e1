use crate::{
    codec::{
        CodecLimits, EncodedDocument, decode, decode_field, decode_field_with,
        decode_with, encode, encode_with,
    },
    document::{Document, FieldBuffer},
    error::{Error, ErrorKind, ErrorOrigin},
    obs::{MetricsEvent, MetricsSink, metrics_report, metrics_reset, with_metrics_sink},
    test_support::{arb_document, blob, doc, list, text},
    value::{Value, ValueType},
};
use proptest::prelude::*;
use std::cell::RefCell;

// ---- helpers -----------------------------------------------------------

fn person() -> FieldBuffer {
    FieldBuffer::new().with("age", 10).with("name", "john")
}

fn every_kind() -> FieldBuffer {
    FieldBuffer::new()
        .with("null", Value::Null)
        .with("bool", true)
        .with("int", -42)
        .with("double", 2.5)
        .with("text", "héllo")
        .with("blob", blob(&[0, 1, 255]))
        .with("array", list([Value::Integer(1), text("two"), list([])]))
        .with(
            "doc",
            doc([("inner", Value::Bool(false)), ("deeper", doc([("x", Value::Null)]))]),
        )
}

// Decode every payload, nested ones included.
fn drain(bytes: &[u8]) -> Result<FieldBuffer, Error> {
    FieldBuffer::from_document(&EncodedDocument::new(bytes))
}

fn nested_lists(levels: usize) -> Value {
    let mut value = Value::Integer(1);
    for _ in 0..levels {
        value = list([value]);
    }

    value
}

// Hand-built record: count, then (name, tag, size, offset) per field, then body.
fn raw_record(fields: &[(&str, u8, u32, u32)], body: &[u8]) -> Vec<u8> {
    let mut out = u32::try_from(fields.len())
        .expect("test record is small")
        .to_be_bytes()
        .to_vec();
    for (name, tag, size, offset) in fields {
        let name_len = u16::try_from(name.len()).expect("test name is short");
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(*tag);
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(&offset.to_be_bytes());
    }
    out.extend_from_slice(body);

    out
}

///
/// DuplicateNames
/// Document impl that yields the same name more than once.
///

#[derive(Debug)]
struct DuplicateNames;

impl Document for DuplicateNames {
    fn get_by_field(&self, name: &str) -> Result<Value, Error> {
        match name {
            "a" => Ok(Value::Integer(3)),
            "b" => Ok(Value::Integer(2)),
            _ => Err(Error::field_not_found(ErrorOrigin::Document, name)),
        }
    }

    fn iterate(
        &self,
        visit: &mut dyn FnMut(&str, &Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        visit("a", &Value::Integer(1))?;
        visit("b", &Value::Integer(2))?;
        visit("a", &Value::Integer(3))
    }
}

///
/// RecordingSink
///

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

// ---- layout ------------------------------------------------------------

#[test]
fn encode_lays_out_header_then_body() {
    let bytes = encode(&person()).expect("encode");
    let format = decode(&bytes).expect("decode");

    let header = format.header();
    assert_eq!(header.fields_count(), 2);

    let age = &header.field_headers()[0];
    assert_eq!(age.name(), "age");
    assert_eq!(age.name_size(), 3);
    assert_eq!(age.ty(), ValueType::Integer);
    assert_eq!(age.size(), 8);
    assert_eq!(age.offset(), 0);

    let name = &header.field_headers()[1];
    assert_eq!(name.name(), "name");
    assert_eq!(name.name_size(), 4);
    assert_eq!(name.ty(), ValueType::Text);
    assert_eq!(name.size(), 4);
    assert_eq!(name.offset(), 8);

    assert_eq!(format.body().len(), header.body_size());
    assert_eq!(format.payload(name), Some(&b"john"[..]));
}

#[test]
fn payload_rejects_entries_from_another_record() {
    let small = encode(&person()).expect("encode");
    let large = encode(&every_kind()).expect("encode");
    let small = decode(&small).expect("decode");
    let large = decode(&large).expect("decode");

    let outside = large
        .header()
        .field_headers()
        .iter()
        .find(|f| f.offset() as usize >= small.body().len())
        .expect("the larger record has a field past the smaller body");

    assert_eq!(small.payload(outside), None);
}

#[test]
fn encode_is_big_endian() {
    let bytes = encode(&person()).expect("encode");

    assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
    assert_eq!(&bytes[4..6], &[0, 3]);
    assert_eq!(&bytes[6..9], b"age");
    assert_eq!(bytes[9], ValueType::Integer.to_u8());
    assert_eq!(&bytes[10..14], &[0, 0, 0, 8]);
    assert_eq!(&bytes[bytes.len() - 12..bytes.len() - 4], &10i64.to_be_bytes());
}

#[test]
fn empty_document_is_a_bare_count() {
    let bytes = encode(&FieldBuffer::new()).expect("encode");
    assert_eq!(bytes, vec![0, 0, 0, 0]);

    let format = decode(&bytes).expect("decode");
    assert!(format.header().field_headers().is_empty());
    assert!(format.body().is_empty());
}

// ---- round trips -------------------------------------------------------

#[test]
fn every_kind_survives_encode_and_iterate() {
    let original = every_kind();
    let bytes = encode(&original).expect("encode");

    assert_eq!(drain(&bytes).expect("decode"), original);
}

#[test]
fn lazy_view_reencodes_to_the_same_bytes() {
    let bytes = encode(&every_kind()).expect("encode");
    let again = encode(&EncodedDocument::new(&bytes)).expect("re-encode");

    assert_eq!(again, bytes);
}

#[test]
fn decode_field_matches_full_decode() {
    let original = every_kind();
    let bytes = encode(&original).expect("encode");

    for field in original.iter() {
        let value = decode_field(&bytes, &field.name).expect("field present");
        assert_eq!(value, field.value, "field {}", field.name);
    }
}

#[test]
fn decode_field_reports_missing_names() {
    let bytes = encode(&person()).expect("encode");

    let err = decode_field(&bytes, "email").expect_err("absent field");
    assert_eq!(err.kind(), ErrorKind::FieldNotFound);
    assert!(err.is_not_found());

    let err = EncodedDocument::new(&bytes)
        .get_by_field("Age")
        .expect_err("names are case sensitive");
    assert_eq!(err.kind(), ErrorKind::FieldNotFound);
}

#[test]
fn nested_views_answer_random_access() {
    let bytes = encode(&every_kind()).expect("encode");

    let inner = decode_field(&bytes, "doc").expect("doc field");
    let inner = inner.as_document().expect("document");
    let deeper = inner.get_by_field("deeper").expect("deeper");
    assert_eq!(
        deeper.as_document().expect("document").get_by_field("x"),
        Ok(Value::Null)
    );

    let array = decode_field(&bytes, "array").expect("array field");
    let array = array.as_array().expect("array");
    assert_eq!(array.get_by_index(1), Ok(text("two")));

    let err = array.get_by_index(3).expect_err("past the end");
    assert_eq!(err.kind(), ErrorKind::ValueNotFound);
}

#[test]
fn encoded_array_reads_single_elements() {
    let bytes = encode(&FieldBuffer::new().with("xs", list([Value::Null, Value::Bool(true)])))
        .expect("encode");
    let xs = EncodedDocument::new(&bytes).get_by_field("xs").expect("xs");
    let xs = xs.as_array().expect("array");

    assert_eq!(xs.get_by_index(0), Ok(Value::Null));
    assert_eq!(xs.get_by_index(1), Ok(Value::Bool(true)));
    assert!(xs.get_by_index(2).is_err());
    assert_eq!(crate::document::values(xs).expect("iterate").len(), 2);
}

#[test]
fn owned_view_outlives_the_input() {
    let view = {
        let bytes = encode(&person()).expect("encode");
        EncodedDocument::new(&bytes).into_owned()
    };

    assert_eq!(view.get_by_field("name"), Ok(text("john")));
}

// ---- duplicates --------------------------------------------------------

#[test]
fn encode_keeps_first_position_and_last_value() {
    let bytes = encode(&DuplicateNames).expect("encode");
    let format = decode(&bytes).expect("decode");

    let names: Vec<_> = format.header().field_headers().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(decode_field(&bytes, "a"), Ok(Value::Integer(3)));
}

#[test]
fn decode_rejects_duplicate_names() {
    let null = ValueType::Null.to_u8();
    let bytes = raw_record(&[("a", null, 0, 0), ("a", null, 0, 0)], &[]);

    let err = decode(&bytes).expect_err("duplicate header");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
}

// ---- malformed input ---------------------------------------------------

#[test]
fn decode_rejects_structural_damage() {
    let int = ValueType::Integer.to_u8();
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("empty input", Vec::new()),
        ("short count", vec![0, 0, 1]),
        ("count beyond input", vec![0, 0, 0, 9]),
        ("unknown tag", raw_record(&[("a", 9, 0, 0)], &[])),
        ("zero tag", raw_record(&[("a", 0, 0, 0)], &[])),
        ("fixed width", raw_record(&[("a", int, 4, 0)], &[0; 4])),
        ("gap", raw_record(&[("a", int, 8, 1)], &[0; 9])),
        ("body too long", raw_record(&[("a", int, 8, 0)], &[0; 9])),
        ("body too short", raw_record(&[("a", int, 8, 0)], &[0; 7])),
    ];

    for (label, bytes) in cases {
        let err = decode(&bytes).expect_err(label);
        assert_eq!(err.kind(), ErrorKind::MalformedEncoding, "{label}");
    }
}

#[test]
fn invalid_name_bytes_are_rejected() {
    let mut bytes = raw_record(&[("a", ValueType::Null.to_u8(), 0, 0)], &[]);
    bytes[6] = 0xFF;

    let err = decode(&bytes).expect_err("invalid utf-8 name");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
}

#[test]
fn payload_damage_surfaces_on_access() {
    let bool_tag = ValueType::Bool.to_u8();
    let text_tag = ValueType::Text.to_u8();
    let bytes = raw_record(&[("b", bool_tag, 1, 0), ("t", text_tag, 1, 1)], &[7, 0xFF]);

    // header is fine
    decode(&bytes).expect("header parses");

    let err = decode_field(&bytes, "b").expect_err("bool out of range");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
    let err = decode_field(&bytes, "t").expect_err("invalid utf-8 text");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
}

#[test]
fn nested_array_descriptors_are_validated() {
    let array_tag = ValueType::Array.to_u8();
    // one element claiming 8 bytes with an empty array body
    let mut payload = vec![0, 0, 0, 1, ValueType::Integer.to_u8()];
    payload.extend_from_slice(&8u32.to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes());
    let size = u32::try_from(payload.len()).expect("small");
    let bytes = raw_record(&[("xs", array_tag, size, 0)], &payload);

    let err = decode_field(&bytes, "xs").expect_err("array body too short");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
}

// ---- limits ------------------------------------------------------------

#[test]
fn record_size_limit_applies_both_ways() {
    let big = FieldBuffer::new().with("blob", vec![0u8; 64]);
    let limits = CodecLimits::DEFAULT.with_max_record_bytes(32);

    let err = encode_with(&big, limits).expect_err("too large to encode");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let bytes = encode(&big).expect("default limit");
    let err = decode_with(&bytes, limits).expect_err("too large to decode");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
    let err = decode_field_with(&bytes, "blob", limits).expect_err("same policy");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
}

#[test]
fn depth_limit_applies_both_ways() {
    let limits = CodecLimits::DEFAULT.with_max_depth(2);
    let within = FieldBuffer::new().with("v", nested_lists(2));
    let beyond = FieldBuffer::new().with("v", nested_lists(3));

    encode_with(&within, limits).expect("two levels fit");
    let err = encode_with(&beyond, limits).expect_err("three levels do not");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let bytes = encode(&beyond).expect("default depth");
    let err = FieldBuffer::from_document(&EncodedDocument::with_limits(&bytes, limits))
        .expect_err("decode enforces the same depth");
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
}

#[test]
fn default_depth_limit_is_the_nesting_limit() {
    let at_limit = FieldBuffer::new().with("v", nested_lists(crate::MAX_NESTING_DEPTH));
    let bytes = encode(&at_limit).expect("at the limit");
    assert_eq!(drain(&bytes).expect("decode"), at_limit);

    let past = FieldBuffer::new().with("v", nested_lists(crate::MAX_NESTING_DEPTH + 1));
    assert!(encode(&past).is_err());
}

// ---- metrics -----------------------------------------------------------

#[test]
fn codec_paths_report_metrics() {
    metrics_reset();

    let bytes = encode(&person()).expect("encode");
    decode_field(&bytes, "name").expect("hit");
    decode_field(&bytes, "email").expect_err("miss");
    decode(&bytes[..3]).expect_err("truncated");

    let report = metrics_report();
    assert_eq!(report.records_encoded, 1);
    assert_eq!(report.fields_encoded, 2);
    assert_eq!(report.bytes_encoded, bytes.len() as u64);
    assert_eq!(report.headers_decoded, 2);
    assert_eq!(report.field_lookup_hits, 1);
    assert_eq!(report.field_lookup_misses, 1);
    assert_eq!(report.payloads_decoded, 1);
    assert_eq!(report.malformed_rejected, 1);
}

#[test]
fn scoped_sink_sees_codec_events() {
    let sink = RecordingSink::default();
    let bytes = with_metrics_sink(&sink, || {
        let bytes = encode(&person()).expect("encode");
        decode_field(&bytes, "age").expect("age");
        bytes
    });

    assert_eq!(
        sink.events.into_inner(),
        vec![
            MetricsEvent::RecordEncoded {
                fields: 2,
                bytes: bytes.len() as u64,
            },
            MetricsEvent::HeaderDecoded { fields: 2 },
            MetricsEvent::FieldLookup { hit: true },
            MetricsEvent::PayloadDecoded,
        ]
    );
}

// ---- properties --------------------------------------------------------

proptest! {
    #[test]
    fn documents_round_trip(original in arb_document()) {
        let bytes = encode(&original).expect("encode");
        prop_assert_eq!(drain(&bytes).expect("decode"), original);
    }

    #[test]
    fn truncated_records_are_rejected(original in arb_document(), cut in any::<prop::sample::Index>()) {
        let bytes = encode(&original).expect("encode");
        let cut = cut.index(bytes.len());

        let err = decode(&bytes[..cut]).expect_err("strict prefix");
        prop_assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
    }

    #[test]
    fn mutated_records_fail_cleanly(
        original in arb_document(),
        at in any::<prop::sample::Index>(),
        byte in any::<u8>(),
    ) {
        let mut bytes = encode(&original).expect("encode");
        prop_assume!(!bytes.is_empty());
        let at = at.index(bytes.len());
        bytes[at] = byte;

        if let Err(err) = drain(&bytes) {
            prop_assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
        }
    }
}
