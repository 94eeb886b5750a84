//! Integration tests for the on-disk chunk layout.
//!
//! These tests parse the bytes emitted through a `StreamSink` and check them
//! field by field against the documented format: big-endian fixed-width
//! integers, unsigned varints, and type-specific statistics payloads.

use firn::{
    ChunkWriter, ChunkWriterConfig, MeasurementSchema, StreamSink, TimeEncoding, Value,
    ValueEncoding, ValueType,
};
use std::io::Read;
use tempfile::TempDir;

/// Cursor over emitted chunk bytes.
struct ChunkParser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ChunkParser<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn varint(&mut self) -> u64 {
        let mut out = 0u64;
        let mut shift = 0;
        loop {
            let b = self.buf[self.pos];
            self.pos += 1;
            out |= ((b & 0x7F) as u64) << shift;
            if b & 0x80 == 0 {
                return out;
            }
            shift += 7;
        }
    }

    fn bytes(&mut self, n: usize) -> &'a [u8] {
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    fn i64(&mut self) -> i64 {
        i64::from_be_bytes(self.bytes(8).try_into().unwrap())
    }

    fn u8(&mut self) -> u8 {
        let b = self.buf[self.pos];
        self.pos += 1;
        b
    }

    fn exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Reads an Int64 statistics block: count, then min/max/first/last/sum.
    fn int64_stats(&mut self) -> (u64, [i64; 5]) {
        let count = self.varint();
        if count == 0 {
            return (0, [0; 5]);
        }
        let mut fields = [0i64; 5];
        for f in &mut fields {
            *f = self.i64();
        }
        (count, fields)
    }
}

fn plain_int64_schema(id: &str) -> MeasurementSchema {
    MeasurementSchema::with_encodings(id, ValueType::Int64, TimeEncoding::Plain, ValueEncoding::Plain)
        .unwrap()
}

fn emit(writer: &mut ChunkWriter) -> Vec<u8> {
    let mut sink = StreamSink::new(Vec::new());
    writer.write_to_file_writer(&mut sink).unwrap();
    sink.into_inner()
}

#[test]
fn test_single_page_chunk_layout() {
    let mut writer =
        ChunkWriter::new(plain_int64_schema("s1"), ChunkWriterConfig::default()).unwrap();
    for t in [1i64, 2, 3] {
        writer.write(t, Value::Int64(5)).unwrap();
    }
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    // chunk header
    let id_len = p.varint();
    assert_eq!(id_len, 2);
    assert_eq!(p.bytes(2), b"s1");
    assert_eq!(p.u8(), ValueType::Int64.as_u8());
    let data_size = p.varint();
    let num_pages = p.varint();
    assert_eq!(num_pages, 1);

    let (count, fields) = p.int64_stats();
    assert_eq!(count, 3);
    assert_eq!(fields, [5, 5, 5, 5, 15]); // min, max, first, last, sum

    // page header
    let page_start = p.pos;
    let value_count = p.varint();
    assert_eq!(value_count, 3);
    let payload_len = p.varint();
    assert_eq!(p.i64(), 3); // max_ts
    assert_eq!(p.i64(), 1); // min_ts
    let (page_count, page_fields) = p.int64_stats();
    assert_eq!(page_count, 3);
    assert_eq!(page_fields, [5, 5, 5, 5, 15]);

    // page payload: varint time length, plain timestamps, plain values
    let payload_start = p.pos;
    let time_len = p.varint();
    assert_eq!(time_len, 24);
    for expected in [1i64, 2, 3] {
        assert_eq!(p.i64(), expected);
    }
    for _ in 0..3 {
        assert_eq!(p.i64(), 5);
    }
    assert_eq!(p.pos - payload_start, payload_len as usize);
    assert_eq!(p.pos - page_start, data_size as usize);
    assert!(p.exhausted());
}

#[test]
fn test_single_point_min_max_coincide() {
    let mut writer =
        ChunkWriter::new(plain_int64_schema("one"), ChunkWriterConfig::default()).unwrap();
    writer.write(42, Value::Int64(7)).unwrap();
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    let id_len = p.varint() as usize;
    p.bytes(id_len);
    p.u8();
    p.varint(); // data size
    assert_eq!(p.varint(), 1); // num pages
    let (count, fields) = p.int64_stats();
    assert_eq!(count, 1);
    assert_eq!(fields, [7, 7, 7, 7, 7]);

    assert_eq!(p.varint(), 1); // page value count
    p.varint(); // payload len
    assert_eq!(p.i64(), 42); // max_ts
    assert_eq!(p.i64(), 42); // min_ts
}

#[test]
fn test_empty_chunk_layout() {
    let mut writer =
        ChunkWriter::new(plain_int64_schema("empty"), ChunkWriterConfig::default()).unwrap();
    writer.seal_current_page();
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    let id_len = p.varint() as usize;
    assert_eq!(p.bytes(id_len), b"empty");
    assert_eq!(p.u8(), ValueType::Int64.as_u8());
    assert_eq!(p.varint(), 0); // data size
    assert_eq!(p.varint(), 0); // num pages
    assert_eq!(p.varint(), 0); // empty statistics: count only
    assert!(p.exhausted());
}

#[test]
fn test_multi_page_chunk_keeps_flush_order() {
    let mut writer = ChunkWriter::new(
        plain_int64_schema("ordered"),
        ChunkWriterConfig {
            page_point_upper_bound: 2,
            ..Default::default()
        },
    )
    .unwrap();
    for (t, v) in [(1i64, 10i64), (2, 20), (3, 30), (4, 40), (5, 50)] {
        writer.write(t, Value::Int64(v)).unwrap();
    }
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    let id_len = p.varint() as usize;
    p.bytes(id_len);
    p.u8();
    p.varint();
    assert_eq!(p.varint(), 3); // num pages: 2 + 2 + sealed 1

    let (count, fields) = p.int64_stats();
    assert_eq!(count, 5);
    assert_eq!(fields, [10, 50, 10, 50, 150]);

    // pages appear in flush order with their own bounds
    let expected_pages = [(2u64, 2i64, 1i64), (2, 4, 3), (1, 5, 5)];
    for (expected_count, expected_max, expected_min) in expected_pages {
        assert_eq!(p.varint(), expected_count);
        let payload_len = p.varint() as usize;
        assert_eq!(p.i64(), expected_max);
        assert_eq!(p.i64(), expected_min);
        let (page_count, _) = p.int64_stats();
        assert_eq!(page_count, expected_count);
        p.bytes(payload_len);
    }
    assert!(p.exhausted());
}

#[test]
fn test_bool_chunk_layout() {
    let schema = MeasurementSchema::with_encodings(
        "flag",
        ValueType::Bool,
        TimeEncoding::Plain,
        ValueEncoding::Plain,
    )
    .unwrap();
    let mut writer = ChunkWriter::new(schema, ChunkWriterConfig::default()).unwrap();
    writer.write(1, Value::Bool(true)).unwrap();
    writer.write(2, Value::Bool(false)).unwrap();
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    let id_len = p.varint() as usize;
    p.bytes(id_len);
    assert_eq!(p.u8(), ValueType::Bool.as_u8());
    p.varint();
    assert_eq!(p.varint(), 1);

    // bool statistics: count, first, last
    assert_eq!(p.varint(), 2);
    assert_eq!(p.u8(), 1);
    assert_eq!(p.u8(), 0);

    // page header
    assert_eq!(p.varint(), 2);
    let payload_len = p.varint() as usize;
    p.i64();
    p.i64();
    assert_eq!(p.varint(), 2);
    p.u8();
    p.u8();

    // payload: 16 time bytes, then one byte per bool
    let payload = p.bytes(payload_len);
    assert_eq!(payload[0], 16); // varint time length
    assert_eq!(payload[payload_len - 2..], [1, 0]);
    assert!(p.exhausted());
}

#[test]
fn test_binary_chunk_layout() {
    let schema = MeasurementSchema::with_encodings(
        "labels",
        ValueType::Binary,
        TimeEncoding::Plain,
        ValueEncoding::Plain,
    )
    .unwrap();
    let mut writer = ChunkWriter::new(schema, ChunkWriterConfig::default()).unwrap();
    writer.write(1, Value::Binary(b"ab".to_vec())).unwrap();
    writer.write(2, Value::Binary(b"c".to_vec())).unwrap();
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    let id_len = p.varint() as usize;
    p.bytes(id_len);
    assert_eq!(p.u8(), ValueType::Binary.as_u8());
    p.varint();
    assert_eq!(p.varint(), 1);

    // binary statistics: count, then length-prefixed first and last
    assert_eq!(p.varint(), 2);
    let first_len = p.varint() as usize;
    assert_eq!(p.bytes(first_len), b"ab");
    let last_len = p.varint() as usize;
    assert_eq!(p.bytes(last_len), b"c");

    // page header mirrors the same statistics
    assert_eq!(p.varint(), 2);
    let payload_len = p.varint() as usize;
    p.i64();
    p.i64();
    assert_eq!(p.varint(), 2);
    let first_len = p.varint() as usize;
    assert_eq!(p.bytes(first_len), b"ab");
    let last_len = p.varint() as usize;
    assert_eq!(p.bytes(last_len), b"c");

    // payload values: length-prefixed byte strings after the time stream
    let payload = p.bytes(payload_len);
    assert_eq!(payload[0], 16);
    assert_eq!(&payload[17..], &[2, b'a', b'b', 1, b'c']);
    assert!(p.exhausted());
}

#[test]
fn test_double_chunk_header_parses_with_opaque_payload() {
    let schema = MeasurementSchema::with_encodings(
        "temperature",
        ValueType::Double,
        TimeEncoding::DeltaOfDelta,
        ValueEncoding::Gorilla,
    )
    .unwrap();
    let mut writer = ChunkWriter::new(
        schema,
        ChunkWriterConfig {
            page_size_threshold: 256,
            page_point_upper_bound: 10_000,
            minimum_record_count_for_check: 8,
        },
    )
    .unwrap();
    for i in 0..500i64 {
        writer.write(i * 10, Value::Double(20.0 + i as f64)).unwrap();
    }
    let bytes = emit(&mut writer);
    let mut p = ChunkParser::new(&bytes);

    let id_len = p.varint() as usize;
    assert_eq!(p.bytes(id_len), b"temperature");
    assert_eq!(p.u8(), ValueType::Double.as_u8());
    let data_size = p.varint();
    let num_pages = p.varint();
    assert!(num_pages > 1);

    // double statistics: count then 5 doubles
    assert_eq!(p.varint(), 500);
    let to_f64 = |p: &mut ChunkParser| f64::from_be_bytes(p.bytes(8).try_into().unwrap());
    assert_eq!(to_f64(&mut p), 20.0); // min
    assert_eq!(to_f64(&mut p), 519.0); // max
    assert_eq!(to_f64(&mut p), 20.0); // first
    assert_eq!(to_f64(&mut p), 519.0); // last
    let sum = to_f64(&mut p);
    assert!((sum - (20.0 * 500.0 + (0..500).sum::<i64>() as f64)).abs() < 1e-6);

    // walk every page using payload_len, summing counts and spans
    let header_end = p.pos;
    let mut total = 0u64;
    let mut min_ts = i64::MAX;
    let mut max_ts = i64::MIN;
    for _ in 0..num_pages {
        let page_count = p.varint();
        let payload_len = p.varint() as usize;
        max_ts = max_ts.max(p.i64());
        min_ts = min_ts.min(p.i64());
        let stats_count = p.varint();
        assert_eq!(stats_count, page_count);
        p.bytes(5 * 8); // double statistics payload
        p.bytes(payload_len);
        total += page_count;
    }
    assert_eq!(total, 500);
    assert_eq!(min_ts, 0);
    assert_eq!(max_ts, 4990);
    assert_eq!(p.pos - header_end, data_size as usize);
    assert!(p.exhausted());
}

#[test]
fn test_chunk_written_through_a_real_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("series.firn");

    let mut writer =
        ChunkWriter::new(plain_int64_schema("disk"), ChunkWriterConfig::default()).unwrap();
    for t in [10i64, 20, 30] {
        writer.write(t, Value::Int64(t * 2)).unwrap();
    }

    let file = std::fs::File::create(&path).unwrap();
    let mut sink = StreamSink::new(file);
    writer.write_to_file_writer(&mut sink).unwrap();
    let written = sink.bytes_written();

    let mut contents = Vec::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    assert_eq!(contents.len() as u64, written);

    let mut p = ChunkParser::new(&contents);
    let id_len = p.varint() as usize;
    assert_eq!(p.bytes(id_len), b"disk");
    assert_eq!(p.u8(), ValueType::Int64.as_u8());
    p.varint();
    assert_eq!(p.varint(), 1);
    let (count, fields) = p.int64_stats();
    assert_eq!(count, 3);
    assert_eq!(fields, [20, 60, 20, 60, 120]);
}
