//! Benchmarks for firn chunk writing.
//!
//! Run with: cargo bench --package firn
//!
//! ## Benchmark Categories
//!
//! - **Append path**: per-point cost of the writer, predictor included
//! - **Encodings**: plain vs Gorilla/delta-of-delta value streams
//! - **Chunk emission**: seal + serialise to an in-memory sink

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use firn::{
    ChunkWriter, ChunkWriterConfig, MeasurementSchema, StreamSink, TimeEncoding, Value,
    ValueEncoding, ValueType,
};

/// Generate typical time series data (regular intervals, slowly varying values).
fn generate_typical_timeseries(count: usize) -> Vec<(i64, f64)> {
    let mut points = Vec::with_capacity(count);
    let start_ts = 1_000_000_000_i64;
    let interval = 1_000_000_000_i64; // 1 second in nanos

    let mut value = 50.0;
    for i in 0..count {
        value += (i as f64 * 0.1).sin() * 0.1;
        points.push((start_ts + (i as i64) * interval, value));
    }

    points
}

fn double_writer(value_encoding: ValueEncoding) -> ChunkWriter {
    let schema = MeasurementSchema::with_encodings(
        "bench.metric",
        ValueType::Double,
        TimeEncoding::DeltaOfDelta,
        value_encoding,
    )
    .unwrap();
    ChunkWriter::new(schema, ChunkWriterConfig::default()).unwrap()
}

fn bench_append_path(c: &mut Criterion) {
    let points = generate_typical_timeseries(10_000);

    let mut group = c.benchmark_group("append_path");
    group.throughput(Throughput::Elements(points.len() as u64));
    for (name, encoding) in [("plain", ValueEncoding::Plain), ("gorilla", ValueEncoding::Gorilla)] {
        group.bench_with_input(BenchmarkId::new("write_10k", name), &encoding, |b, &encoding| {
            b.iter_batched(
                || double_writer(encoding),
                |mut writer| {
                    for &(ts, value) in &points {
                        writer.write(ts, Value::Double(value)).unwrap();
                    }
                    black_box(writer.num_of_pages())
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_int64_append(c: &mut Criterion) {
    let count = 10_000usize;
    c.bench_function("int64_write_10k", |b| {
        b.iter_batched(
            || {
                ChunkWriter::new(
                    MeasurementSchema::new("bench.counter", ValueType::Int64),
                    ChunkWriterConfig::default(),
                )
                .unwrap()
            },
            |mut writer| {
                for i in 0..count {
                    writer
                        .write(i as i64 * 1_000, Value::Int64(i as i64))
                        .unwrap();
                }
                black_box(writer.current_chunk_size())
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_chunk_emission(c: &mut Criterion) {
    let points = generate_typical_timeseries(10_000);

    c.bench_function("emit_chunk_10k", |b| {
        b.iter_batched(
            || {
                let mut writer = double_writer(ValueEncoding::Gorilla);
                for &(ts, value) in &points {
                    writer.write(ts, Value::Double(value)).unwrap();
                }
                writer
            },
            |mut writer| {
                let mut sink = StreamSink::new(Vec::new());
                writer.write_to_file_writer(&mut sink).unwrap();
                black_box(sink.bytes_written())
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_append_path,
    bench_int64_append,
    bench_chunk_emission
);
criterion_main!(benches);
