//! Firn - columnar time-series chunk storage
//!
//! This crate provides the per-series write path of a columnar time-series
//! file format: an append-only stream of `(timestamp, value)` pairs is
//! encoded into pages, and pages are packed into a chunk with rolled-up
//! statistics.
//!
//! # Components
//!
//! - [`ChunkWriter`]: accepts appends, predicts page flushes, rolls up stats
//! - [`ChunkBuffer`]: accumulates completed pages for one chunk
//! - [`Statistics`]: min/max/first/last/sum/count per scalar type
//! - [`FileSink`] / [`StreamSink`]: where sealed chunks go
//!
//! # Example
//!
//! ```rust,ignore
//! use firn::{ChunkWriter, ChunkWriterConfig, MeasurementSchema, StreamSink, Value, ValueType};
//!
//! let schema = MeasurementSchema::new("cpu.usage", ValueType::Double);
//! let mut writer = ChunkWriter::new(schema, ChunkWriterConfig::default())?;
//!
//! for (ts, value) in samples {
//!     writer.write(ts, Value::Double(value))?;
//! }
//!
//! // Seal the chunk into the output file
//! let mut sink = StreamSink::new(file);
//! writer.write_to_file_writer(&mut sink)?;
//! ```

#![deny(missing_docs)]

pub mod chunk;
pub mod error;
pub mod sink;

pub use chunk::{
    ChunkBuffer, ChunkHeader, ChunkWriter, ChunkWriterConfig, MeasurementSchema, PageEncoder,
    PageHeader, Statistics, TimeEncoding, Value, ValueEncoding, ValueType,
};
pub use error::{ChunkError, Result};
pub use sink::{FileSink, StreamSink};
