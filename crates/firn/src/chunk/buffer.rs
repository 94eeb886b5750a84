//! Chunk accumulation for one series.
//!
//! A [`ChunkBuffer`] collects completed pages (header + payload bytes) in
//! insertion order and tracks the chunk-level timestamp bounds. Sealing the
//! chunk emits the [`ChunkHeader`] followed by all page bytes to a
//! [`FileSink`] and releases the buffered storage.
//!
//! ## Chunk layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Chunk Header                                                │
//! │  - series id: varint length + UTF-8 bytes                    │
//! │  - type tag: u8                                              │
//! │  - data size: varint (all page headers + payloads)           │
//! │  - num pages: varint                                         │
//! │  - chunk statistics (type-specific layout)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pages (repeated, insertion order)                           │
//! │  - page header: counts, timestamps, page statistics          │
//! │  - page payload: time stream + value stream                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::chunk::codec::{varint_len, write_varint};
use crate::chunk::page::PageHeader;
use crate::chunk::schema::{MeasurementSchema, ValueType};
use crate::chunk::statistics::Statistics;
use crate::error::{ChunkError, Result};
use crate::sink::FileSink;

/// Header emitted ahead of a chunk's page bytes.
#[derive(Debug, Clone)]
pub struct ChunkHeader {
    /// Identifier of the series the chunk belongs to.
    pub series_id: String,
    /// Scalar type of the series.
    pub value_type: ValueType,
    /// Byte total of all page headers and payloads in the chunk.
    pub data_size: u64,
    /// Number of pages in the chunk.
    pub num_pages: u32,
    /// Aggregate over every value in the chunk.
    pub statistics: Statistics,
}

impl ChunkHeader {
    /// Serialises the header into the buffer.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        let id_bytes = self.series_id.as_bytes();
        write_varint(buf, id_bytes.len() as u64);
        buf.extend_from_slice(id_bytes);
        buf.push(self.value_type.as_u8());
        write_varint(buf, self.data_size);
        write_varint(buf, self.num_pages as u64);
        self.statistics.write_to(buf);
    }

    /// Returns the exact number of bytes `write_to` produces.
    pub fn serialized_len(&self) -> usize {
        let id_len = self.series_id.len();
        varint_len(id_len as u64)
            + id_len
            + 1
            + varint_len(self.data_size)
            + varint_len(self.num_pages as u64)
            + self.statistics.serialized_len()
    }

    /// Upper-bound size estimate for a chunk header of this schema, before
    /// the final field values are known.
    ///
    /// Varint fields are costed at their maximum width and statistics at
    /// their fixed per-type payload; Binary first/last payloads are not
    /// included. Constant for a given schema, which keeps size estimates
    /// built on it monotonic.
    pub fn estimated_size(schema: &MeasurementSchema) -> u64 {
        let id_len = schema.id().len();
        (varint_len(id_len as u64)
            + id_len
            + 1
            + 10 // data size varint, worst case
            + 5 // num pages varint, worst case
            + 10 // statistics count varint, worst case
            + Statistics::fixed_payload_len(schema.value_type())) as u64
    }
}

/// Accumulates completed pages for one chunk of one series.
pub struct ChunkBuffer {
    schema: MeasurementSchema,
    /// Serialised page headers and payloads, in insertion order.
    buf: Vec<u8>,
    num_pages: u32,
    min_ts: i64,
    max_ts: i64,
}

impl ChunkBuffer {
    /// Creates an empty buffer for the series described by `schema`.
    pub fn new(schema: MeasurementSchema) -> Self {
        Self {
            schema,
            buf: Vec::new(),
            num_pages: 0,
            min_ts: i64::MAX,
            max_ts: i64::MIN,
        }
    }

    /// Appends one completed page.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::Page` if the page statistics cannot be serialised
    /// for this series: their type does not match the schema, or their count
    /// disagrees with `value_count`.
    pub fn write_page_header_and_data(
        &mut self,
        payload: &[u8],
        value_count: u32,
        statistics: &Statistics,
        max_ts: i64,
        min_ts: i64,
    ) -> Result<()> {
        if statistics.value_type() != self.schema.value_type() {
            return Err(ChunkError::Page(format!(
                "statistics type {:?} does not match series type {:?}",
                statistics.value_type(),
                self.schema.value_type()
            )));
        }
        if statistics.count() != value_count as u64 {
            return Err(ChunkError::Page(format!(
                "statistics count {} disagrees with page value count {}",
                statistics.count(),
                value_count
            )));
        }

        let header = PageHeader {
            value_count,
            payload_len: payload.len() as u32,
            max_ts,
            min_ts,
            statistics: statistics.clone(),
        };
        header.write_to(&mut self.buf);
        self.buf.extend_from_slice(payload);

        self.num_pages += 1;
        self.min_ts = self.min_ts.min(min_ts);
        self.max_ts = self.max_ts.max(max_ts);
        Ok(())
    }

    /// Emits the chunk header followed by all page bytes to `sink`, then
    /// clears the buffer.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::TypeMismatch` if `chunk_statistics` is for a
    /// different series type, or any error surfaced by the sink.
    pub fn write_all_pages_of_series_to_file(
        &mut self,
        sink: &mut dyn FileSink,
        chunk_statistics: &Statistics,
    ) -> Result<()> {
        if chunk_statistics.value_type() != self.schema.value_type() {
            return Err(ChunkError::TypeMismatch {
                expected: self.schema.value_type(),
                actual: chunk_statistics.value_type(),
            });
        }

        let header = ChunkHeader {
            series_id: self.schema.id().to_string(),
            value_type: self.schema.value_type(),
            data_size: self.buf.len() as u64,
            num_pages: self.num_pages,
            statistics: chunk_statistics.clone(),
        };
        sink.start_chunk(&header)?;
        sink.append_bytes(&self.buf)?;
        sink.end_chunk()?;

        self.reset();
        Ok(())
    }

    /// Discards accumulated pages and releases the byte storage.
    pub fn reset(&mut self) {
        self.buf = Vec::new();
        self.num_pages = 0;
        self.min_ts = i64::MAX;
        self.max_ts = i64::MIN;
    }

    /// Returns the byte total of all buffered page headers and payloads.
    pub fn current_data_size(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Returns the number of buffered pages.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Upper-bound estimate of the memory held by buffered pages.
    pub fn estimate_max_page_mem_size(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Smallest page min-timestamp across buffered pages.
    pub fn min_timestamp(&self) -> Option<i64> {
        (self.num_pages > 0).then_some(self.min_ts)
    }

    /// Largest page max-timestamp across buffered pages.
    pub fn max_timestamp(&self) -> Option<i64> {
        (self.num_pages > 0).then_some(self.max_ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::schema::Value;
    use crate::sink::StreamSink;

    fn int64_schema() -> MeasurementSchema {
        MeasurementSchema::new("s1", ValueType::Int64)
    }

    fn int64_stats(values: &[i64]) -> Statistics {
        let mut stats = Statistics::of_type(ValueType::Int64);
        for &v in values {
            stats.update(&Value::Int64(v)).unwrap();
        }
        stats
    }

    #[test]
    fn test_append_tracks_pages_and_bounds() {
        let mut buffer = ChunkBuffer::new(int64_schema());
        buffer
            .write_page_header_and_data(&[0xAA; 10], 2, &int64_stats(&[1, 2]), 20, 10)
            .unwrap();
        buffer
            .write_page_header_and_data(&[0xBB; 10], 2, &int64_stats(&[3, 4]), 40, 30)
            .unwrap();

        assert_eq!(buffer.num_pages(), 2);
        assert_eq!(buffer.min_timestamp(), Some(10));
        assert_eq!(buffer.max_timestamp(), Some(40));
        assert!(buffer.current_data_size() > 20);
    }

    #[test]
    fn test_rejects_mismatched_statistics_type() {
        let mut buffer = ChunkBuffer::new(int64_schema());
        let stats = Statistics::of_type(ValueType::Double);
        let result = buffer.write_page_header_and_data(&[0; 4], 0, &stats, 1, 1);
        assert!(matches!(result, Err(ChunkError::Page(_))));
        assert_eq!(buffer.num_pages(), 0);
        assert_eq!(buffer.current_data_size(), 0);
    }

    #[test]
    fn test_rejects_count_disagreement() {
        let mut buffer = ChunkBuffer::new(int64_schema());
        let result =
            buffer.write_page_header_and_data(&[0; 4], 3, &int64_stats(&[1, 2]), 2, 1);
        assert!(matches!(result, Err(ChunkError::Page(_))));
    }

    #[test]
    fn test_emit_clears_buffer() {
        let mut buffer = ChunkBuffer::new(int64_schema());
        let stats = int64_stats(&[1, 2]);
        buffer
            .write_page_header_and_data(&[0xAA; 10], 2, &stats, 2, 1)
            .unwrap();

        let mut sink = StreamSink::new(Vec::new());
        buffer
            .write_all_pages_of_series_to_file(&mut sink, &stats)
            .unwrap();

        assert_eq!(buffer.num_pages(), 0);
        assert_eq!(buffer.current_data_size(), 0);
        assert_eq!(buffer.min_timestamp(), None);
        assert!(sink.bytes_written() > 0);
    }

    #[test]
    fn test_emit_rejects_wrong_chunk_stats_type() {
        let mut buffer = ChunkBuffer::new(int64_schema());
        let mut sink = StreamSink::new(Vec::new());
        let wrong = Statistics::of_type(ValueType::Bool);
        let result = buffer.write_all_pages_of_series_to_file(&mut sink, &wrong);
        assert!(matches!(result, Err(ChunkError::TypeMismatch { .. })));
    }

    #[test]
    fn test_chunk_header_layout() {
        let header = ChunkHeader {
            series_id: "s1".to_string(),
            value_type: ValueType::Int64,
            data_size: 49,
            num_pages: 1,
            statistics: int64_stats(&[5, 5, 5]),
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf);
        assert_eq!(buf.len(), header.serialized_len());

        let mut expected = vec![2u8, b's', b'1']; // id
        expected.push(ValueType::Int64.as_u8());
        expected.push(49); // data size varint
        expected.push(1); // num pages varint
        expected.push(3); // stats count varint
        for v in [5i64, 5, 5, 5, 15] {
            expected.extend_from_slice(&v.to_be_bytes());
        }
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_estimated_size_is_constant_upper_bound() {
        let schema = int64_schema();
        let estimate = ChunkHeader::estimated_size(&schema);

        let header = ChunkHeader {
            series_id: schema.id().to_string(),
            value_type: schema.value_type(),
            data_size: u32::MAX as u64,
            num_pages: 1000,
            statistics: int64_stats(&[1, 2, 3]),
        };
        assert!(estimate >= header.serialized_len() as u64);
    }
}
