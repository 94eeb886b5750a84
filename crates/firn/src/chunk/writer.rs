//! The per-series chunk writer.
//!
//! [`ChunkWriter`] routes appends into the active [`PageEncoder`], maintains
//! page- and chunk-scope [`Statistics`], and decides when to close the
//! current page with an adaptive predictor instead of querying the encoder's
//! size estimate on every append:
//!
//! - a hard cap (`page_point_upper_bound`) always closes the page;
//! - otherwise the estimate is consulted only once `value_count_in_page`
//!   reaches `next_check_at`. If the estimate exceeds the byte threshold the
//!   page is flushed; if not, the next check point is projected from the
//!   observed bytes-per-point ratio, assuming roughly linear growth.
//!
//! A flush that fails to serialise or to land in the [`ChunkBuffer`] drops
//! that page: the failure is logged, the loss is visible through
//! [`ChunkWriter::dropped_page_count`], and the writer continues with a
//! fresh page.

use crate::chunk::buffer::{ChunkBuffer, ChunkHeader};
use crate::chunk::page::PageEncoder;
use crate::chunk::schema::{MeasurementSchema, Value};
use crate::chunk::statistics::Statistics;
use crate::error::{ChunkError, Result};
use crate::sink::FileSink;
use tracing::{debug, error};

/// Initial and post-flush value of the predictor's check point. Gives the
/// estimate enough data points to make a stable first projection.
pub const MINIMUM_RECORD_COUNT_FOR_CHECK: u32 = 1500;

/// Default soft target for the serialised page payload size (bytes).
pub const DEFAULT_PAGE_SIZE_THRESHOLD: u64 = 64 * 1024;

/// Default hard cap on points per page.
pub const DEFAULT_PAGE_POINT_UPPER_BOUND: u32 = 1024 * 1024;

/// Configuration for chunk writer behavior.
#[derive(Debug, Clone)]
pub struct ChunkWriterConfig {
    /// Soft target page payload size in bytes. `0` flushes after every
    /// point (diagnostic mode).
    pub page_size_threshold: u64,
    /// Hard cap on points per page. Must be positive.
    pub page_point_upper_bound: u32,
    /// Point count below which the size estimate is never consulted. Must be
    /// positive.
    pub minimum_record_count_for_check: u32,
}

impl Default for ChunkWriterConfig {
    fn default() -> Self {
        Self {
            page_size_threshold: DEFAULT_PAGE_SIZE_THRESHOLD,
            page_point_upper_bound: DEFAULT_PAGE_POINT_UPPER_BOUND,
            minimum_record_count_for_check: MINIMUM_RECORD_COUNT_FOR_CHECK,
        }
    }
}

/// Writes one series' points as encoded pages packed into a chunk.
///
/// Created once per series per file. Accepts appends until the chunk is
/// emitted with [`ChunkWriter::write_to_file_writer`]; after that the writer
/// is reusable for the next chunk of the same series.
pub struct ChunkWriter {
    schema: MeasurementSchema,
    config: ChunkWriterConfig,
    /// Encoder of the in-progress page.
    page_encoder: PageEncoder,
    buffer: ChunkBuffer,
    /// Aggregate over the in-progress page. Reset on every flush.
    page_statistics: Statistics,
    /// Aggregate over every emitted page. Reset when the chunk is emitted.
    chunk_statistics: Statistics,
    value_count_in_page: u32,
    /// Point count at which the size estimate is next consulted.
    next_check_at: u32,
    /// Timestamp of the latest written point.
    last_time: i64,
    /// Timestamp of the first point in the in-progress page.
    page_min_ts: Option<i64>,
    dropped_pages: u64,
    dropped_points: u64,
}

impl ChunkWriter {
    /// Creates a writer for the series described by `schema`.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::InvalidConfig` if `page_point_upper_bound` or
    /// `minimum_record_count_for_check` is zero.
    pub fn new(schema: MeasurementSchema, config: ChunkWriterConfig) -> Result<Self> {
        if config.page_point_upper_bound == 0 {
            return Err(ChunkError::InvalidConfig(
                "page_point_upper_bound must be positive".to_string(),
            ));
        }
        if config.minimum_record_count_for_check == 0 {
            return Err(ChunkError::InvalidConfig(
                "minimum_record_count_for_check must be positive".to_string(),
            ));
        }

        let value_type = schema.value_type();
        let page_encoder = PageEncoder::new(&schema);
        let buffer = ChunkBuffer::new(schema.clone());
        let next_check_at = config.minimum_record_count_for_check;
        Ok(Self {
            schema,
            config,
            page_encoder,
            buffer,
            page_statistics: Statistics::of_type(value_type),
            chunk_statistics: Statistics::of_type(value_type),
            value_count_in_page: 0,
            next_check_at,
            last_time: 0,
            page_min_ts: None,
            dropped_pages: 0,
            dropped_points: 0,
        })
    }

    /// Returns the schema this writer was constructed with.
    pub fn schema(&self) -> &MeasurementSchema {
        &self.schema
    }

    /// Appends one point to the series.
    ///
    /// Timestamps are recorded as given; callers should supply them in
    /// non-decreasing order but the writer does not enforce it.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::TypeMismatch` if the value's variant does not
    /// match the schema; nothing is recorded and the writer remains usable.
    pub fn write(&mut self, time: i64, value: Value) -> Result<()> {
        let actual = value.value_type();
        if actual != self.schema.value_type() {
            return Err(ChunkError::TypeMismatch {
                expected: self.schema.value_type(),
                actual,
            });
        }

        self.last_time = time;
        if self.page_min_ts.is_none() {
            self.page_min_ts = Some(time);
        }
        self.page_encoder.append(time, &value);
        self.page_statistics.update(&value)?;
        self.value_count_in_page += 1;
        self.check_page_size_and_may_flush();
        Ok(())
    }

    /// Decides whether the in-progress page must be flushed.
    ///
    /// The size estimate is only consulted once the page holds
    /// `next_check_at` points; the check point is then re-projected from the
    /// observed bytes-per-point ratio.
    fn check_page_size_and_may_flush(&mut self) {
        if self.value_count_in_page == self.config.page_point_upper_bound {
            debug!(
                "page point count reached the upper bound {}, flushing {}",
                self.config.page_point_upper_bound,
                self.schema.id()
            );
            self.write_page();
            return;
        }
        if self.config.page_size_threshold == 0 {
            // diagnostic mode: one point per page
            self.write_page();
            return;
        }
        if self.value_count_in_page < self.next_check_at {
            return;
        }

        let estimate = self.page_encoder.estimate_max_mem_size();
        if estimate == 0 {
            // nothing measurable yet, look again after another full interval
            self.next_check_at =
                self.value_count_in_page + self.config.minimum_record_count_for_check;
        } else if estimate > self.config.page_size_threshold {
            debug!(
                "page budget reached for {}: estimate {} > threshold {} at {} points, flushing",
                self.schema.id(),
                estimate,
                self.config.page_size_threshold,
                self.value_count_in_page
            );
            self.write_page();
        } else {
            let projected = ((self.config.page_size_threshold as f64 / estimate as f64)
                * self.value_count_in_page as f64) as u32;
            // the projection can land at or below the current count when the
            // estimate sits just under the threshold; force progress
            self.next_check_at = projected.max(self.value_count_in_page + 1);
            debug!(
                "page budget not reached for {}: estimate {} <= threshold {} at {} points, next check at {}",
                self.schema.id(),
                estimate,
                self.config.page_size_threshold,
                self.value_count_in_page,
                self.next_check_at
            );
        }
    }

    /// Closes the in-progress page: serialises it, appends it to the chunk
    /// buffer, and folds its statistics into the chunk statistics.
    ///
    /// A page that fails to serialise or to land in the buffer is dropped
    /// and logged; the writer continues with a fresh page either way.
    fn write_page(&mut self) {
        match self.page_encoder.serialize_uncompressed() {
            Ok(payload) => {
                let min_ts = self.page_min_ts.unwrap_or(self.last_time);
                match self.buffer.write_page_header_and_data(
                    &payload,
                    self.value_count_in_page,
                    &self.page_statistics,
                    self.last_time,
                    min_ts,
                ) {
                    Ok(()) => {
                        if let Err(e) = self.chunk_statistics.merge(&self.page_statistics) {
                            error!("failed to merge page statistics for {}: {}", self.schema.id(), e);
                        }
                    }
                    Err(e) => {
                        error!(
                            "chunk buffer rejected a page of {}, dropping {} points: {}",
                            self.schema.id(),
                            self.value_count_in_page,
                            e
                        );
                        self.dropped_pages += 1;
                        self.dropped_points += self.value_count_in_page as u64;
                    }
                }
            }
            Err(e) => {
                error!(
                    "page serialisation failed for {}, dropping {} points: {}",
                    self.schema.id(),
                    self.value_count_in_page,
                    e
                );
                self.dropped_pages += 1;
                self.dropped_points += self.value_count_in_page as u64;
            }
        }

        self.page_min_ts = None;
        self.value_count_in_page = 0;
        self.page_encoder.reset();
        self.page_statistics = Statistics::of_type(self.schema.value_type());
        self.next_check_at = self.config.minimum_record_count_for_check;
    }

    /// Flushes the in-progress page if it holds any points. Idempotent on an
    /// empty page.
    pub fn seal_current_page(&mut self) {
        if self.value_count_in_page > 0 {
            self.write_page();
        }
    }

    /// Seals the current page and emits the whole chunk to `sink`, then
    /// resets the chunk statistics so the writer can start the next chunk.
    ///
    /// # Errors
    ///
    /// Surfaces sink I/O errors; the chunk is considered failed and no
    /// partial recovery is attempted.
    pub fn write_to_file_writer(&mut self, sink: &mut dyn FileSink) -> Result<()> {
        self.seal_current_page();
        self.buffer
            .write_all_pages_of_series_to_file(sink, &self.chunk_statistics)?;
        self.chunk_statistics = Statistics::of_type(self.schema.value_type());
        Ok(())
    }

    /// Upper-bound estimate of the memory held by this writer: the live page
    /// encoder plus the buffered pages.
    pub fn estimate_max_series_mem_size(&self) -> u64 {
        self.page_encoder.estimate_max_mem_size() + self.buffer.estimate_max_page_mem_size()
    }

    /// Estimate of the serialised chunk size so far: header estimate plus
    /// buffered page bytes.
    pub fn current_chunk_size(&self) -> u64 {
        ChunkHeader::estimated_size(&self.schema) + self.buffer.current_data_size()
    }

    /// Returns the number of pages flushed into the current chunk.
    pub fn num_of_pages(&self) -> u32 {
        self.buffer.num_pages()
    }

    /// Number of pages dropped because a flush failed.
    pub fn dropped_page_count(&self) -> u64 {
        self.dropped_pages
    }

    /// Number of points lost inside dropped pages.
    pub fn dropped_point_count(&self) -> u64 {
        self.dropped_points
    }
}
