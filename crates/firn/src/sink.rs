//! File-writer boundary.
//!
//! The chunk writer does not own a file. When a chunk is sealed its bytes are
//! handed to a [`FileSink`], the seam to whatever assembles whole files out
//! of chunks. [`StreamSink`] is the bundled implementation that serialises
//! chunks to any [`Write`] destination.

use crate::chunk::buffer::ChunkHeader;
use crate::error::Result;
use std::io::Write;

/// Destination for sealed chunks.
///
/// Calls arrive strictly as `start_chunk`, `append_bytes` (any number of
/// times), `end_chunk`, for one chunk at a time.
pub trait FileSink {
    /// Begins a chunk: receives the header to emit ahead of the page bytes.
    fn start_chunk(&mut self, header: &ChunkHeader) -> Result<()>;

    /// Receives a run of page bytes belonging to the current chunk.
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Marks the current chunk complete.
    fn end_chunk(&mut self) -> Result<()>;
}

/// Sink that serialises chunks to a [`Write`] destination.
pub struct StreamSink<W: Write> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write> StreamSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    /// Total bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Unwraps the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FileSink for StreamSink<W> {
    fn start_chunk(&mut self, header: &ChunkHeader) -> Result<()> {
        let mut buf = Vec::with_capacity(header.serialized_len());
        header.write_to(&mut buf);
        self.writer.write_all(&buf)?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn end_chunk(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
