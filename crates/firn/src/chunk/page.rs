//! In-memory page encoding.
//!
//! A [`PageEncoder`] accumulates `(timestamp, value)` pairs into two parallel
//! streams selected by the measurement schema. Serialising produces the page
//! payload:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  varint: time stream byte length             │
//! ├──────────────────────────────────────────────┤
//! │  time stream bytes                           │
//! ├──────────────────────────────────────────────┤
//! │  value stream bytes                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The payload is preceded on disk by a [`PageHeader`], which the chunk
//! buffer serialises when the page is appended to a chunk.

use crate::chunk::codec::{
    varint_len, write_time_plain, write_value_plain, write_varint, DeltaTimestampEncoder,
    XorValueEncoder,
};
use crate::chunk::schema::{MeasurementSchema, TimeEncoding, Value, ValueEncoding};
use crate::chunk::statistics::Statistics;
use crate::error::Result;

enum TimeStream {
    Plain(Vec<u8>),
    DeltaOfDelta(DeltaTimestampEncoder),
}

impl TimeStream {
    fn byte_len(&self) -> usize {
        match self {
            TimeStream::Plain(buf) => buf.len(),
            TimeStream::DeltaOfDelta(enc) => enc.byte_len(),
        }
    }
}

enum ValueStream {
    Plain(Vec<u8>),
    Gorilla(XorValueEncoder),
}

impl ValueStream {
    fn byte_len(&self) -> usize {
        match self {
            ValueStream::Plain(buf) => buf.len(),
            ValueStream::Gorilla(enc) => enc.byte_len(),
        }
    }
}

/// Encodes one in-progress page of a single series.
///
/// Values are assumed to have been checked against the schema by the caller;
/// accumulation itself is infallible.
pub struct PageEncoder {
    time: TimeStream,
    value: ValueStream,
    value_count: u32,
    #[cfg(test)]
    fail_next_serialize: bool,
}

impl PageEncoder {
    /// Creates an empty encoder for the schema's encodings.
    pub fn new(schema: &MeasurementSchema) -> Self {
        let time = match schema.time_encoding() {
            TimeEncoding::Plain => TimeStream::Plain(Vec::new()),
            TimeEncoding::DeltaOfDelta => TimeStream::DeltaOfDelta(DeltaTimestampEncoder::new()),
        };
        let value = match schema.value_encoding() {
            ValueEncoding::Plain => ValueStream::Plain(Vec::new()),
            ValueEncoding::Gorilla => ValueStream::Gorilla(XorValueEncoder::new()),
        };
        Self {
            time,
            value,
            value_count: 0,
            #[cfg(test)]
            fail_next_serialize: false,
        }
    }

    /// Records one point.
    pub fn append(&mut self, time: i64, value: &Value) {
        match &mut self.time {
            TimeStream::Plain(buf) => write_time_plain(buf, time),
            TimeStream::DeltaOfDelta(enc) => enc.append(time),
        }
        match &mut self.value {
            ValueStream::Plain(buf) => write_value_plain(buf, value),
            ValueStream::Gorilla(enc) => {
                // schema validation restricts Gorilla to Double series
                if let Value::Double(v) = value {
                    enc.append(*v);
                } else {
                    debug_assert!(false, "non-double value on a Gorilla-encoded series");
                }
            }
        }
        self.value_count += 1;
    }

    /// Returns the number of points appended since the last reset.
    pub fn value_count(&self) -> u32 {
        self.value_count
    }

    /// Upper-bound estimate of the serialised payload size in bytes.
    ///
    /// O(1) and monotonically non-decreasing between resets.
    pub fn estimate_max_mem_size(&self) -> u64 {
        let time_len = self.time.byte_len();
        (varint_len(time_len as u64) + time_len + self.value.byte_len()) as u64
    }

    /// Produces the page payload bytes. Intended to be called once per page,
    /// immediately before a reset.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the streams cannot be serialised.
    pub fn serialize_uncompressed(&mut self) -> Result<Vec<u8>> {
        #[cfg(test)]
        if self.fail_next_serialize {
            self.fail_next_serialize = false;
            return Err(crate::error::ChunkError::Io(std::io::Error::other(
                "injected serialisation failure",
            )));
        }

        let time_bytes = match &self.time {
            TimeStream::Plain(buf) => buf.clone(),
            TimeStream::DeltaOfDelta(enc) => enc.as_bytes(),
        };
        let value_bytes = match &self.value {
            ValueStream::Plain(buf) => buf.clone(),
            ValueStream::Gorilla(enc) => enc.as_bytes(),
        };

        let mut payload =
            Vec::with_capacity(varint_len(time_bytes.len() as u64) + time_bytes.len() + value_bytes.len());
        write_varint(&mut payload, time_bytes.len() as u64);
        payload.extend_from_slice(&time_bytes);
        payload.extend_from_slice(&value_bytes);
        Ok(payload)
    }

    /// Clears all encoder state; `value_count` returns to 0.
    pub fn reset(&mut self) {
        match &mut self.time {
            TimeStream::Plain(buf) => *buf = Vec::new(),
            TimeStream::DeltaOfDelta(enc) => enc.reset(),
        }
        match &mut self.value {
            ValueStream::Plain(buf) => *buf = Vec::new(),
            ValueStream::Gorilla(enc) => enc.reset(),
        }
        self.value_count = 0;
    }

    /// Makes the next `serialize_uncompressed` call fail, once.
    #[cfg(test)]
    pub(crate) fn inject_serialize_failure(&mut self) {
        self.fail_next_serialize = true;
    }
}

/// Header preceding one page's payload inside a chunk.
///
/// Format:
/// - value_count: varint
/// - payload_len: varint
/// - max_ts: i64 BE
/// - min_ts: i64 BE
/// - page statistics
#[derive(Debug, Clone)]
pub struct PageHeader {
    /// Number of points in the page.
    pub value_count: u32,
    /// Byte length of the payload that follows the header.
    pub payload_len: u32,
    /// Timestamp of the most recent point written to the page.
    pub max_ts: i64,
    /// Timestamp of the first point written to the page.
    pub min_ts: i64,
    /// Aggregate over the page's values.
    pub statistics: Statistics,
}

impl PageHeader {
    /// Serialises the header into the buffer.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.value_count as u64);
        write_varint(buf, self.payload_len as u64);
        buf.extend_from_slice(&self.max_ts.to_be_bytes());
        buf.extend_from_slice(&self.min_ts.to_be_bytes());
        self.statistics.write_to(buf);
    }

    /// Returns the exact number of bytes `write_to` produces, derivable from
    /// the fields without scanning the payload.
    pub fn serialized_len(&self) -> usize {
        varint_len(self.value_count as u64)
            + varint_len(self.payload_len as u64)
            + 8
            + 8
            + self.statistics.serialized_len()
    }
}
