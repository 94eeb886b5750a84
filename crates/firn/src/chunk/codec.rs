//! Page stream codecs.
//!
//! A page carries two parallel byte streams, times and values. This module
//! provides the building blocks for both:
//!
//! - unsigned varints (7 data bits per byte, continuation in the high bit),
//! - plain big-endian column encoding for every scalar type,
//! - delta-of-delta bit packing for timestamps,
//! - XOR bit packing for doubles.
//!
//! ## Delta-of-delta timestamps
//!
//! - First value: 64 bits raw
//! - Subsequent values use variable-length encoding based on delta-of-delta:
//!   - `0`: `'0'` (1 bit)
//!   - `[-63, 64]`: `'10'` + 7 bits
//!   - `[-255, 256]`: `'110'` + 9 bits
//!   - `[-2047, 2048]`: `'1110'` + 12 bits
//!   - else: `'1111'` + 32 bits
//!
//! ## XOR doubles
//!
//! - First value: 64 bits raw (IEEE 754)
//! - Subsequent values:
//!   - XOR = 0: `'0'` (1 bit)
//!   - Same window: `'10'` + meaningful bits
//!   - New window: `'11'` + 5 bits leading + 6 bits length + meaningful bits
//!
//! Bit streams are padded with zero bits to a whole byte at serialisation.

use crate::chunk::schema::Value;
use bitvec::prelude::*;

/// Writes an unsigned varint into the buffer.
pub fn write_varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Returns the number of bytes `write_varint` produces for `v`.
pub fn varint_len(v: u64) -> usize {
    let mut len = 1;
    let mut v = v >> 7;
    while v > 0 {
        len += 1;
        v >>= 7;
    }
    len
}

/// Writes a timestamp in plain encoding (8 bytes big-endian).
pub fn write_time_plain(buf: &mut Vec<u8>, ts: i64) {
    buf.extend_from_slice(&ts.to_be_bytes());
}

/// Writes a value in plain encoding.
///
/// Bool is one byte (0/1), fixed-width numerics are big-endian, Binary is
/// varint-length-prefixed. Decimal values travel as their double image.
pub fn write_value_plain(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Int32(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Int64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Double(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Decimal(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Value::Binary(bytes) => {
            write_varint(buf, bytes.len() as u64);
            buf.extend_from_slice(bytes);
        }
    }
}

/// Streaming encoder for timestamps using delta-of-delta encoding.
///
/// Owns its output bit stream; the stream only grows between resets.
pub struct DeltaTimestampEncoder {
    first_ts: Option<i64>,
    prev_ts: i64,
    prev_delta: i64,
    bits: BitVec<u8, Msb0>,
}

impl DeltaTimestampEncoder {
    /// Creates a new timestamp encoder with an empty stream.
    pub fn new() -> Self {
        Self {
            first_ts: None,
            prev_ts: 0,
            prev_delta: 0,
            bits: BitVec::new(),
        }
    }

    /// Appends a timestamp to the stream.
    pub fn append(&mut self, timestamp: i64) {
        if self.first_ts.is_none() {
            // First timestamp: write 64 bits raw
            self.first_ts = Some(timestamp);
            self.prev_ts = timestamp;
            self.prev_delta = 0;
            for i in (0..64).rev() {
                self.bits.push((timestamp >> i) & 1 == 1);
            }
            return;
        }

        let delta = timestamp - self.prev_ts;
        let delta_of_delta = delta - self.prev_delta;

        if delta_of_delta == 0 {
            // Case 1: delta-of-delta is 0 -> 1 bit '0'
            self.bits.push(false);
        } else if (-63..=64).contains(&delta_of_delta) {
            // Case 2: [-63, 64] -> '10' + 7 bits
            self.bits.push(true);
            self.bits.push(false);
            let encoded = (delta_of_delta + 63) as u8; // shift to unsigned
            for i in (0..7).rev() {
                self.bits.push((encoded >> i) & 1 == 1);
            }
        } else if (-255..=256).contains(&delta_of_delta) {
            // Case 3: [-255, 256] -> '110' + 9 bits
            self.bits.push(true);
            self.bits.push(true);
            self.bits.push(false);
            let encoded = (delta_of_delta + 255) as u16;
            for i in (0..9).rev() {
                self.bits.push((encoded >> i) & 1 == 1);
            }
        } else if (-2047..=2048).contains(&delta_of_delta) {
            // Case 4: [-2047, 2048] -> '1110' + 12 bits
            self.bits.push(true);
            self.bits.push(true);
            self.bits.push(true);
            self.bits.push(false);
            let encoded = (delta_of_delta + 2047) as u16;
            for i in (0..12).rev() {
                self.bits.push((encoded >> i) & 1 == 1);
            }
        } else {
            // Case 5: else -> '1111' + 32 bits
            self.bits.push(true);
            self.bits.push(true);
            self.bits.push(true);
            self.bits.push(true);
            let encoded = delta_of_delta as i32;
            for i in (0..32).rev() {
                self.bits.push((encoded >> i) & 1 == 1);
            }
        }

        self.prev_delta = delta;
        self.prev_ts = timestamp;
    }

    /// Returns the current stream size rounded up to whole bytes.
    pub fn byte_len(&self) -> usize {
        self.bits.len().div_ceil(8)
    }

    /// Returns the stream contents, zero-padded to a whole byte.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.bits.as_raw_slice().to_vec()
    }

    /// Clears the encoder state and stream.
    pub fn reset(&mut self) {
        self.first_ts = None;
        self.prev_ts = 0;
        self.prev_delta = 0;
        self.bits = BitVec::new();
    }
}

impl Default for DeltaTimestampEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming encoder for doubles using XOR compression.
pub struct XorValueEncoder {
    first_value: Option<u64>,
    prev_value: u64,
    prev_leading: u32,
    prev_trailing: u32,
    bits: BitVec<u8, Msb0>,
}

impl XorValueEncoder {
    /// Creates a new value encoder with an empty stream.
    pub fn new() -> Self {
        Self {
            first_value: None,
            prev_value: 0,
            prev_leading: 0,
            prev_trailing: 0,
            bits: BitVec::new(),
        }
    }

    /// Appends a double to the stream.
    pub fn append(&mut self, value: f64) {
        let bits = value.to_bits();

        if self.first_value.is_none() {
            // First value: write 64 bits raw
            self.first_value = Some(bits);
            self.prev_value = bits;
            for i in (0..64).rev() {
                self.bits.push((bits >> i) & 1 == 1);
            }
            return;
        }

        let xor = bits ^ self.prev_value;

        if xor == 0 {
            // Case 1: identical value -> '0'
            self.bits.push(false);
        } else {
            let leading = xor.leading_zeros();
            let trailing = xor.trailing_zeros();

            // Check if we can reuse the previous window
            if leading >= self.prev_leading && trailing >= self.prev_trailing {
                // Case 2: same window -> '10' + meaningful bits
                self.bits.push(true);
                self.bits.push(false);

                let meaningful_bits = 64 - self.prev_leading - self.prev_trailing;
                let shifted = xor >> self.prev_trailing;
                for i in (0..meaningful_bits).rev() {
                    self.bits.push((shifted >> i) & 1 == 1);
                }
            } else {
                // Case 3: new window -> '11' + 5 bits leading + 6 bits length + meaningful
                self.bits.push(true);
                self.bits.push(true);

                // 5 bits for leading zeros (0-31)
                let leading_capped = leading.min(31);
                for i in (0..5).rev() {
                    self.bits.push((leading_capped >> i) & 1 == 1);
                }

                // 6 bits for meaningful length (1-64, stored as 0-63)
                let meaningful_bits = 64 - leading - trailing;
                let length_encoded = meaningful_bits - 1;
                for i in (0..6).rev() {
                    self.bits.push((length_encoded >> i) & 1 == 1);
                }

                // Write meaningful bits
                let shifted = xor >> trailing;
                for i in (0..meaningful_bits).rev() {
                    self.bits.push((shifted >> i) & 1 == 1);
                }

                self.prev_leading = leading;
                self.prev_trailing = trailing;
            }
        }

        self.prev_value = bits;
    }

    /// Returns the current stream size rounded up to whole bytes.
    pub fn byte_len(&self) -> usize {
        self.bits.len().div_ceil(8)
    }

    /// Returns the stream contents, zero-padded to a whole byte.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.bits.as_raw_slice().to_vec()
    }

    /// Clears the encoder state and stream.
    pub fn reset(&mut self) {
        self.first_value = None;
        self.prev_value = 0;
        self.prev_leading = 0;
        self.prev_trailing = 0;
        self.bits = BitVec::new();
    }
}

impl Default for XorValueEncoder {
    fn default() -> Self {
        Self::new()
    }
}
