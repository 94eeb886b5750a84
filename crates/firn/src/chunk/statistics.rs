//! Running per-type aggregates maintained at page and chunk scope.
//!
//! One record shape exists per scalar type: integer series track a saturating
//! 64-bit sum, float series a double sum, decimal series a value range only,
//! and bool/binary series just first/last. A page-scope record is folded into
//! the chunk-scope record on every page flush.
//!
//! ## Wire layout (big-endian)
//!
//! `varint(count)` followed, only when `count > 0`, by:
//!
//! | type    | fields                                             |
//! |---------|----------------------------------------------------|
//! | Bool    | `first u8, last u8`                                |
//! | Int32   | `min i32, max i32, first i32, last i32, sum i64`   |
//! | Int64   | `min i64, max i64, first i64, last i64, sum i64`   |
//! | Float   | `min f32, max f32, first f32, last f32, sum f64`   |
//! | Double  | `min f64, max f64, first f64, last f64, sum f64`   |
//! | Decimal | `min f64, max f64, first f64, last f64`            |
//! | Binary  | `varint(first_len), first, varint(last_len), last` |

use crate::chunk::codec::{varint_len, write_varint};
use crate::chunk::schema::{Value, ValueType};
use crate::error::{ChunkError, Result};

/// Aggregate for integer series. The sum saturates at the i64 range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegerStatistics<V> {
    /// Number of values seen.
    pub count: u64,
    /// Smallest value seen. Unobservable while `count == 0`.
    pub min: V,
    /// Largest value seen. Unobservable while `count == 0`.
    pub max: V,
    /// Earliest-inserted value. Unobservable while `count == 0`.
    pub first: V,
    /// Most-recently-inserted value. Unobservable while `count == 0`.
    pub last: V,
    /// Saturating sum of all values.
    pub sum: i64,
}

impl<V: Copy + Ord + Into<i64>> IntegerStatistics<V> {
    fn update(&mut self, v: V) {
        if self.count == 0 {
            self.min = v;
            self.max = v;
            self.first = v;
        } else {
            if v < self.min {
                self.min = v;
            }
            if v > self.max {
                self.max = v;
            }
        }
        self.last = v;
        self.sum = self.sum.saturating_add(v.into());
        self.count += 1;
    }

    fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.last = other.last;
        self.sum = self.sum.saturating_add(other.sum);
        self.count += other.count;
    }
}

/// Aggregate for float series with a double-precision sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatStatistics<V> {
    /// Number of values seen.
    pub count: u64,
    /// Smallest value seen. Unobservable while `count == 0`.
    pub min: V,
    /// Largest value seen. Unobservable while `count == 0`.
    pub max: V,
    /// Earliest-inserted value. Unobservable while `count == 0`.
    pub first: V,
    /// Most-recently-inserted value. Unobservable while `count == 0`.
    pub last: V,
    /// Sum of all values as f64.
    pub sum: f64,
}

impl<V: Copy + PartialOrd + Into<f64>> FloatStatistics<V> {
    fn update(&mut self, v: V) {
        if self.count == 0 {
            self.min = v;
            self.max = v;
            self.first = v;
        } else {
            if v < self.min {
                self.min = v;
            }
            if v > self.max {
                self.max = v;
            }
        }
        self.last = v;
        self.sum += v.into();
        self.count += 1;
    }

    fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.last = other.last;
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Aggregate for decimal series: value range but no sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecimalStatistics {
    /// Number of values seen.
    pub count: u64,
    /// Smallest value seen. Unobservable while `count == 0`.
    pub min: f64,
    /// Largest value seen. Unobservable while `count == 0`.
    pub max: f64,
    /// Earliest-inserted value. Unobservable while `count == 0`.
    pub first: f64,
    /// Most-recently-inserted value. Unobservable while `count == 0`.
    pub last: f64,
}

impl DecimalStatistics {
    fn update(&mut self, v: f64) {
        if self.count == 0 {
            self.min = v;
            self.max = v;
            self.first = v;
        } else {
            if v < self.min {
                self.min = v;
            }
            if v > self.max {
                self.max = v;
            }
        }
        self.last = v;
        self.count += 1;
    }

    fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.last = other.last;
        self.count += other.count;
    }
}

/// Aggregate for unordered series (bool, binary): count plus first/last only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderlessStatistics<V> {
    /// Number of values seen.
    pub count: u64,
    /// Earliest-inserted value. Unobservable while `count == 0`.
    pub first: V,
    /// Most-recently-inserted value. Unobservable while `count == 0`.
    pub last: V,
}

impl<V: Clone> OrderlessStatistics<V> {
    fn update(&mut self, v: V) {
        if self.count == 0 {
            self.first = v.clone();
        }
        self.last = v;
        self.count += 1;
    }

    fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            self.first = other.first.clone();
        }
        self.last = other.last.clone();
        self.count += other.count;
    }
}

/// A type-specialised running aggregate for one series.
///
/// Created empty from a type tag with [`Statistics::of_type`]; fed with
/// [`Statistics::update`]; page records are folded into the chunk record with
/// [`Statistics::merge`]. Merge order matters for `first`/`last`.
#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    /// Aggregate of a Bool series.
    Bool(OrderlessStatistics<bool>),
    /// Aggregate of an Int32 series.
    Int32(IntegerStatistics<i32>),
    /// Aggregate of an Int64 series.
    Int64(IntegerStatistics<i64>),
    /// Aggregate of a Float series.
    Float(FloatStatistics<f32>),
    /// Aggregate of a Double series.
    Double(FloatStatistics<f64>),
    /// Aggregate of a Decimal series.
    Decimal(DecimalStatistics),
    /// Aggregate of a Binary series.
    Binary(OrderlessStatistics<Vec<u8>>),
}

impl Statistics {
    /// Creates an empty aggregate for the given series type.
    pub fn of_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Statistics::Bool(Default::default()),
            ValueType::Int32 => Statistics::Int32(Default::default()),
            ValueType::Int64 => Statistics::Int64(Default::default()),
            ValueType::Float => Statistics::Float(Default::default()),
            ValueType::Double => Statistics::Double(Default::default()),
            ValueType::Decimal => Statistics::Decimal(Default::default()),
            ValueType::Binary => Statistics::Binary(Default::default()),
        }
    }

    /// Returns the series type this aggregate belongs to.
    pub fn value_type(&self) -> ValueType {
        match self {
            Statistics::Bool(_) => ValueType::Bool,
            Statistics::Int32(_) => ValueType::Int32,
            Statistics::Int64(_) => ValueType::Int64,
            Statistics::Float(_) => ValueType::Float,
            Statistics::Double(_) => ValueType::Double,
            Statistics::Decimal(_) => ValueType::Decimal,
            Statistics::Binary(_) => ValueType::Binary,
        }
    }

    /// Returns the number of values folded into this aggregate.
    pub fn count(&self) -> u64 {
        match self {
            Statistics::Bool(s) => s.count,
            Statistics::Int32(s) => s.count,
            Statistics::Int64(s) => s.count,
            Statistics::Float(s) => s.count,
            Statistics::Double(s) => s.count,
            Statistics::Decimal(s) => s.count,
            Statistics::Binary(s) => s.count,
        }
    }

    /// Returns true if no value has been folded in yet.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Folds one value into the aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::TypeMismatch` if the value's variant does not
    /// match this aggregate's type; the aggregate is left unchanged.
    pub fn update(&mut self, value: &Value) -> Result<()> {
        match (self, value) {
            (Statistics::Bool(s), Value::Bool(v)) => s.update(*v),
            (Statistics::Int32(s), Value::Int32(v)) => s.update(*v),
            (Statistics::Int64(s), Value::Int64(v)) => s.update(*v),
            (Statistics::Float(s), Value::Float(v)) => s.update(*v),
            (Statistics::Double(s), Value::Double(v)) => s.update(*v),
            (Statistics::Decimal(s), Value::Decimal(v)) => s.update(*v),
            (Statistics::Binary(s), Value::Binary(v)) => s.update(v.clone()),
            (stats, value) => {
                return Err(ChunkError::TypeMismatch {
                    expected: stats.value_type(),
                    actual: value.value_type(),
                })
            }
        }
        Ok(())
    }

    /// Folds another aggregate of the same type into this one, as if its
    /// sequence had been inserted after this one's.
    ///
    /// Merging an empty aggregate is a no-op; merging into an empty aggregate
    /// copies the operand.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::TypeMismatch` if the types differ.
    pub fn merge(&mut self, other: &Statistics) -> Result<()> {
        match (self, other) {
            (Statistics::Bool(a), Statistics::Bool(b)) => a.merge(b),
            (Statistics::Int32(a), Statistics::Int32(b)) => a.merge(b),
            (Statistics::Int64(a), Statistics::Int64(b)) => a.merge(b),
            (Statistics::Float(a), Statistics::Float(b)) => a.merge(b),
            (Statistics::Double(a), Statistics::Double(b)) => a.merge(b),
            (Statistics::Decimal(a), Statistics::Decimal(b)) => a.merge(b),
            (Statistics::Binary(a), Statistics::Binary(b)) => a.merge(b),
            (stats, other) => {
                return Err(ChunkError::TypeMismatch {
                    expected: stats.value_type(),
                    actual: other.value_type(),
                })
            }
        }
        Ok(())
    }

    /// Serialises the aggregate into the buffer (layout in the module docs).
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.count());
        if self.is_empty() {
            return;
        }
        match self {
            Statistics::Bool(s) => {
                buf.push(u8::from(s.first));
                buf.push(u8::from(s.last));
            }
            Statistics::Int32(s) => {
                buf.extend_from_slice(&s.min.to_be_bytes());
                buf.extend_from_slice(&s.max.to_be_bytes());
                buf.extend_from_slice(&s.first.to_be_bytes());
                buf.extend_from_slice(&s.last.to_be_bytes());
                buf.extend_from_slice(&s.sum.to_be_bytes());
            }
            Statistics::Int64(s) => {
                buf.extend_from_slice(&s.min.to_be_bytes());
                buf.extend_from_slice(&s.max.to_be_bytes());
                buf.extend_from_slice(&s.first.to_be_bytes());
                buf.extend_from_slice(&s.last.to_be_bytes());
                buf.extend_from_slice(&s.sum.to_be_bytes());
            }
            Statistics::Float(s) => {
                buf.extend_from_slice(&s.min.to_be_bytes());
                buf.extend_from_slice(&s.max.to_be_bytes());
                buf.extend_from_slice(&s.first.to_be_bytes());
                buf.extend_from_slice(&s.last.to_be_bytes());
                buf.extend_from_slice(&s.sum.to_be_bytes());
            }
            Statistics::Double(s) => {
                buf.extend_from_slice(&s.min.to_be_bytes());
                buf.extend_from_slice(&s.max.to_be_bytes());
                buf.extend_from_slice(&s.first.to_be_bytes());
                buf.extend_from_slice(&s.last.to_be_bytes());
                buf.extend_from_slice(&s.sum.to_be_bytes());
            }
            Statistics::Decimal(s) => {
                buf.extend_from_slice(&s.min.to_be_bytes());
                buf.extend_from_slice(&s.max.to_be_bytes());
                buf.extend_from_slice(&s.first.to_be_bytes());
                buf.extend_from_slice(&s.last.to_be_bytes());
            }
            Statistics::Binary(s) => {
                write_varint(buf, s.first.len() as u64);
                buf.extend_from_slice(&s.first);
                write_varint(buf, s.last.len() as u64);
                buf.extend_from_slice(&s.last);
            }
        }
    }

    /// Returns the exact number of bytes `write_to` produces.
    pub fn serialized_len(&self) -> usize {
        let prefix = varint_len(self.count());
        if self.is_empty() {
            return prefix;
        }
        prefix
            + match self {
                Statistics::Binary(s) => {
                    varint_len(s.first.len() as u64)
                        + s.first.len()
                        + varint_len(s.last.len() as u64)
                        + s.last.len()
                }
                _ => Self::fixed_payload_len(self.value_type()),
            }
    }

    /// Returns the non-empty payload size for types with a fixed layout.
    ///
    /// Binary payloads are variable; this reports 0 for them, so the result
    /// is usable as a size-estimate component, not an exact length.
    pub fn fixed_payload_len(value_type: ValueType) -> usize {
        match value_type {
            ValueType::Bool => 2,
            ValueType::Int32 => 4 * 4 + 8,
            ValueType::Int64 => 4 * 8 + 8,
            ValueType::Float => 4 * 4 + 8,
            ValueType::Double => 4 * 8 + 8,
            ValueType::Decimal => 4 * 8,
            ValueType::Binary => 0,
        }
    }
}
