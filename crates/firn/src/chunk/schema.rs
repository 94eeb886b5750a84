//! Series schema: scalar types, tagged values, and per-series encoding choices.

use crate::error::{ChunkError, Result};

/// Scalar type of a series.
///
/// The one-byte codes are part of the on-disk chunk header and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    /// Boolean series.
    Bool = 0,
    /// 32-bit signed integer series.
    Int32 = 1,
    /// 64-bit signed integer series.
    Int64 = 2,
    /// 32-bit IEEE-754 float series.
    Float = 3,
    /// 64-bit IEEE-754 float series.
    Double = 4,
    /// Fixed-point decimal series, carried as its double image on the wire.
    Decimal = 5,
    /// Variable-length byte-string series.
    Binary = 6,
}

impl ValueType {
    /// Creates a ValueType from a u8 code.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bool),
            1 => Some(Self::Int32),
            2 => Some(Self::Int64),
            3 => Some(Self::Float),
            4 => Some(Self::Double),
            5 => Some(Self::Decimal),
            6 => Some(Self::Binary),
            _ => None,
        }
    }

    /// Returns the wire code for this type.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A single typed value of a point.
///
/// The variant must match the [`ValueType`] of the series it is written to;
/// the writer rejects mismatches with [`ChunkError::TypeMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// A 32-bit integer value.
    Int32(i32),
    /// A 64-bit integer value.
    Int64(i64),
    /// A 32-bit float value.
    Float(f32),
    /// A 64-bit float value.
    Double(f64),
    /// A decimal value, carried as its double image.
    Decimal(f64),
    /// A byte-string value.
    Binary(Vec<u8>),
}

impl Value {
    /// Returns the [`ValueType`] of this value's variant.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Binary(_) => ValueType::Binary,
        }
    }
}

/// Encoding of the page time stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TimeEncoding {
    /// Raw encoding (8 bytes big-endian per timestamp).
    Plain = 0,
    /// Delta-of-delta bit packing.
    #[default]
    DeltaOfDelta = 1,
}

impl TimeEncoding {
    /// Creates a TimeEncoding from a u8 code.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Plain),
            1 => Some(Self::DeltaOfDelta),
            _ => None,
        }
    }
}

/// Encoding of the page value stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ValueEncoding {
    /// Raw type-dependent encoding (big-endian, length-prefixed for Binary).
    #[default]
    Plain = 0,
    /// XOR bit packing over consecutive doubles. Double series only.
    Gorilla = 1,
}

impl ValueEncoding {
    /// Creates a ValueEncoding from a u8 code.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Plain),
            1 => Some(Self::Gorilla),
            _ => None,
        }
    }
}

/// Immutable descriptor of one measurement (a named scalar series).
///
/// Supplied at writer construction and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MeasurementSchema {
    id: String,
    value_type: ValueType,
    time_encoding: TimeEncoding,
    value_encoding: ValueEncoding,
}

impl MeasurementSchema {
    /// Creates a schema with the default encodings (delta-of-delta
    /// timestamps, plain values).
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            value_type,
            time_encoding: TimeEncoding::default(),
            value_encoding: ValueEncoding::default(),
        }
    }

    /// Creates a schema with explicit encodings.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::UnsupportedEncoding` if the value encoding cannot
    /// represent the series type (Gorilla requires Double).
    pub fn with_encodings(
        id: impl Into<String>,
        value_type: ValueType,
        time_encoding: TimeEncoding,
        value_encoding: ValueEncoding,
    ) -> Result<Self> {
        if value_encoding == ValueEncoding::Gorilla && value_type != ValueType::Double {
            return Err(ChunkError::UnsupportedEncoding {
                encoding: "Gorilla",
                value_type,
            });
        }
        Ok(Self {
            id: id.into(),
            value_type,
            time_encoding,
            value_encoding,
        })
    }

    /// Returns the series identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the scalar type of the series.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns the time stream encoding.
    pub fn time_encoding(&self) -> TimeEncoding {
        self.time_encoding
    }

    /// Returns the value stream encoding.
    pub fn value_encoding(&self) -> ValueEncoding {
        self.value_encoding
    }
}
