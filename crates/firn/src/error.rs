//! Error and Result types for firn chunk operations.

use crate::chunk::schema::ValueType;
use std::io;
use thiserror::Error;

/// A convenience `Result` type for chunk operations.
pub type Result<T> = std::result::Result<T, ChunkError>;

/// The error type for chunk writing operations.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// A value of the wrong variant was supplied to a typed writer.
    #[error("type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        /// The type the series was constructed with.
        expected: ValueType,
        /// The type of the value actually supplied.
        actual: ValueType,
    },

    /// The requested value encoding cannot represent the schema's type.
    #[error("{encoding} encoding is not supported for {value_type:?}")]
    UnsupportedEncoding {
        /// Name of the rejected encoding.
        encoding: &'static str,
        /// The series type it was requested for.
        value_type: ValueType,
    },

    /// Writer construction was given an unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The chunk buffer rejected a page.
    #[error("page rejected: {0}")]
    Page(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
