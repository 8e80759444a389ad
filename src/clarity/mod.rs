//! Clarity value codec.
//!
//! # Data Flow
//! ```text
//! Rust arguments (u64, &str, StacksAddress)
//!     → value.rs (ClarityValue, consensus serialization)
//!     → hex string for the node's call-read endpoint
//!
//! Node response hex
//!     → value.rs (deserialize)
//!     → typed accessors (as_u128, tuple_field, into_optional)
//! ```
//!
//! Principals are carried as c32check addresses (c32.rs).

pub mod c32;
pub mod value;

pub use c32::StacksAddress;
pub use value::ClarityValue;

use thiserror::Error;

/// Errors raised while encoding or decoding Clarity values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClarityError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("unknown type prefix 0x{0:02x}")]
    UnknownType(u8),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("invalid utf-8 in string value")]
    InvalidUtf8,

    #[error("value nesting exceeds depth {0}")]
    TooDeep(usize),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("tuple has no field '{0}'")]
    MissingField(String),
}

pub type ClarityResult<T> = Result<T, ClarityError>;
