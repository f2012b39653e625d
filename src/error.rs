//! Error types for the LRU cache library.
//!
//! Lookups never fail: a missing key is reported through `Option` or `bool`.
//! The errors below only come out of the codec layer and out of `load`/`dump`,
//! where the input bytes or the underlying sink/source can be broken.

use std::io;
use std::str::Utf8Error;

use thiserror::Error;

/// Failure to turn one chunk of bytes back into a typed value.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A fixed-width value was decoded from a chunk of the wrong length.
    #[error("{type_name} chunk must be {expected} bytes, got {actual}")]
    Width {
        /// Name of the decoded type.
        type_name: &'static str,
        /// Width the type requires.
        expected: usize,
        /// Length of the chunk that was supplied.
        actual: usize,
    },

    /// A sequence chunk does not split evenly into elements.
    #[error("sequence chunk of {len} bytes is not a multiple of the {width}-byte element width")]
    Misaligned {
        /// Length of the chunk.
        len: usize,
        /// Width of one element.
        width: usize,
    },

    /// A fixed-size array was decoded from the wrong number of elements.
    #[error("array chunk holds {actual} elements, expected {expected}")]
    ArrayLength {
        /// Array length of the target type.
        expected: usize,
        /// Number of elements found in the chunk.
        actual: usize,
    },

    /// The bytes have the right width but do not form a valid value.
    #[error("invalid {type_name} value: {value:#x}")]
    InvalidValue {
        /// Name of the decoded type.
        type_name: &'static str,
        /// The raw value that was rejected.
        value: u32,
    },

    /// A string chunk is not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    /// Failure reported by a user-provided codec.
    #[error("{0}")]
    Custom(String),
}

/// The main error type for cache persistence.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The input ended in the middle of a length prefix.
    #[error("truncated length prefix: {got} of 8 bytes available")]
    TruncatedLength {
        /// Number of prefix bytes that were present.
        got: usize,
    },

    /// A length prefix claims more bytes than the input still holds.
    #[error("truncated chunk: length prefix claims {expected} bytes, {available} available")]
    TruncatedChunk {
        /// Length announced by the prefix.
        expected: u64,
        /// Bytes actually left in the input.
        available: u64,
    },

    /// A chunk was read completely but its codec rejected it.
    #[error("decode error: {0}")]
    Codec(#[from] CodecError),

    /// The sink or source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A specialized Result type for cache persistence.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::TruncatedLength { got: 3 };
        assert_eq!(
            format!("{}", err),
            "truncated length prefix: 3 of 8 bytes available"
        );

        let err = CacheError::TruncatedChunk {
            expected: 100,
            available: 7,
        };
        assert_eq!(
            format!("{}", err),
            "truncated chunk: length prefix claims 100 bytes, 7 available"
        );

        let err = CodecError::Width {
            type_name: "u32",
            expected: 4,
            actual: 3,
        };
        assert_eq!(format!("{}", err), "u32 chunk must be 4 bytes, got 3");
    }

    #[test]
    fn test_codec_error_conversion() {
        let codec_err = CodecError::Custom("bad user record".to_string());
        let cache_err: CacheError = codec_err.into();
        assert!(matches!(cache_err, CacheError::Codec(CodecError::Custom(_))));
        assert_eq!(format!("{}", cache_err), "decode error: bad user record");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "sink closed");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
    }
}
