//! Centralized serialization and deserialization functions.
//!
//! This module provides a unified interface for encoding and decoding
//! persisted records using postcard serialization, with consistent error
//! handling via snafu. Key byte layouts are hand-built elsewhere and never
//! pass through here.

use serde::{de::DeserializeOwned, Serialize};
use snafu::Snafu;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Decoding failed.
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },
}

/// Encodes a value to bytes using postcard serialization.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(value).map_err(|source| CodecError::Encode { source })
}

/// Decodes bytes to a value using postcard deserialization.
///
/// # Errors
///
/// Returns `CodecError::Decode` if deserialization fails.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    postcard::from_bytes(bytes).map_err(|source| CodecError::Decode { source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::range::RangeState;

    #[test]
    fn test_roundtrip_state() {
        for state in [RangeState::Active, RangeState::Inactive] {
            let bytes = encode(&state).expect("encode state");
            let decoded: RangeState = decode(&bytes).expect("decode state");
            assert_eq!(decoded, state);
        }
    }

    #[test]
    fn test_decode_garbage_errors() {
        let result: Result<RangeState, _> = decode(&[0xFF, 0xFF, 0xFF]);
        assert!(result.is_err());
    }
}
