//! Pluggable payload serialization.
//!
//! The envelope protocol treats request and response payloads as opaque
//! bytes; a [`MessageCodec`] turns typed messages into those bytes and
//! back. The platform services speak JSON, provided by [`JsonCodec`], but
//! the trait leaves room for other formats without touching the transport.
//!
//! # Example
//!
//! ```rust
//! use meridian_rpc::{JsonCodec, MessageCodec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct GetVersionResponse {
//!     major: u32,
//!     patch: u32,
//! }
//!
//! let codec = JsonCodec;
//! let response = GetVersionResponse { major: 2, patch: 31 };
//!
//! let bytes = codec.encode(&response).expect("encode");
//! let decoded: GetVersionResponse = codec.decode(&bytes).expect("decode");
//! assert_eq!(decoded, response);
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to encode a message to bytes.
    #[error("failed to encode message: {0}")]
    Encode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failed to decode bytes to a message.
    #[error("failed to decode message: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Pluggable payload serialization format.
///
/// Message types must implement serde's `Serialize` and `DeserializeOwned`;
/// the codec decides the byte representation.
pub trait MessageCodec: Clone + Send + Sync + 'static {
    /// Encode a serializable message to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes to a deserializable message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if deserialization fails.
    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec using serde_json.
///
/// This is the payload format spoken by the Meridian services.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(msg).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}
