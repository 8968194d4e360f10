//! Wire-level envelope encoding.
//!
//! Every message multiplexed over a connection is one envelope:
//!
//! `[version:1][flags:1][service_id:4][method_id:4][request_id:4][error_len:4][error:N][payload:M]`
//!
//! - **version**: protocol version tag; exactly one value is defined today
//!   and decoding rejects everything else
//! - **flags**: bit 0 marks a cancellation notice
//! - **service_id**: destination/source service for requests; zero on
//!   responses
//! - **method_id**: method within the service; **zero marks the envelope as
//!   a response** to a prior request
//! - **request_id**: correlates a response with the call that produced it;
//!   zero means no response is expected
//! - **error**: non-empty only on a response whose remote handler failed;
//!   the payload is then meaningless
//! - **payload**: opaque message bytes, decoded by the
//!   [`MessageCodec`](crate::MessageCodec) once service and method are known
//!
//! All integers are little-endian. On the stream each envelope is preceded
//! by a `u32` length prefix; inbound frames above [`MAX_FRAME_SIZE`] are a
//! protocol violation that closes the connection.

use bytes::{Buf, BufMut, BytesMut};

/// Unique identifier of a service.
pub type ServiceId = u32;

/// Unique identifier of a method within a service.
pub type MethodId = u32;

/// Identifier correlating a two-way request with its response.
pub type RequestId = u32;

/// The only protocol version understood by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed envelope header size in bytes.
pub const ENVELOPE_HEADER_SIZE: usize = 18;

/// Maximum size of one inbound frame (10 MiB).
///
/// Larger frames are a protocol violation and tear down the connection.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Flag bit marking a cancellation notice.
const FLAG_CANCEL: u8 = 0b0000_0001;

/// Envelope decoding error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvelopeError {
    /// Not enough bytes to hold an envelope.
    #[error("envelope truncated: need {needed} bytes, have {have}")]
    Truncated {
        /// Minimum bytes required to parse.
        needed: usize,
        /// Actual bytes available.
        have: usize,
    },

    /// The version tag is not [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {version}")]
    UnsupportedVersion {
        /// The version tag found on the wire.
        version: u8,
    },

    /// The error text is not valid UTF-8.
    #[error("envelope error text is not valid UTF-8")]
    InvalidErrorText,

    /// An inbound frame exceeded [`MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {MAX_FRAME_SIZE})")]
    FrameTooLarge {
        /// Declared frame size in bytes.
        size: usize,
    },
}

/// One request, response, or cancellation notice on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Destination/source service. Zero on responses.
    pub service_id: ServiceId,
    /// Method within the service. Zero marks a response.
    pub method_id: MethodId,
    /// Correlation identifier; zero when no response is expected.
    pub request_id: RequestId,
    /// Failure text of the remote handler; empty on success.
    pub error: String,
    /// Whether this envelope is a cancellation notice.
    pub cancel: bool,
    /// Opaque payload bytes.
    pub message_bytes: Vec<u8>,
}

impl Envelope {
    /// Create a request envelope.
    ///
    /// `request_id` is zero for one-way requests.
    ///
    /// # Panics
    ///
    /// Panics if `service_id` or `method_id` is zero; both would corrupt the
    /// request/response distinction on the wire and indicate API misuse.
    pub fn request(
        service_id: ServiceId,
        method_id: MethodId,
        request_id: RequestId,
        message_bytes: Vec<u8>,
    ) -> Self {
        assert!(service_id != 0, "service id must not be zero");
        assert!(method_id != 0, "method id must not be zero");
        Self {
            service_id,
            method_id,
            request_id,
            error: String::new(),
            cancel: false,
            message_bytes,
        }
    }

    /// Create a successful response envelope for `request_id`.
    pub fn response(request_id: RequestId, message_bytes: Vec<u8>) -> Self {
        Self {
            service_id: 0,
            method_id: 0,
            request_id,
            error: String::new(),
            cancel: false,
            message_bytes,
        }
    }

    /// Create a response envelope signalling that the handler failed.
    pub fn error_response(request_id: RequestId, error: String) -> Self {
        Self {
            service_id: 0,
            method_id: 0,
            request_id,
            error,
            cancel: false,
            message_bytes: Vec::new(),
        }
    }

    /// Whether this envelope is a response to a prior request.
    pub fn is_response(&self) -> bool {
        self.method_id == 0
    }

    /// Encode the envelope to its wire representation (without the frame
    /// length prefix).
    pub fn encode(&self) -> Vec<u8> {
        let error_bytes = self.error.as_bytes();
        let mut buf =
            BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + error_bytes.len() + self.message_bytes.len());

        let mut flags = 0u8;
        if self.cancel {
            flags |= FLAG_CANCEL;
        }

        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(flags);
        buf.put_u32_le(self.service_id);
        buf.put_u32_le(self.method_id);
        buf.put_u32_le(self.request_id);
        buf.put_u32_le(error_bytes.len() as u32);
        buf.put_slice(error_bytes);
        buf.put_slice(&self.message_bytes);

        buf.to_vec()
    }

    /// Decode an envelope from its wire representation.
    ///
    /// Unknown flag bits are ignored so that decoders stay compatible with
    /// envelopes carrying new informational flags.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::Truncated`]: fewer bytes than the header and error
    ///   text require
    /// - [`EnvelopeError::UnsupportedVersion`]: version tag is unknown
    /// - [`EnvelopeError::InvalidErrorText`]: error text is not UTF-8
    pub fn decode(data: &[u8]) -> Result<Self, EnvelopeError> {
        if data.len() < ENVELOPE_HEADER_SIZE {
            return Err(EnvelopeError::Truncated {
                needed: ENVELOPE_HEADER_SIZE,
                have: data.len(),
            });
        }

        let mut buf = data;
        let version = buf.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(EnvelopeError::UnsupportedVersion { version });
        }

        let flags = buf.get_u8();
        let service_id = buf.get_u32_le();
        let method_id = buf.get_u32_le();
        let request_id = buf.get_u32_le();
        let error_len = buf.get_u32_le() as usize;

        if buf.remaining() < error_len {
            return Err(EnvelopeError::Truncated {
                needed: ENVELOPE_HEADER_SIZE + error_len,
                have: data.len(),
            });
        }

        let error = std::str::from_utf8(&buf[..error_len])
            .map_err(|_| EnvelopeError::InvalidErrorText)?
            .to_string();
        buf.advance(error_len);

        Ok(Self {
            service_id,
            method_id,
            request_id,
            error,
            cancel: flags & FLAG_CANCEL != 0,
            message_bytes: buf.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let envelope = Envelope::request(7, 2, 1, b"payload".to_vec());

        let encoded = envelope.encode();
        let decoded = Envelope::decode(&encoded).expect("decode");

        assert_eq!(decoded, envelope);
        assert!(!decoded.is_response());
    }

    #[test]
    fn test_one_way_request_has_zero_request_id() {
        let envelope = Envelope::request(2, 1, 0, b"log".to_vec());

        let decoded = Envelope::decode(&envelope.encode()).expect("decode");
        assert_eq!(decoded.request_id, 0);
    }

    #[test]
    fn test_response_roundtrip() {
        let envelope = Envelope::response(5, b"{}".to_vec());

        let decoded = Envelope::decode(&envelope.encode()).expect("decode");
        assert!(decoded.is_response());
        assert_eq!(decoded.request_id, 5);
        assert_eq!(decoded.service_id, 0);
        assert!(decoded.error.is_empty());
    }

    #[test]
    fn test_error_response_roundtrip() {
        let envelope = Envelope::error_response(3, "handler failed: no such project".to_string());

        let decoded = Envelope::decode(&envelope.encode()).expect("decode");
        assert!(decoded.is_response());
        assert_eq!(decoded.error, "handler failed: no such project");
        assert!(decoded.message_bytes.is_empty());
    }

    #[test]
    fn test_cancel_flag_roundtrip() {
        let mut envelope = Envelope::request(7, 2, 4, Vec::new());
        envelope.cancel = true;

        let decoded = Envelope::decode(&envelope.encode()).expect("decode");
        assert!(decoded.cancel);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut encoded = Envelope::request(1, 1, 0, Vec::new()).encode();
        encoded[0] = 2;

        let result = Envelope::decode(&encoded);
        assert!(matches!(
            result,
            Err(EnvelopeError::UnsupportedVersion { version: 2 })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let result = Envelope::decode(&[PROTOCOL_VERSION, 0, 0]);
        assert!(matches!(
            result,
            Err(EnvelopeError::Truncated {
                needed: ENVELOPE_HEADER_SIZE,
                have: 3
            })
        ));
    }

    #[test]
    fn test_truncated_error_text() {
        let envelope = Envelope::error_response(1, "some failure".to_string());
        let encoded = envelope.encode();

        // Cut into the error text.
        let result = Envelope::decode(&encoded[..ENVELOPE_HEADER_SIZE + 4]);
        assert!(matches!(result, Err(EnvelopeError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_error_text() {
        let envelope = Envelope::error_response(1, "abcd".to_string());
        let mut encoded = envelope.encode();
        encoded[ENVELOPE_HEADER_SIZE] = 0xFF;
        encoded[ENVELOPE_HEADER_SIZE + 1] = 0xFE;

        let result = Envelope::decode(&encoded);
        assert!(matches!(result, Err(EnvelopeError::InvalidErrorText)));
    }

    #[test]
    fn test_unknown_flag_bits_ignored() {
        let envelope = Envelope::request(7, 2, 1, b"x".to_vec());
        let mut encoded = envelope.encode();
        encoded[1] |= 0b1000_0000;

        let decoded = Envelope::decode(&encoded).expect("decode");
        assert!(!decoded.cancel);
        assert_eq!(decoded.message_bytes, b"x".to_vec());
    }

    #[test]
    fn test_empty_payload() {
        let envelope = Envelope::request(15, 1, 2, Vec::new());
        let encoded = envelope.encode();

        assert_eq!(encoded.len(), ENVELOPE_HEADER_SIZE);

        let decoded = Envelope::decode(&encoded).expect("decode");
        assert!(decoded.message_bytes.is_empty());
    }

    #[test]
    #[should_panic(expected = "method id must not be zero")]
    fn test_request_rejects_zero_method_id() {
        let _ = Envelope::request(7, 0, 1, Vec::new());
    }

    #[test]
    #[should_panic(expected = "service id must not be zero")]
    fn test_request_rejects_zero_service_id() {
        let _ = Envelope::request(0, 1, 1, Vec::new());
    }
}
