//! Error types for endpoint operations.

use crate::codec::CodecError;
use crate::envelope::EnvelopeError;

/// Errors surfaced by endpoint call sites and lifecycle callbacks.
///
/// Connectivity failures never reach call sites directly: the endpoint
/// retries them in the background and sends fail fast with
/// [`RpcError::Disconnected`] in the meantime.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The endpoint has no live transport; the request was not sent and
    /// will not be queued.
    #[error("cannot send request to disconnected endpoint: {details}")]
    Disconnected {
        /// Description of the error that caused the disconnection.
        details: String,
    },

    /// The connection dropped (or the endpoint closed) while the call was
    /// waiting for its response.
    #[error("connection closed")]
    ConnectionClosed,

    /// The remote handler failed; carries its failure text verbatim.
    #[error("remote error: {0}")]
    Remote(String),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A wire-level protocol violation.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Transport-level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
