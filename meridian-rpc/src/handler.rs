//! Per-service dispatch of inbound requests.
//!
//! An [`Endpoint`](crate::Endpoint) routes every inbound request to the
//! [`ServiceHandler`] registered for its service identifier. The handler
//! decodes the method-specific request, invokes the local implementation,
//! and returns either encoded response bytes, no response (for pure one-way
//! methods), or a failure that the endpoint reports back to the peer.

use async_trait::async_trait;

use crate::codec::CodecError;
use crate::envelope::{MethodId, ServiceId};

/// Error produced by a [`ServiceHandler`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The method identifier is not known to this service.
    ///
    /// This is a local error, not a protocol violation: the peer receives
    /// it as the failure text of its call.
    #[error("method not found: {0}")]
    MethodNotFound(MethodId),

    /// The request payload could not be decoded.
    #[error("failed to decode request: {0}")]
    Decode(#[from] CodecError),

    /// The local implementation failed; the text is sent to the peer
    /// verbatim.
    #[error("{0}")]
    Failed(String),
}

/// Handles requests sent to one service.
///
/// At most one handler may be registered per service identifier on a given
/// endpoint; registering replaces any prior handler and removal is
/// idempotent.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// The service identifier this handler answers for. Must not be zero.
    fn service_id(&self) -> ServiceId;

    /// Decode and process one request.
    ///
    /// Returns `Ok(Some(bytes))` with the encoded response, or `Ok(None)`
    /// when the method produces no response.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the method is unknown, the request
    /// cannot be decoded, or the implementation fails. If the request
    /// expected a response, the error text is sent back to the peer.
    async fn handle(
        &self,
        method_id: MethodId,
        message_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, HandlerError>;
}
