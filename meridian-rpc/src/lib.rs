//! # meridian-rpc
//!
//! Client-side RPC transport for the Meridian sensor-processing platform.
//!
//! Every Meridian service exposes request/response ("two-way") and
//! fire-and-forget ("one-way") methods over a single full-duplex byte
//! stream, and some services push broadcast events to subscribers. This
//! crate provides the transport and subscription layer shared by all of
//! the generated service stubs:
//!
//! - **Envelope**: the wire-level container multiplexed over the connection
//! - **Endpoint**: one logical connection with automatic reconnection,
//!   request-ID based response correlation, and inbound request dispatch
//! - **ServiceHandler**: per-service dispatch of inbound requests
//! - **SubscriptionGroup**: reference-counted subscribe/unsubscribe that
//!   collapses N local subscribers into one remote subscription and
//!   re-subscribes after reconnection
//! - **CallbackSet**: concurrent fan-out of inbound broadcasts to local
//!   callbacks

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Pluggable payload serialization.
pub mod codec;

/// Wire-level envelope encoding and framing limits.
pub mod envelope;

/// Connection endpoint with reconnection and response correlation.
pub mod endpoint;

/// Concurrent broadcast fan-out to registered callbacks.
pub mod fanout;

/// Per-service dispatch of inbound requests.
pub mod handler;

/// Bounded pool of request identifiers.
pub mod pool;

/// Reference-counted subscriptions over subscribe/unsubscribe method pairs.
pub mod subscription;

// =============================================================================
// Public API Re-exports
// =============================================================================

// Codec exports
pub use codec::{CodecError, JsonCodec, MessageCodec};

// Envelope exports
pub use envelope::{
    Envelope, EnvelopeError, MethodId, RequestId, ServiceId, MAX_FRAME_SIZE, PROTOCOL_VERSION,
};

// Endpoint exports
pub use endpoint::{Endpoint, EndpointCallbacks, EndpointConfig, RpcError};

// Fan-out exports
pub use fanout::{CallbackSet, CallbackToken};

// Handler exports
pub use handler::{HandlerError, ServiceHandler};

// Subscription exports
pub use subscription::{Subscribable, Subscription, SubscriptionGroup};
