//! Connection endpoint with reconnection and response correlation.
//!
//! An [`Endpoint`] owns zero-or-one live socket to a fixed `host:port` and
//! provides three call shapes on top of it: one-way send, two-way
//! call-and-await, and inbound-request dispatch.
//!
//! # Connection Lifecycle
//!
//! ```text
//! ┌────────────┐   connect ok   ┌───────────┐
//! │ Connecting ├───────────────►│ Connected │
//! │            │◄───────────────┤           │
//! └─────┬──────┘   read error   └─────┬─────┘
//!       │                             │
//!       │ backoff 50ms..5s            │ close()
//!       ▼                             ▼
//! ┌────────────┐                ┌───────────┐
//! │ Disconnect │                │  Closed   │
//! │     ed     │                │ (terminal)│
//! └────────────┘                └───────────┘
//! ```
//!
//! `Closed` is reached only by an explicit [`Endpoint::close`]; every other
//! transition is driven by socket events or backoff timers. Exactly one
//! background read-loop task is alive per endpoint until it closes.
//!
//! # Failure Containment
//!
//! Connectivity failures are retried inside the endpoint and surfaced only
//! through the [`EndpointCallbacks`]; call sites observe them as an
//! immediate [`RpcError::Disconnected`] instead of queued or blocked sends.
//! A disconnect releases every in-flight two-way call with
//! [`RpcError::ConnectionClosed`] so callers never stall on a dead
//! connection.

/// Configuration structures for endpoint behavior.
pub mod config;

/// Core endpoint implementation with automatic reconnection.
pub mod core;

/// Error types for endpoint operations.
pub mod error;

pub use config::EndpointConfig;
pub use core::{Endpoint, EndpointCallbacks};
pub use error::RpcError;
