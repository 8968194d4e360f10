//! Status service stubs.
//!
//! The status service runs in every platform binary and returns status
//! information; it rides on an existing endpoint instead of a dedicated
//! connection.

use meridian_rpc::{Endpoint, RpcError, ServiceId};

use crate::status::{GetVersionRequest, GetVersionResponse};

/// Client of a remote StatusService.
#[derive(Debug, Clone)]
pub struct StatusServiceClient {
    endpoint: Endpoint,
}

impl StatusServiceClient {
    /// Service identifier of the StatusService.
    pub const SERVICE_ID: ServiceId = 15;

    /// Full name of the StatusService.
    pub const FULL_NAME: &'static str = "meridian.StatusService";

    /// Create a client which communicates with the remote service via
    /// `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// The endpoint this client communicates with.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the platform version of the answering node.
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn get_version(
        &self,
        request: &GetVersionRequest,
    ) -> Result<GetVersionResponse, RpcError> {
        self.endpoint
            .send_two_way(Self::SERVICE_ID, 1, request)
            .await
    }
}
