//! Project manager service stubs.
//!
//! The project manager owns projects and their configuration and reports
//! the health of the whole installation.

use meridian_rpc::{Endpoint, RpcError, ServiceId};

use crate::health::{GetHealthStatusRequest, GetHealthStatusResponse};

/// Client of a remote ProjectManagerService.
#[derive(Debug, Clone)]
pub struct ProjectManagerServiceClient {
    endpoint: Endpoint,
}

impl ProjectManagerServiceClient {
    /// Service identifier of the ProjectManagerService.
    pub const SERVICE_ID: ServiceId = 3;

    /// Full name of the ProjectManagerService.
    pub const FULL_NAME: &'static str = "meridian.ProjectManagerService";

    /// Create a client which communicates with the remote service via
    /// `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// The endpoint this client communicates with.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the health of the license, sensors and service nodes.
    ///
    /// # Errors
    ///
    /// Returns the transport-level [`RpcError`] of the underlying call.
    pub async fn get_health_status(
        &self,
        request: &GetHealthStatusRequest,
    ) -> Result<GetHealthStatusResponse, RpcError> {
        self.endpoint
            .send_two_way(Self::SERVICE_ID, 38, request)
            .await
    }
}
