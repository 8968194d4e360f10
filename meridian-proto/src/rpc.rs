//! Common request/response pairs shared by every subscribable service.
//!
//! Every subscribable Meridian service exposes a parameterless Subscribe
//! and Unsubscribe two-way method sharing these shapes. Responses carry an
//! optional error instead of failing the transport-level call; use
//! [`check_response`] to turn a response-borne error into an
//! [`RpcError::Remote`](meridian_rpc::RpcError::Remote).

use serde::{Deserialize, Serialize};

use meridian_rpc::RpcError;

use crate::logs::LogData;

/// Request of the default Subscribe method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultSubscribeRequest {}

/// Response of the default Subscribe method.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultSubscribeResponse {
    /// Why the subscription was rejected, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LogData>,
}

/// Request of the default Unsubscribe method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultUnsubscribeRequest {}

/// Response of the default Unsubscribe method.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultUnsubscribeResponse {
    /// Why the unsubscription was rejected, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LogData>,
}

/// A response message which carries an optional error.
pub trait ResponseWithError {
    /// Name of the response message, used in error text.
    const NAME: &'static str;

    /// The error carried by the response, if any.
    fn response_error(&self) -> Option<&LogData>;
}

impl ResponseWithError for DefaultSubscribeResponse {
    const NAME: &'static str = "DefaultSubscribeResponse";

    fn response_error(&self) -> Option<&LogData> {
        self.error.as_ref()
    }
}

impl ResponseWithError for DefaultUnsubscribeResponse {
    const NAME: &'static str = "DefaultUnsubscribeResponse";

    fn response_error(&self) -> Option<&LogData> {
        self.error.as_ref()
    }
}

/// Convert a response-borne error into an [`RpcError`].
///
/// # Errors
///
/// Returns [`RpcError::Remote`] carrying the formatted error when the
/// response contains one.
pub fn check_response<R: ResponseWithError>(response: R) -> Result<R, RpcError> {
    match response.response_error() {
        Some(error) => Err(RpcError::Remote(format!(
            "{} yielded an error: {}",
            R::NAME,
            error
        ))),
        None => Ok(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_response_passes_success_through() {
        let response = DefaultSubscribeResponse { error: None };
        assert!(check_response(response).is_ok());
    }

    #[test]
    fn test_check_response_formats_error() {
        let response = DefaultSubscribeResponse {
            error: Some(LogData::LicensePrivilegeError {
                missing_privilege: "Subscribe".to_string(),
                level_error: "license level 2".to_string(),
            }),
        };

        let error = check_response(response).expect_err("response carries an error");
        let text = error.to_string();
        assert!(text.contains("DefaultSubscribeResponse yielded an error"));
        assert!(text.contains("Subscribe"));
    }

    #[test]
    fn test_empty_response_wire_shape() {
        let json = serde_json::to_string(&DefaultSubscribeResponse::default()).expect("serialize");
        assert_eq!(json, "{}");

        let decoded: DefaultSubscribeResponse = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(decoded, DefaultSubscribeResponse::default());
    }
}
