use reqwest::StatusCode;
use thiserror::Error;

pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Network error - Please check if the backend server is running";

/// Remote operations exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Ping,
    SendCode,
    VerifyCode,
    GetChats,
    SetLink,
    GetLinks,
    DeleteLink,
}

impl Endpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Ping => "/ping",
            Self::SendCode => "/send-code",
            Self::VerifyCode => "/verify-code",
            Self::GetChats => "/get-chats",
            Self::SetLink => "/set-link",
            Self::GetLinks => "/get-links",
            Self::DeleteLink => "/delete-link",
        }
    }

    /// Message shown when the backend fails without supplying its own.
    #[must_use]
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Ping => "Backend server is not responding properly",
            Self::SendCode | Self::VerifyCode => "An unexpected error occurred.",
            Self::GetChats => "Unexpected error",
            Self::SetLink => "Failed to create link",
            Self::GetLinks => "Failed to fetch links",
            Self::DeleteLink => "Failed to delete link",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    NetworkUnreachable,
    BackendRejected,
    MalformedResponse,
}

impl GatewayErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NetworkUnreachable => "network_unreachable",
            Self::BackendRejected => "backend_rejected",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("backend base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("{} unreachable: {message}", .endpoint.path())]
    NetworkUnreachable { endpoint: Endpoint, message: String },
    #[error("{} rejected with {status}: {message}", .endpoint.path())]
    BackendRejected {
        endpoint: Endpoint,
        status: StatusCode,
        message: String,
    },
    #[error("{} returned an unexpected payload: {detail}", .endpoint.path())]
    MalformedResponse { endpoint: Endpoint, detail: String },
}

impl GatewayError {
    /// `InvalidBaseUrl` never reaches the network, so it reports as unreachable.
    #[must_use]
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::InvalidBaseUrl | Self::NetworkUnreachable { .. } => {
                GatewayErrorKind::NetworkUnreachable
            }
            Self::BackendRejected { .. } => GatewayErrorKind::BackendRejected,
            Self::MalformedResponse { .. } => GatewayErrorKind::MalformedResponse,
        }
    }

    /// Text to show next to the action that triggered the call.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidBaseUrl => self.to_string(),
            Self::NetworkUnreachable { .. } => NETWORK_UNREACHABLE_MESSAGE.to_string(),
            Self::BackendRejected { message, .. } => message.clone(),
            Self::MalformedResponse { endpoint, .. } => endpoint.fallback_message().to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::BackendRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Builds a rejection from a non-success response body, keeping the
/// backend's `error` text verbatim when it sent one.
pub fn rejection_from_body(endpoint: Endpoint, status: StatusCode, body: &[u8]) -> GatewayError {
    let message = backend_error_message(body)
        .unwrap_or_else(|| endpoint.fallback_message().to_string());
    GatewayError::BackendRejected {
        endpoint,
        status,
        message,
    }
}

pub(crate) fn backend_error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<crate::types::ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(non_empty_string)
}

/// Blank text counts as absent; anything else is kept byte for byte.
fn non_empty_string(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_keeps_backend_message_verbatim() {
        let error = rejection_from_body(
            Endpoint::VerifyCode,
            StatusCode::BAD_REQUEST,
            br#"{"error": "Invalid code"}"#,
        );
        assert_eq!(error.kind(), GatewayErrorKind::BackendRejected);
        assert_eq!(error.user_message(), "Invalid code");
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn rejection_does_not_trim_backend_message() {
        let error = rejection_from_body(
            Endpoint::SetLink,
            StatusCode::BAD_REQUEST,
            br#"{"error": "  Source chat not found\n"}"#,
        );
        assert_eq!(error.user_message(), "  Source chat not found\n");
    }

    #[test]
    fn rejection_falls_back_per_endpoint() {
        let empty = rejection_from_body(Endpoint::SetLink, StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert_eq!(empty.user_message(), "Failed to create link");

        let html = rejection_from_body(
            Endpoint::GetLinks,
            StatusCode::BAD_GATEWAY,
            b"<html>bad gateway</html>",
        );
        assert_eq!(html.user_message(), "Failed to fetch links");

        let blank = rejection_from_body(
            Endpoint::SendCode,
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"error": "  "}"#,
        );
        assert_eq!(blank.user_message(), "An unexpected error occurred.");
    }

    #[test]
    fn network_failures_use_the_backend_hint() {
        let error = GatewayError::NetworkUnreachable {
            endpoint: Endpoint::SendCode,
            message: "connection refused".to_string(),
        };
        assert_eq!(error.kind(), GatewayErrorKind::NetworkUnreachable);
        assert_eq!(error.user_message(), NETWORK_UNREACHABLE_MESSAGE);
        assert_eq!(
            error.to_string(),
            "/send-code unreachable: connection refused"
        );
    }

    #[test]
    fn malformed_payloads_surface_a_generic_message() {
        let error = GatewayError::MalformedResponse {
            endpoint: Endpoint::GetChats,
            detail: "expected array".to_string(),
        };
        assert_eq!(error.kind(), GatewayErrorKind::MalformedResponse);
        assert_eq!(error.user_message(), "Unexpected error");
    }
}
