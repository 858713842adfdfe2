use forwarder_gateway::{GatewayError, GatewayErrorKind};
use thiserror::Error;

use crate::flow::FlowError;
use crate::session::SessionStoreError;

/// Problems caught locally, before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Phone number required")]
    EmptyPhone,
    #[error("Phone number must include digits after the country prefix")]
    InvalidPhone,
    #[error("Phone number not found. Please reconnect.")]
    MissingPhone,
    #[error("Verification code required")]
    EmptyVerificationCode,
    #[error("Please select both source and destination chats")]
    MissingChatSelection,
    #[error("Source and destination cannot be the same")]
    SelfLink,
    #[error("Backend server appears to be offline. Make sure it's running at {base_url}")]
    SubmitDisabled { base_url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NetworkUnreachable,
    BackendRejected,
    MalformedResponse,
    Storage,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl ClientError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Flow(_) => ErrorKind::Validation,
            Self::Gateway(error) => match error.kind() {
                GatewayErrorKind::NetworkUnreachable => ErrorKind::NetworkUnreachable,
                GatewayErrorKind::BackendRejected => ErrorKind::BackendRejected,
                GatewayErrorKind::MalformedResponse => ErrorKind::MalformedResponse,
            },
            Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// Inline text for the screen that triggered the action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(error) => error.user_message(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}
