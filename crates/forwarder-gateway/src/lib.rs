//! HTTP gateway for the Telegram Forwarder backend.
//!
//! Every endpoint is one typed function. Transport failures, backend
//! rejections and undecodable payloads are folded into [`GatewayError`] here so
//! nothing untyped leaves this crate.

mod client;
mod error;
mod types;

pub use client::{
    BackendGateway, BackendGatewayConfig, BackendStatus, DEFAULT_BACKEND_BASE_URL,
    DEFAULT_TIMEOUT_MS, HttpBackendGateway, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, normalize_base_url,
    probe_backend,
};
pub use error::{
    Endpoint, GatewayError, GatewayErrorKind, NETWORK_UNREACHABLE_MESSAGE, rejection_from_body,
};
pub use types::{
    AccountProfile, ChatId, ChatSummary, DeleteLinkRequest, DeleteOutcome, LinkRecord,
    PhoneRequest, STATUS_ALREADY_AUTHORIZED, SendCodeOutcome, SendCodeRequest, SetLinkRequest,
    StatusResponse, VerifyCodeRequest, VerifyCodeResponse,
};

pub use reqwest::StatusCode;
