use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{Endpoint, GatewayError, backend_error_message, rejection_from_body};
use crate::types::{
    ChatSummary, DeleteLinkRequest, DeleteOutcome, LinkRecord, PhoneRequest, SendCodeOutcome,
    SendCodeRequest, SetLinkRequest, StatusResponse, VerifyCodeRequest, VerifyCodeResponse,
};

pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MIN_TIMEOUT_MS: u64 = 250;
pub const MAX_TIMEOUT_MS: u64 = 120_000;

const LOG_TARGET: &str = "forwarder.gateway";

/// One function per backend operation. Every call is a single round trip.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn ping(&self) -> Result<(), GatewayError>;
    async fn send_code(&self, request: &SendCodeRequest) -> Result<SendCodeOutcome, GatewayError>;
    async fn verify_code(
        &self,
        request: &VerifyCodeRequest,
    ) -> Result<VerifyCodeResponse, GatewayError>;
    async fn get_chats(&self, request: &PhoneRequest) -> Result<Vec<ChatSummary>, GatewayError>;
    async fn set_link(&self, request: &SetLinkRequest) -> Result<(), GatewayError>;
    async fn get_links(&self, request: &PhoneRequest) -> Result<Vec<LinkRecord>, GatewayError>;
    async fn delete_link(&self, request: &DeleteLinkRequest)
    -> Result<DeleteOutcome, GatewayError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendStatus {
    #[default]
    Unknown,
    Online,
    Error,
    Offline,
}

impl BackendStatus {
    #[must_use]
    pub fn from_ping(result: &Result<(), GatewayError>) -> Self {
        match result {
            Ok(()) => Self::Online,
            Err(GatewayError::NetworkUnreachable { .. } | GatewayError::InvalidBaseUrl) => {
                Self::Offline
            }
            Err(_) => Self::Error,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Error => "error",
            Self::Offline => "offline",
        }
    }
}

/// Probes liveness and folds the outcome into a status flag.
pub async fn probe_backend<G>(gateway: &G) -> BackendStatus
where
    G: BackendGateway + ?Sized,
{
    let result = gateway.ping().await;
    let status = BackendStatus::from_ping(&result);
    if let Err(error) = result {
        tracing::warn!(
            target: LOG_TARGET,
            status = status.as_str(),
            error = %error,
            "backend liveness probe failed",
        );
    }
    status
}

#[derive(Debug, Clone)]
pub struct BackendGatewayConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl BackendGatewayConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for BackendGatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_BASE_URL)
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackendGateway {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpBackendGateway {
    pub fn new(config: BackendGatewayConfig) -> Result<Self, GatewayError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn get(&self, endpoint: Endpoint) -> Result<(StatusCode, Vec<u8>), GatewayError> {
        let request = self
            .http
            .get(self.endpoint_url(endpoint))
            .header(ACCEPT, "application/json");
        self.send(endpoint, request).await
    }

    async fn post<Req>(
        &self,
        endpoint: Endpoint,
        payload: &Req,
    ) -> Result<(StatusCode, Vec<u8>), GatewayError>
    where
        Req: Serialize + ?Sized,
    {
        let request = self
            .http
            .post(self.endpoint_url(endpoint))
            .header(ACCEPT, "application/json")
            .json(payload);
        self.send(endpoint, request).await
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, Vec<u8>), GatewayError> {
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        let response = request
            .header("x-request-id", request_id.as_str())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| {
                tracing::warn!(
                    target: LOG_TARGET,
                    endpoint = endpoint.path(),
                    request_id = %request_id,
                    timed_out = error.is_timeout(),
                    error = %error,
                    "backend request failed before a response arrived",
                );
                GatewayError::NetworkUnreachable {
                    endpoint,
                    message: error.to_string(),
                }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| GatewayError::NetworkUnreachable {
                endpoint,
                message: format!("failed to read response body: {error}"),
            })?;

        tracing::debug!(
            target: LOG_TARGET,
            endpoint = endpoint.path(),
            request_id = %request_id,
            status = status.as_u16(),
            bytes = bytes.len(),
            "backend responded",
        );
        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    async fn ping(&self) -> Result<(), GatewayError> {
        let (status, body) = self.get(Endpoint::Ping).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(rejection_from_body(Endpoint::Ping, status, &body))
        }
    }

    async fn send_code(&self, request: &SendCodeRequest) -> Result<SendCodeOutcome, GatewayError> {
        let (status, body) = self.post(Endpoint::SendCode, request).await?;
        let ack = decode_ack(Endpoint::SendCode, status, &body)?;
        Ok(SendCodeOutcome::from_status(ack.status.as_deref()))
    }

    async fn verify_code(
        &self,
        request: &VerifyCodeRequest,
    ) -> Result<VerifyCodeResponse, GatewayError> {
        let (status, body) = self.post(Endpoint::VerifyCode, request).await?;
        if !status.is_success() {
            return Err(rejection_from_body(Endpoint::VerifyCode, status, &body));
        }
        Ok(serde_json::from_slice::<VerifyCodeResponse>(&body).unwrap_or_default())
    }

    async fn get_chats(&self, request: &PhoneRequest) -> Result<Vec<ChatSummary>, GatewayError> {
        let (status, body) = self.post(Endpoint::GetChats, request).await?;
        decode_listing(Endpoint::GetChats, status, &body)
    }

    async fn set_link(&self, request: &SetLinkRequest) -> Result<(), GatewayError> {
        let (status, body) = self.post(Endpoint::SetLink, request).await?;
        decode_ack(Endpoint::SetLink, status, &body).map(|_| ())
    }

    async fn get_links(&self, request: &PhoneRequest) -> Result<Vec<LinkRecord>, GatewayError> {
        let (status, body) = self.post(Endpoint::GetLinks, request).await?;
        decode_listing(Endpoint::GetLinks, status, &body)
    }

    async fn delete_link(
        &self,
        request: &DeleteLinkRequest,
    ) -> Result<DeleteOutcome, GatewayError> {
        let (status, body) = self.post(Endpoint::DeleteLink, request).await?;
        if status == StatusCode::NOT_FOUND && backend_error_message(&body).is_some() {
            tracing::debug!(
                target: LOG_TARGET,
                source_id = %request.source_id,
                destination_id = %request.destination_id,
                "link already absent on backend",
            );
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        decode_ack(Endpoint::DeleteLink, status, &body).map(|_| DeleteOutcome::Removed)
    }
}

/// Mutating endpoints only signal success through the status code; the body
/// is informational.
fn decode_ack(
    endpoint: Endpoint,
    status: StatusCode,
    body: &[u8],
) -> Result<StatusResponse, GatewayError> {
    if !status.is_success() {
        return Err(rejection_from_body(endpoint, status, body));
    }
    Ok(serde_json::from_slice::<StatusResponse>(body).unwrap_or_default())
}

fn decode_listing<T>(
    endpoint: Endpoint,
    status: StatusCode,
    body: &[u8],
) -> Result<Vec<T>, GatewayError>
where
    T: DeserializeOwned,
{
    if !status.is_success() {
        return Err(rejection_from_body(endpoint, status, body));
    }
    match serde_json::from_slice::<Vec<T>>(body) {
        Ok(items) => Ok(items),
        Err(error) => {
            if let Some(message) = backend_error_message(body) {
                return Err(GatewayError::BackendRejected {
                    endpoint,
                    status,
                    message,
                });
            }
            tracing::warn!(
                target: LOG_TARGET,
                endpoint = endpoint.path(),
                error = %error,
                "backend listing did not decode",
            );
            Err(GatewayError::MalformedResponse {
                endpoint,
                detail: error.to_string(),
            })
        }
    }
}

/// Trims, drops trailing `/`, and requires an `http`/`https` scheme with a host.
pub fn normalize_base_url(raw: &str) -> Result<String, GatewayError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let Some((scheme, remainder)) = trimmed.split_once("://") else {
        return Err(GatewayError::InvalidBaseUrl);
    };
    if !matches!(scheme, "http" | "https") || remainder.is_empty() || remainder.starts_with('/') {
        return Err(GatewayError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}
