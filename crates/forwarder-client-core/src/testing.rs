use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use forwarder_gateway::{
    AccountProfile, BackendGateway, ChatId, ChatSummary, DeleteLinkRequest, DeleteOutcome,
    Endpoint, GatewayError, LinkRecord, PhoneRequest, SendCodeOutcome, SendCodeRequest,
    SetLinkRequest, StatusCode, VerifyCodeRequest, VerifyCodeResponse,
};

pub(crate) const VALID_CODE: &str = "12345";

/// Scripted backend that behaves like the real one: links form a set and a
/// delete of an absent pair reports `AlreadyAbsent`.
#[derive(Default)]
pub(crate) struct FakeGateway {
    chats: Mutex<Vec<ChatSummary>>,
    links: Mutex<Vec<LinkRecord>>,
    profile: Mutex<Option<AccountProfile>>,
    failures: Mutex<HashMap<Endpoint, GatewayError>>,
    delays: Mutex<HashMap<Endpoint, Duration>>,
    calls: Mutex<Vec<Endpoint>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_chats(self, chats: Vec<ChatSummary>) -> Self {
        *self.chats.lock().unwrap_or_else(PoisonError::into_inner) = chats;
        self
    }

    pub(crate) fn with_links(self, links: &[(&str, &str)]) -> Self {
        *self.links.lock().unwrap_or_else(PoisonError::into_inner) = links
            .iter()
            .map(|(source, destination)| link(source, destination))
            .collect();
        self
    }

    pub(crate) fn with_profile(self, profile: AccountProfile) -> Self {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = Some(profile);
        self
    }

    /// The next call to `endpoint` fails with `error`.
    pub(crate) fn fail_next(&self, endpoint: Endpoint, error: GatewayError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint, error);
    }

    pub(crate) fn delay(&self, endpoint: Endpoint, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint, delay);
    }

    pub(crate) fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|called| **called == endpoint)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn backend_links(&self) -> Vec<(String, String)> {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|link| {
                (
                    link.source_id.as_str().to_string(),
                    link.destination_id.as_str().to_string(),
                )
            })
            .collect()
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(endpoint);
        let delay = self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&endpoint)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub(crate) fn link(source: &str, destination: &str) -> LinkRecord {
    LinkRecord {
        source_id: ChatId::from(source),
        destination_id: ChatId::from(destination),
        source_name: Some(format!("chat {source}")),
        destination_name: Some(format!("chat {destination}")),
    }
}

pub(crate) fn rejected(endpoint: Endpoint, status: StatusCode, message: &str) -> GatewayError {
    GatewayError::BackendRejected {
        endpoint,
        status,
        message: message.to_string(),
    }
}

pub(crate) fn unreachable(endpoint: Endpoint) -> GatewayError {
    GatewayError::NetworkUnreachable {
        endpoint,
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl BackendGateway for FakeGateway {
    async fn ping(&self) -> Result<(), GatewayError> {
        self.enter(Endpoint::Ping).await
    }

    async fn send_code(&self, _request: &SendCodeRequest) -> Result<SendCodeOutcome, GatewayError> {
        self.enter(Endpoint::SendCode).await?;
        Ok(SendCodeOutcome::CodeSent)
    }

    async fn verify_code(
        &self,
        request: &VerifyCodeRequest,
    ) -> Result<VerifyCodeResponse, GatewayError> {
        self.enter(Endpoint::VerifyCode).await?;
        if request.code != VALID_CODE {
            return Err(rejected(
                Endpoint::VerifyCode,
                StatusCode::BAD_REQUEST,
                "Invalid code",
            ));
        }
        Ok(VerifyCodeResponse {
            status: Some("Login successful".to_string()),
            user: *self.profile.lock().unwrap_or_else(PoisonError::into_inner),
        })
    }

    async fn get_chats(&self, _request: &PhoneRequest) -> Result<Vec<ChatSummary>, GatewayError> {
        self.enter(Endpoint::GetChats).await?;
        Ok(self
            .chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn set_link(&self, request: &SetLinkRequest) -> Result<(), GatewayError> {
        self.enter(Endpoint::SetLink).await?;
        let mut links = self.links.lock().unwrap_or_else(PoisonError::into_inner);
        let exists = links.iter().any(|existing| {
            existing.source_id == request.source_id
                && existing.destination_id == request.destination_id
        });
        if !exists {
            links.push(link(
                request.source_id.as_str(),
                request.destination_id.as_str(),
            ));
        }
        Ok(())
    }

    async fn get_links(&self, _request: &PhoneRequest) -> Result<Vec<LinkRecord>, GatewayError> {
        self.enter(Endpoint::GetLinks).await?;
        Ok(self
            .links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn delete_link(
        &self,
        request: &DeleteLinkRequest,
    ) -> Result<DeleteOutcome, GatewayError> {
        self.enter(Endpoint::DeleteLink).await?;
        let mut links = self.links.lock().unwrap_or_else(PoisonError::into_inner);
        let before = links.len();
        links.retain(|existing| {
            !(existing.source_id == request.source_id
                && existing.destination_id == request.destination_id)
        });
        if links.len() == before {
            Ok(DeleteOutcome::AlreadyAbsent)
        } else {
            Ok(DeleteOutcome::Removed)
        }
    }
}
