//! Session flow: where the account is in the connect/verify/subscribe
//! sequence, and which screens it may enter.
//!
//! The state is derived from the session store on demand. Guards are checked
//! synchronously from stored state so a redirect never costs a request.

use std::sync::Arc;

use forwarder_gateway::{
    AccountProfile, BackendGateway, BackendStatus, SendCodeOutcome, SendCodeRequest,
    VerifyCodeRequest, probe_backend,
};
use thiserror::Error;

use crate::error::{ClientError, ValidationError};
use crate::input::{mask_phone, normalize_phone, normalize_verification_code};
use crate::session::{PersistedSession, Session, SessionStore, update_session};

const LOG_TARGET: &str = "forwarder.flow";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    NoPhone,
    PhoneSubmitted,
    CodeVerified,
    Subscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    CodeSent,
    CodeVerified,
    SubscriptionConfirmed,
    SubscriptionRevoked,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("cannot apply {} while {}", .event.as_str(), .from.as_str())]
    InvalidTransition { from: FlowState, event: FlowEvent },
}

impl FlowState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPhone => "no_phone",
            Self::PhoneSubmitted => "phone_submitted",
            Self::CodeVerified => "code_verified",
            Self::Subscribed => "subscribed",
        }
    }

    /// Subscription only counts once the code has been verified in this
    /// process.
    #[must_use]
    pub fn derive(session: &PersistedSession, verified: bool) -> Self {
        match (session.phone(), verified, session.subscribed) {
            (None, _, _) => Self::NoPhone,
            (Some(_), false, _) => Self::PhoneSubmitted,
            (Some(_), true, false) => Self::CodeVerified,
            (Some(_), true, true) => Self::Subscribed,
        }
    }

    pub fn transition(self, event: FlowEvent) -> Result<Self, FlowError> {
        let next = match (self, event) {
            (_, FlowEvent::Disconnected) => Self::NoPhone,
            (Self::NoPhone | Self::PhoneSubmitted, FlowEvent::CodeSent) => Self::PhoneSubmitted,
            // Re-requesting a code keeps an earlier verification.
            (Self::CodeVerified | Self::Subscribed, FlowEvent::CodeSent) => self,
            (Self::PhoneSubmitted | Self::CodeVerified, FlowEvent::CodeVerified) => {
                Self::CodeVerified
            }
            (Self::Subscribed, FlowEvent::CodeVerified) => Self::Subscribed,
            (Self::CodeVerified | Self::Subscribed, FlowEvent::SubscriptionConfirmed) => {
                Self::Subscribed
            }
            (Self::CodeVerified | Self::Subscribed, FlowEvent::SubscriptionRevoked) => {
                Self::CodeVerified
            }
            (from, event) => return Err(FlowError::InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

impl FlowEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodeSent => "code_sent",
            Self::CodeVerified => "code_verified",
            Self::SubscriptionConfirmed => "subscription_confirmed",
            Self::SubscriptionRevoked => "subscription_revoked",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    Connect,
    VerifyCode,
    Subscribe,
    ChatLinker,
    ActiveLinks,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenRequirements {
    pub phone: bool,
    pub verified: bool,
    pub subscription: bool,
}

const OPEN: ScreenRequirements = ScreenRequirements {
    phone: false,
    verified: false,
    subscription: false,
};
const NEEDS_PHONE: ScreenRequirements = ScreenRequirements {
    phone: true,
    verified: false,
    subscription: false,
};
const NEEDS_VERIFIED: ScreenRequirements = ScreenRequirements {
    phone: true,
    verified: true,
    subscription: false,
};
const NEEDS_SUBSCRIPTION: ScreenRequirements = ScreenRequirements {
    phone: true,
    verified: true,
    subscription: true,
};

impl Screen {
    pub const ALL: [Self; 6] = [
        Self::Home,
        Self::Connect,
        Self::VerifyCode,
        Self::Subscribe,
        Self::ChatLinker,
        Self::ActiveLinks,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Connect => "connect",
            Self::VerifyCode => "verify_code",
            Self::Subscribe => "subscribe",
            Self::ChatLinker => "chat_linker",
            Self::ActiveLinks => "active_links",
        }
    }

    #[must_use]
    pub fn requirements(self) -> ScreenRequirements {
        match self {
            Self::Home | Self::Connect | Self::Subscribe => OPEN,
            Self::VerifyCode => NEEDS_PHONE,
            Self::ActiveLinks => NEEDS_VERIFIED,
            Self::ChatLinker => NEEDS_SUBSCRIPTION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Screen),
}

/// Missing phone wins over a missing verification, which wins over a
/// missing subscription.
#[must_use]
pub fn evaluate_guard(screen: Screen, session: &Session) -> GuardDecision {
    let requirements = screen.requirements();
    let has_phone = session
        .phone
        .as_deref()
        .is_some_and(|phone| !phone.trim().is_empty());
    if requirements.phone && !has_phone {
        return GuardDecision::Redirect(Screen::Connect);
    }
    if requirements.verified && !session.verified {
        return GuardDecision::Redirect(Screen::VerifyCode);
    }
    if requirements.subscription && !session.subscribed {
        return GuardDecision::Redirect(Screen::Subscribe);
    }
    GuardDecision::Proceed
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneSubmission {
    pub phone: String,
    pub outcome: SendCodeOutcome,
    pub state: FlowState,
    pub next: Screen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeVerification {
    pub phone: String,
    pub state: FlowState,
    pub next: Screen,
}

pub struct FlowController<G, S> {
    gateway: Arc<G>,
    store: Arc<S>,
}

impl<G, S> Clone for FlowController<G, S> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
        }
    }
}

impl<G, S> FlowController<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
        Self { gateway, store }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn session(&self) -> Result<Session, ClientError> {
        let persisted = self.store.load_session()?;
        let verified = self.store.verified_marker();
        Ok(Session {
            phone: persisted.phone().map(str::to_string),
            verified,
            subscribed: persisted.subscribed,
        })
    }

    pub fn state(&self) -> Result<FlowState, ClientError> {
        let persisted = self.store.load_session()?;
        Ok(FlowState::derive(&persisted, self.store.verified_marker()))
    }

    /// Route guard for `screen`, evaluated from stored state only. Entering
    /// without a phone also drops any stale verified marker.
    pub fn enter(&self, screen: Screen) -> Result<GuardDecision, ClientError> {
        let session = self.session()?;
        if session.phone.is_none() && session.verified {
            self.store.set_verified_marker(false);
        }
        let decision = evaluate_guard(screen, &session);
        if let GuardDecision::Redirect(target) = decision {
            tracing::debug!(
                target: LOG_TARGET,
                screen = screen.as_str(),
                redirect = target.as_str(),
                "screen guard redirected",
            );
        }
        Ok(decision)
    }

    pub async fn probe_backend(&self) -> BackendStatus {
        probe_backend(self.gateway.as_ref()).await
    }

    /// Requests a login code. The phone is persisted only after the backend
    /// accepts it; a different phone than the stored one starts a fresh
    /// session.
    pub async fn submit_phone(&self, raw: &str) -> Result<PhoneSubmission, ClientError> {
        let phone = normalize_phone(raw)?;
        let outcome = self
            .gateway
            .send_code(&SendCodeRequest {
                phone: phone.clone(),
            })
            .await?;

        let current = self.store.load_session()?;
        let switching = current.phone().is_some_and(|stored| stored != phone);
        let from = if switching {
            self.store.set_verified_marker(false);
            FlowState::NoPhone
        } else {
            FlowState::derive(&current, self.store.verified_marker())
        };
        let state = from.transition(FlowEvent::CodeSent)?;

        update_session(self.store.as_ref(), |session| {
            if switching {
                *session = PersistedSession::default();
            }
            session.phone = Some(phone.clone());
        })?;

        tracing::info!(
            target: LOG_TARGET,
            phone = %mask_phone(&phone),
            already_authorized = outcome == SendCodeOutcome::AlreadyAuthorized,
            switched_account = switching,
            state = state.as_str(),
            "verification code requested",
        );
        Ok(PhoneSubmission {
            phone,
            outcome,
            state,
            next: Screen::VerifyCode,
        })
    }

    /// Verifies the code for the stored phone. A rejection leaves the stored
    /// phone and the current screen alone.
    pub async fn submit_code(&self, raw: &str) -> Result<CodeVerification, ClientError> {
        let persisted = self.store.load_session()?;
        let Some(phone) = persisted.phone().map(str::to_string) else {
            return Err(ValidationError::MissingPhone.into());
        };
        let code = normalize_verification_code(raw)?;

        let response = self
            .gateway
            .verify_code(&VerifyCodeRequest {
                phone: phone.clone(),
                code,
            })
            .await?;

        let mut state = FlowState::derive(&persisted, self.store.verified_marker())
            .transition(FlowEvent::CodeVerified)?;
        self.store.set_verified_marker(true);
        if let Some(profile) = response.user {
            state = self.record_profile(profile)?;
        }

        tracing::info!(
            target: LOG_TARGET,
            phone = %mask_phone(&phone),
            state = state.as_str(),
            "verification code accepted",
        );
        Ok(CodeVerification {
            phone,
            state,
            next: Screen::ActiveLinks,
        })
    }

    /// Stores the subscription flag reported by the backend for a verified
    /// account.
    pub fn record_profile(&self, profile: AccountProfile) -> Result<FlowState, ClientError> {
        let event = if profile.is_subscribed {
            FlowEvent::SubscriptionConfirmed
        } else {
            FlowEvent::SubscriptionRevoked
        };
        let state = self.state()?.transition(event)?;
        update_session(self.store.as_ref(), |session| {
            session.subscribed = profile.is_subscribed;
        })?;
        tracing::debug!(
            target: LOG_TARGET,
            subscribed = profile.is_subscribed,
            "subscription recorded",
        );
        Ok(state)
    }

    pub fn disconnect(&self) -> Result<FlowState, ClientError> {
        let state = self.state()?.transition(FlowEvent::Disconnected)?;
        self.store.clear_session()?;
        tracing::info!(target: LOG_TARGET, "session disconnected");
        Ok(state)
    }
}
