//! Client core for the Telegram Forwarder: session persistence, the
//! connect/verify/subscribe flow with its screen guards, the chat directory,
//! and forwarding rule management on top of `forwarder-gateway`.

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod flow;
pub mod input;
pub mod rules;
pub mod screens;
pub mod session;

#[cfg(test)]
mod testing;

pub use client::ForwarderClient;
pub use config::{
    ClientConfig, ConfigError, ENV_BACKEND_BASE_URL, ENV_BACKEND_TIMEOUT_MS, ENV_STATE_PATH,
};
pub use directory::{
    ChatDirectory, ChatDirectoryCache, ChatDirectoryEntry, collation_key, compare_names,
    resolve_label,
};
pub use error::{ClientError, ErrorKind, ValidationError};
pub use flow::{
    CodeVerification, FlowController, FlowError, FlowEvent, FlowState, GuardDecision,
    PhoneSubmission, Screen, ScreenRequirements, evaluate_guard,
};
pub use input::{mask_phone, normalize_phone, normalize_verification_code};
pub use rules::{ForwardingRule, RuleManager, validate_candidate};
pub use screens::{
    ActiveLinksScreen, CHAT_LINKED_MESSAGE, ChatLinkerScreen, ConnectScreen, LinkRow, Mount,
    VerifyCodeScreen,
};
pub use session::{
    FileSessionStore, MemorySessionStore, PersistedSession, Session, SessionStore,
    SessionStoreError, default_session_path, update_session,
};

pub use forwarder_gateway as gateway;
