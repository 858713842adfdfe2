//! Request and response records for the forwarder backend endpoints.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque chat identifier.
///
/// The backend lists chats with integer ids but echoes link endpoints back as
/// strings, so both decode into the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChatId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<i64> for ChatId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChatIdVisitor;

        impl Visitor<'_> for ChatIdVisitor {
            type Value = ChatId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a chat id as a string or integer")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ChatId, E> {
                Ok(ChatId::new(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ChatId, E> {
                Ok(ChatId(value.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ChatId, E> {
                Ok(ChatId(value.to_string()))
            }
        }

        deserializer.deserialize_any(ChatIdVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendCodeRequest {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneRequest {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetLinkRequest {
    pub phone: String,
    pub source_id: ChatId,
    pub destination_id: ChatId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteLinkRequest {
    pub source_id: ChatId,
    pub destination_id: ChatId,
}

/// Generic `{status}` acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
}

pub const STATUS_ALREADY_AUTHORIZED: &str = "Already authorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendCodeOutcome {
    CodeSent,
    AlreadyAuthorized,
}

impl SendCodeOutcome {
    #[must_use]
    pub fn from_status(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            Some(STATUS_ALREADY_AUTHORIZED) => Self::AlreadyAuthorized,
            _ => Self::CodeSent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    #[serde(default)]
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VerifyCodeResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user: Option<AccountProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkRecord {
    pub source_id: ChatId,
    pub destination_id: ChatId,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub destination_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    AlreadyAbsent,
}

/// Body shape the backend uses to signal a failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
