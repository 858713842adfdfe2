use std::sync::{Arc, Mutex, PoisonError};

use forwarder_gateway::{
    BackendGateway, ChatId, DeleteLinkRequest, DeleteOutcome, LinkRecord, PhoneRequest,
    SetLinkRequest,
};

use crate::error::{ClientError, ValidationError};
use crate::input::mask_phone;

const LOG_TARGET: &str = "forwarder.rules";

/// Directional (source, destination) pairing. Identified by the ordered
/// pair; the backend assigns no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRule {
    pub source_id: ChatId,
    pub destination_id: ChatId,
    pub source_name: Option<String>,
    pub destination_name: Option<String>,
}

impl ForwardingRule {
    #[must_use]
    pub fn new(source_id: ChatId, destination_id: ChatId) -> Self {
        Self {
            source_id,
            destination_id,
            source_name: None,
            destination_name: None,
        }
    }

    #[must_use]
    pub fn matches(&self, source_id: &ChatId, destination_id: &ChatId) -> bool {
        &self.source_id == source_id && &self.destination_id == destination_id
    }
}

impl From<LinkRecord> for ForwardingRule {
    fn from(record: LinkRecord) -> Self {
        Self {
            source_id: record.source_id,
            destination_id: record.destination_id,
            source_name: record.source_name,
            destination_name: record.destination_name,
        }
    }
}

/// Both ends selected and distinct.
pub fn validate_candidate(
    source_id: Option<&ChatId>,
    destination_id: Option<&ChatId>,
) -> Result<(ChatId, ChatId), ValidationError> {
    let (Some(source_id), Some(destination_id)) = (
        source_id.filter(|id| !id.is_empty()),
        destination_id.filter(|id| !id.is_empty()),
    ) else {
        return Err(ValidationError::MissingChatSelection);
    };
    if source_id == destination_id {
        return Err(ValidationError::SelfLink);
    }
    Ok((source_id.clone(), destination_id.clone()))
}

/// Last-fetched rule snapshot for one account, pruned in place on delete.
///
/// Overlapping list and delete calls are not serialized. The snapshot lock is
/// only held while applying a response, never across a request.
pub struct RuleManager<G> {
    gateway: Arc<G>,
    rules: Mutex<Vec<ForwardingRule>>,
}

impl<G> RuleManager<G>
where
    G: BackendGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            rules: Mutex::new(Vec::new()),
        }
    }

    pub fn rules(&self) -> Vec<ForwardingRule> {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn list_rules(&self, phone: &str) -> Result<Vec<ForwardingRule>, ClientError> {
        let phone = require_phone(phone)?;
        let records = self
            .gateway
            .get_links(&PhoneRequest {
                phone: phone.to_string(),
            })
            .await?;

        let mut fetched: Vec<ForwardingRule> = Vec::with_capacity(records.len());
        for rule in records.into_iter().map(ForwardingRule::from) {
            if !fetched
                .iter()
                .any(|existing| existing.matches(&rule.source_id, &rule.destination_id))
            {
                fetched.push(rule);
            }
        }

        *self.rules.lock().unwrap_or_else(PoisonError::into_inner) = fetched.clone();
        tracing::debug!(
            target: LOG_TARGET,
            phone = %mask_phone(phone),
            rules = fetched.len(),
            "forwarding rules listed",
        );
        Ok(fetched)
    }

    /// A backend-side duplicate is accepted silently, so the local list only
    /// gains the pair when it is not already present.
    pub async fn create_rule(
        &self,
        phone: &str,
        source_id: &ChatId,
        destination_id: &ChatId,
    ) -> Result<ForwardingRule, ClientError> {
        let phone = require_phone(phone)?;
        let (source_id, destination_id) =
            validate_candidate(Some(source_id), Some(destination_id))?;

        self.gateway
            .set_link(&SetLinkRequest {
                phone: phone.to_string(),
                source_id: source_id.clone(),
                destination_id: destination_id.clone(),
            })
            .await?;

        let rule = ForwardingRule::new(source_id, destination_id);
        let appended = {
            let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
            if rules
                .iter()
                .any(|existing| existing.matches(&rule.source_id, &rule.destination_id))
            {
                false
            } else {
                rules.push(rule.clone());
                true
            }
        };
        tracing::info!(
            target: LOG_TARGET,
            phone = %mask_phone(phone),
            source_id = %rule.source_id,
            destination_id = %rule.destination_id,
            appended,
            "forwarding rule created",
        );
        Ok(rule)
    }

    /// Removes the pair locally on success without a refetch. An absent pair
    /// on the backend is reported as `AlreadyAbsent`, not as an error.
    pub async fn delete_rule(
        &self,
        source_id: &ChatId,
        destination_id: &ChatId,
    ) -> Result<DeleteOutcome, ClientError> {
        if source_id.is_empty() || destination_id.is_empty() {
            return Err(ValidationError::MissingChatSelection.into());
        }

        let outcome = self
            .gateway
            .delete_link(&DeleteLinkRequest {
                source_id: source_id.clone(),
                destination_id: destination_id.clone(),
            })
            .await?;

        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|rule| !rule.matches(source_id, destination_id));
        tracing::info!(
            target: LOG_TARGET,
            source_id = %source_id,
            destination_id = %destination_id,
            already_absent = outcome == DeleteOutcome::AlreadyAbsent,
            "forwarding rule deleted",
        );
        Ok(outcome)
    }
}

fn require_phone(phone: &str) -> Result<&str, ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::MissingPhone);
    }
    Ok(phone)
}
