use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use forwarder_gateway::{BackendGateway, ChatId, DeleteOutcome};

use crate::directory::{ChatDirectoryCache, resolve_label};
use crate::error::ClientError;
use crate::flow::{FlowController, GuardDecision, Screen};
use crate::rules::RuleManager;
use crate::screens::Mount;
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub source_id: ChatId,
    pub destination_id: ChatId,
    pub source_label: String,
    pub destination_label: String,
    pub deleting: bool,
}

/// Active rule listing. Methods take `&self` so a refresh and a delete from
/// an earlier click can be in flight together.
pub struct ActiveLinksScreen<G, S> {
    phone: String,
    cache: ChatDirectoryCache<G, S>,
    rules: RuleManager<G>,
    /// In-flight delete count per pair.
    deleting: Mutex<HashMap<(ChatId, ChatId), usize>>,
    error: Mutex<Option<String>>,
}

impl<G, S> ActiveLinksScreen<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    pub async fn mount(flow: FlowController<G, S>) -> Result<Mount<Self>, ClientError> {
        if let GuardDecision::Redirect(target) = flow.enter(Screen::ActiveLinks)? {
            return Ok(Mount::Redirect(target));
        }
        let Some(phone) = flow.session()?.phone else {
            return Ok(Mount::Redirect(Screen::Connect));
        };
        let screen = Self {
            phone,
            cache: ChatDirectoryCache::new(Arc::clone(flow.gateway()), Arc::clone(flow.store())),
            rules: RuleManager::new(Arc::clone(flow.gateway())),
            deleting: Mutex::new(HashMap::new()),
            error: Mutex::new(None),
        };
        screen.refresh().await;
        Ok(Mount::Ready(screen))
    }

    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_error(&self, error: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    pub async fn refresh(&self) {
        self.set_error(None);
        if let Err(error) = self.rules.list_rules(&self.phone).await {
            self.set_error(Some(error.user_message()));
        }
    }

    /// Rows with display labels taken from the cached chat names when known.
    pub fn rows(&self) -> Result<Vec<LinkRow>, ClientError> {
        let names = self.cache.cached_names()?;
        let deleting = self.deleting.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .rules
            .rules()
            .into_iter()
            .map(|rule| LinkRow {
                source_label: resolve_label(&names, &rule.source_id, rule.source_name.as_deref()),
                destination_label: resolve_label(
                    &names,
                    &rule.destination_id,
                    rule.destination_name.as_deref(),
                ),
                deleting: deleting
                    .contains_key(&(rule.source_id.clone(), rule.destination_id.clone())),
                source_id: rule.source_id,
                destination_id: rule.destination_id,
            })
            .collect())
    }

    pub fn is_deleting(&self, source_id: &ChatId, destination_id: &ChatId) -> bool {
        self.deleting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(source_id.clone(), destination_id.clone()))
    }

    pub async fn delete(
        &self,
        source_id: &ChatId,
        destination_id: &ChatId,
    ) -> Result<DeleteOutcome, ClientError> {
        let pair = (source_id.clone(), destination_id.clone());
        *self
            .deleting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pair.clone())
            .or_insert(0) += 1;
        self.set_error(None);

        let result = self.rules.delete_rule(source_id, destination_id).await;

        {
            let mut deleting = self.deleting.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(count) = deleting.get_mut(&pair) {
                *count -= 1;
                if *count == 0 {
                    deleting.remove(&pair);
                }
            }
        }
        if let Err(error) = &result {
            self.set_error(Some(error.user_message()));
        }
        result
    }
}
