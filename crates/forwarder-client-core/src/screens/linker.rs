use std::sync::Arc;

use forwarder_gateway::{BackendGateway, ChatId};

use crate::directory::{ChatDirectory, ChatDirectoryCache, ChatDirectoryEntry};
use crate::error::ClientError;
use crate::flow::{FlowController, GuardDecision, Screen};
use crate::rules::{ForwardingRule, RuleManager, validate_candidate};
use crate::screens::Mount;
use crate::session::SessionStore;

pub const CHAT_LINKED_MESSAGE: &str = "Link created successfully";

/// Source/destination picker backed by a freshly fetched chat directory.
pub struct ChatLinkerScreen<G, S> {
    phone: String,
    cache: ChatDirectoryCache<G, S>,
    rules: RuleManager<G>,
    directory: ChatDirectory,
    source: Option<ChatId>,
    destination: Option<ChatId>,
    loading: bool,
    submitting: bool,
    error: Option<String>,
    status: Option<String>,
}

impl<G, S> ChatLinkerScreen<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    /// A failed directory fetch still mounts the screen, with the failure
    /// shown inline and an empty picker.
    pub async fn mount(flow: FlowController<G, S>) -> Result<Mount<Self>, ClientError> {
        if let GuardDecision::Redirect(target) = flow.enter(Screen::ChatLinker)? {
            return Ok(Mount::Redirect(target));
        }
        let Some(phone) = flow.session()?.phone else {
            return Ok(Mount::Redirect(Screen::Connect));
        };
        let mut screen = Self {
            phone,
            cache: ChatDirectoryCache::new(Arc::clone(flow.gateway()), Arc::clone(flow.store())),
            rules: RuleManager::new(Arc::clone(flow.gateway())),
            directory: ChatDirectory::default(),
            source: None,
            destination: None,
            loading: false,
            submitting: false,
            error: None,
            status: None,
        };
        screen.reload().await;
        Ok(Mount::Ready(screen))
    }

    pub async fn reload(&mut self) {
        self.loading = true;
        self.error = None;
        match self.cache.refresh(&self.phone).await {
            Ok(directory) => self.directory = directory,
            Err(error) => self.error = Some(error.user_message()),
        }
        self.loading = false;
    }

    pub fn directory(&self) -> &ChatDirectory {
        &self.directory
    }

    pub fn search(&self, query: &str) -> Vec<&ChatDirectoryEntry> {
        self.directory.search(query)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn source(&self) -> Option<&ChatId> {
        self.source.as_ref()
    }

    pub fn destination(&self) -> Option<&ChatId> {
        self.destination.as_ref()
    }

    pub fn select_source(&mut self, id: Option<ChatId>) {
        self.source = id;
        self.status = None;
    }

    pub fn select_destination(&mut self, id: Option<ChatId>) {
        self.destination = id;
        self.status = None;
    }

    pub async fn submit(&mut self) -> Result<ForwardingRule, ClientError> {
        self.error = None;
        self.status = None;
        let (source, destination) =
            match validate_candidate(self.source.as_ref(), self.destination.as_ref()) {
                Ok(pair) => pair,
                Err(error) => {
                    let error = ClientError::from(error);
                    self.error = Some(error.user_message());
                    return Err(error);
                }
            };

        self.submitting = true;
        let result = self
            .rules
            .create_rule(&self.phone, &source, &destination)
            .await;
        self.submitting = false;
        match result {
            Ok(rule) => {
                self.status = Some(CHAT_LINKED_MESSAGE.to_string());
                self.source = None;
                self.destination = None;
                Ok(rule)
            }
            Err(error) => {
                self.error = Some(error.user_message());
                Err(error)
            }
        }
    }
}
