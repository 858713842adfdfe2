use std::sync::Arc;

use forwarder_gateway::{BackendGateway, HttpBackendGateway};

use crate::config::ClientConfig;
use crate::directory::ChatDirectoryCache;
use crate::error::ClientError;
use crate::flow::FlowController;
use crate::rules::RuleManager;
use crate::screens::{ActiveLinksScreen, ChatLinkerScreen, ConnectScreen, Mount, VerifyCodeScreen};
use crate::session::{FileSessionStore, SessionStore};

const LOG_TARGET: &str = "forwarder.flow";

/// Entry point for a host UI: one gateway and one session store shared by
/// every screen it mounts.
pub struct ForwarderClient<G, S> {
    flow: FlowController<G, S>,
    backend_base_url: String,
}

impl ForwarderClient<HttpBackendGateway, FileSessionStore> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let gateway = HttpBackendGateway::new(config.gateway_config())?;
        let store = FileSessionStore::new(config.state_path.clone());
        store.init()?;
        tracing::info!(
            target: LOG_TARGET,
            backend_base_url = %gateway.base_url(),
            backend_base_url_source = config.backend_base_url_source,
            timeout_ms = config.timeout_ms,
            state_path = %store.path().display(),
            "forwarder client ready",
        );
        let backend_base_url = gateway.base_url().to_string();
        Ok(Self::new(Arc::new(gateway), Arc::new(store), backend_base_url))
    }
}

impl<G, S> ForwarderClient<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>, backend_base_url: impl Into<String>) -> Self {
        Self {
            flow: FlowController::new(gateway, store),
            backend_base_url: backend_base_url.into(),
        }
    }

    pub fn backend_base_url(&self) -> &str {
        &self.backend_base_url
    }

    pub fn flow(&self) -> &FlowController<G, S> {
        &self.flow
    }

    pub fn directory_cache(&self) -> ChatDirectoryCache<G, S> {
        ChatDirectoryCache::new(
            Arc::clone(self.flow.gateway()),
            Arc::clone(self.flow.store()),
        )
    }

    pub fn rule_manager(&self) -> RuleManager<G> {
        RuleManager::new(Arc::clone(self.flow.gateway()))
    }

    pub async fn connect_screen(&self) -> Result<Mount<ConnectScreen<G, S>>, ClientError> {
        ConnectScreen::mount(self.flow.clone(), self.backend_base_url.clone()).await
    }

    pub fn verify_code_screen(&self) -> Result<Mount<VerifyCodeScreen<G, S>>, ClientError> {
        VerifyCodeScreen::mount(self.flow.clone())
    }

    pub async fn chat_linker_screen(&self) -> Result<Mount<ChatLinkerScreen<G, S>>, ClientError> {
        ChatLinkerScreen::mount(self.flow.clone()).await
    }

    pub async fn active_links_screen(
        &self,
    ) -> Result<Mount<ActiveLinksScreen<G, S>>, ClientError> {
        ActiveLinksScreen::mount(self.flow.clone()).await
    }
}
