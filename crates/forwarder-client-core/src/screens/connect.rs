use forwarder_gateway::{BackendGateway, BackendStatus};

use crate::error::{ClientError, ValidationError};
use crate::flow::{FlowController, GuardDecision, Screen};
use crate::screens::Mount;
use crate::session::SessionStore;

/// Phone entry. Submission is held back while the last probe says the
/// backend is offline, unless the user forces it.
pub struct ConnectScreen<G, S> {
    flow: FlowController<G, S>,
    backend_base_url: String,
    backend_status: BackendStatus,
    force_retry: bool,
    submitting: bool,
    pub phone_input: String,
    error: Option<String>,
}

impl<G, S> ConnectScreen<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    pub async fn mount(
        flow: FlowController<G, S>,
        backend_base_url: impl Into<String>,
    ) -> Result<Mount<Self>, ClientError> {
        if let GuardDecision::Redirect(target) = flow.enter(Screen::Connect)? {
            return Ok(Mount::Redirect(target));
        }
        let phone_input = flow.session()?.phone.unwrap_or_default();
        let backend_status = flow.probe_backend().await;
        Ok(Mount::Ready(Self {
            flow,
            backend_base_url: backend_base_url.into(),
            backend_status,
            force_retry: false,
            submitting: false,
            phone_input,
            error: None,
        }))
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.backend_status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && (self.backend_status != BackendStatus::Offline || self.force_retry)
    }

    /// Offline warning shown above the form, if any.
    pub fn backend_warning(&self) -> Option<String> {
        (self.backend_status == BackendStatus::Offline).then(|| {
            ValidationError::SubmitDisabled {
                base_url: self.backend_base_url.clone(),
            }
            .to_string()
        })
    }

    pub async fn reprobe(&mut self) -> BackendStatus {
        self.backend_status = self.flow.probe_backend().await;
        self.backend_status
    }

    pub fn force_retry(&mut self) {
        self.force_retry = true;
    }

    pub async fn submit(&mut self) -> Result<Screen, ClientError> {
        if !self.can_submit() {
            let error = ClientError::from(ValidationError::SubmitDisabled {
                base_url: self.backend_base_url.clone(),
            });
            self.error = Some(error.user_message());
            return Err(error);
        }

        self.submitting = true;
        self.error = None;
        let result = self.flow.submit_phone(&self.phone_input).await;
        self.submitting = false;
        match result {
            Ok(submission) => {
                self.phone_input = submission.phone;
                Ok(submission.next)
            }
            Err(error) => {
                self.error = Some(error.user_message());
                Err(error)
            }
        }
    }
}
