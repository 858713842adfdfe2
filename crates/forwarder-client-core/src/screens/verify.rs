use forwarder_gateway::BackendGateway;

use crate::error::{ClientError, ValidationError};
use crate::flow::{FlowController, GuardDecision, Screen};
use crate::screens::Mount;
use crate::session::SessionStore;

pub struct VerifyCodeScreen<G, S> {
    flow: FlowController<G, S>,
    phone: String,
    pub code_input: String,
    submitting: bool,
    error: Option<String>,
}

impl<G, S> VerifyCodeScreen<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    pub fn mount(flow: FlowController<G, S>) -> Result<Mount<Self>, ClientError> {
        if let GuardDecision::Redirect(target) = flow.enter(Screen::VerifyCode)? {
            return Ok(Mount::Redirect(target));
        }
        let Some(phone) = flow.session()?.phone else {
            return Ok(Mount::Redirect(Screen::Connect));
        };
        Ok(Mount::Ready(Self {
            flow,
            phone,
            code_input: String::new(),
            submitting: false,
            error: None,
        }))
    }

    /// The phone the code was sent to. Not editable here.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// A failure keeps the user on this screen with the phone intact.
    pub async fn submit(&mut self) -> Result<Screen, ClientError> {
        self.submitting = true;
        self.error = None;
        let result = self.flow.submit_code(&self.code_input).await;
        self.submitting = false;
        match result {
            Ok(verification) => Ok(verification.next),
            Err(error) => {
                if matches!(
                    error,
                    ClientError::Validation(ValidationError::MissingPhone)
                ) {
                    return Ok(Screen::Connect);
                }
                self.error = Some(error.user_message());
                Err(error)
            }
        }
    }

    pub async fn resend_code(&mut self) -> Result<(), ClientError> {
        self.error = None;
        match self.flow.submit_phone(&self.phone).await {
            Ok(_) => Ok(()),
            Err(error) => {
                self.error = Some(error.user_message());
                Err(error)
            }
        }
    }
}
