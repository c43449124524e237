pub mod account;
pub mod app_state;
pub mod cli;
pub mod client;
pub mod config;
pub mod dialog;
pub mod edit;
pub mod format;
pub mod list;
pub mod mfa;
pub mod navigation;
pub mod notify;
pub mod observability;
pub mod pagination;
pub mod password;
pub mod policy;
pub mod validation;
pub mod x509;

use std::sync::Arc;

use dialog::{Confirmation, DialogManager, DialogOutcome};
use gateway::GatewayError;
use navigation::Navigator;
use notify::NotificationSink;

/// How a user initiated operation ended. Failures have already been reported
/// through the notification sink by the time this is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Cancelled,
    Failed,
}

impl ActionOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// The three user facing seams every controller talks through.
#[derive(Clone)]
pub struct Ui {
    pub dialogs: Arc<dyn DialogManager>,
    pub sink: Arc<dyn NotificationSink>,
    pub navigator: Arc<dyn Navigator>,
}

impl Ui {
    pub fn new(
        dialogs: impl DialogManager + 'static,
        sink: impl NotificationSink + 'static,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            dialogs: Arc::new(dialogs),
            sink: Arc::new(sink),
            navigator,
        }
    }

    /// `Err` carries how the action ends when the user did not confirm.
    pub(crate) async fn confirm(&self, confirmation: Confirmation) -> Result<(), ActionOutcome> {
        match self.dialogs.confirm(confirmation).await {
            DialogOutcome::Confirmed(()) => Ok(()),
            DialogOutcome::Cancelled => Err(ActionOutcome::Cancelled),
            DialogOutcome::Failed(reason) => {
                self.sink.error(&reason);
                Err(ActionOutcome::Failed)
            }
        }
    }

    /// Reports a failed request as "<prefix>: <server message>" or "<prefix>!".
    pub(crate) fn report(&self, prefix: &str, err: &GatewayError) -> ActionOutcome {
        tracing::error!("{err:?}");
        let message = match err.message() {
            Some(message) => format!("{prefix}: {message}"),
            None => format!("{prefix}!"),
        };
        self.sink.error(&message);
        ActionOutcome::Failed
    }
}
