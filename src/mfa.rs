use std::sync::Arc;

use gateway::mfa_api::MfaApi;

use crate::{
    dialog::{Confirmation, DialogOutcome, InputRequest},
    validation::{self, MFA_CODE_MIN_LENGTH},
    ActionOutcome, Ui,
};

/// Authenticator app enrolment for the signed in user, and reset by an administrator.
pub struct MfaController {
    api: Arc<dyn MfaApi>,
    ui: Ui,
}

impl MfaController {
    pub fn new(api: Arc<dyn MfaApi>, ui: Ui) -> Self {
        Self { api, ui }
    }

    /// Asks for a code and checks it locally. `Err` is how the action ended.
    async fn ask_code(&self, request: InputRequest) -> Result<String, ActionOutcome> {
        let code = match self.ui.dialogs.input(request).await {
            DialogOutcome::Confirmed(code) => code,
            DialogOutcome::Cancelled => return Err(ActionOutcome::Cancelled),
            DialogOutcome::Failed(reason) => {
                self.ui.sink.error(&reason);
                return Err(ActionOutcome::Failed);
            }
        };
        match validation::mfa_code(&code) {
            Ok(code) => Ok(code.to_owned()),
            Err(err) => {
                self.ui.sink.error(&err.to_string());
                Err(ActionOutcome::Failed)
            }
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn enable(&self) -> ActionOutcome {
        let secret = match self.api.add_secret().await {
            Ok(secret) => secret,
            Err(err) => return self.ui.report("Error generating authenticator secret", &err),
        };
        let request = InputRequest {
            header: "Enable authenticator app".into(),
            label: format!(
                "Add the secret {} to your authenticator app, then enter the code it shows",
                secret.secret
            ),
            min_length: MFA_CODE_MIN_LENGTH,
        };
        let code = match self.ask_code(request).await {
            Ok(code) => code,
            Err(outcome) => return outcome,
        };
        if let Err(err) = self.api.enable(&code).await {
            return self.ui.report("Error enabling authenticator app", &err);
        }
        self.ui.sink.success("Authenticator app enabled");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all)]
    pub async fn disable(&self) -> ActionOutcome {
        let request = InputRequest {
            header: "Disable authenticator app".into(),
            label: "Authenticator code".into(),
            min_length: MFA_CODE_MIN_LENGTH,
        };
        let code = match self.ask_code(request).await {
            Ok(code) => code,
            Err(outcome) => return outcome,
        };
        if let Err(err) = self.api.disable(&code).await {
            return self.ui.report("Error disabling authenticator app", &err);
        }
        self.ui.sink.success("Authenticator app disabled");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all, fields(account = account_id))]
    pub async fn reset_for(&self, account_id: &str, name: &str) -> ActionOutcome {
        let confirmation = Confirmation {
            header: "Reset multi-factor authentication".into(),
            body: format!(
                "Are you sure you want to disable multi-factor authentication for user '{name}'?"
            ),
            action: "Reset MFA".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }
        if let Err(err) = self.api.reset_for(account_id).await {
            return self
                .ui
                .report("Error resetting multi-factor authentication", &err);
        }
        self.ui
            .sink
            .success(&format!("Multi-factor authentication reset for {name}"));
        ActionOutcome::Done
    }
}
