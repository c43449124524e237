use std::sync::Arc;

use gateway::password_api::PasswordApi;

use crate::{validation, ActionOutcome, Ui};

pub struct PasswordController {
    api: Arc<dyn PasswordApi>,
    ui: Ui,
}

impl PasswordController {
    pub fn new(api: Arc<dyn PasswordApi>, ui: Ui) -> Self {
        Self { api, ui }
    }

    #[tracing::instrument(skip_all)]
    pub async fn forgot(&self, email: &str) -> ActionOutcome {
        let email = match validation::required("Email", email) {
            Ok(email) => email,
            Err(err) => {
                self.ui.sink.error(&err.to_string());
                return ActionOutcome::Failed;
            }
        };
        if let Err(err) = self.api.forgot(email).await {
            return self.ui.report("Error requesting password reset", &err);
        }
        self.ui
            .sink
            .success(&format!("A password reset link has been sent to {email}"));
        ActionOutcome::Done
    }

    /// Completes a reset with the token from the email.
    #[tracing::instrument(skip_all)]
    pub async fn reset(&self, token: &str, new_password: &str) -> ActionOutcome {
        let checked = validation::required("Reset token", token).and_then(|token| {
            validation::new_password("", new_password).map(|password| (token, password))
        });
        let (token, new_password) = match checked {
            Ok(checked) => checked,
            Err(err) => {
                self.ui.sink.error(&err.to_string());
                return ActionOutcome::Failed;
            }
        };
        if let Err(err) = self.api.reset(token, new_password).await {
            return self.ui.report("Error resetting password", &err);
        }
        self.ui.sink.success("Your password has been reset");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all)]
    pub async fn change(&self, current_password: &str, new_password: &str) -> ActionOutcome {
        let new_password = match validation::new_password(current_password, new_password) {
            Ok(password) => password,
            Err(err) => {
                self.ui.sink.error(&err.to_string());
                return ActionOutcome::Failed;
            }
        };
        if let Err(err) = self.api.change(current_password, new_password).await {
            return self.ui.report("Error updating password", &err);
        }
        self.ui.sink.success("Password updated");
        ActionOutcome::Done
    }
}
