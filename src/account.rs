use std::sync::Arc;

use chrono::{DateTime, Utc};
use gateway::{
    account_api::AccountApi, aup_api::AupApi, mfa_api::MfaApi, store::EntityStore, Authorities,
    Authority, AupSignature, GatewayResult, GroupRef, ScimUser,
};

use crate::{dialog::Confirmation, edit::failure_message, ActionOutcome, Ui};

/// Everything the account page shows, fetched together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserProfile {
    pub user: ScimUser,
    pub authorities: Authorities,
    pub aup_signature: Option<AupSignature>,
    pub aup_expires_at: Option<DateTime<Utc>>,
    pub mfa_active: bool,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.authorities.has(Authority::Admin)
    }

    pub fn is_reader(&self) -> bool {
        self.authorities.has(Authority::Reader)
    }
}

fn privilege(authority: Authority) -> &'static str {
    match authority {
        Authority::Admin => "administrator",
        Authority::Reader => "monitoring",
    }
}

/// Administration of one account: privileges, groups, service account flag and AUP.
pub struct AccountController {
    store: Arc<dyn EntityStore<ScimUser>>,
    accounts: Arc<dyn AccountApi>,
    aup: Arc<dyn AupApi>,
    mfa: Arc<dyn MfaApi>,
    ui: Ui,
    account_id: String,
    profile: Option<UserProfile>,
}

impl AccountController {
    pub fn new(
        store: Arc<dyn EntityStore<ScimUser>>,
        accounts: Arc<dyn AccountApi>,
        aup: Arc<dyn AupApi>,
        mfa: Arc<dyn MfaApi>,
        ui: Ui,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            accounts,
            aup,
            mfa,
            ui,
            account_id: account_id.into(),
            profile: None,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    fn name(&self) -> String {
        self.profile
            .as_ref()
            .map(|profile| profile.user.display_name().to_owned())
            .unwrap_or_else(|| self.account_id.clone())
    }

    async fn fetch_profile(&self) -> GatewayResult<UserProfile> {
        let id = &self.account_id;
        let (user, authorities, aup_signature, mfa) = tokio::try_join!(
            self.store.fetch(id),
            self.accounts.authorities(id),
            self.aup.signature_for(id),
            self.mfa.settings(id),
        )?;
        let aup_expires_at = aup_signature.as_ref().and_then(AupSignature::expires_at);
        Ok(UserProfile {
            user,
            authorities,
            aup_signature,
            aup_expires_at,
            mfa_active: mfa.authenticator_app_active,
        })
    }

    #[tracing::instrument(skip_all, fields(account = %self.account_id))]
    pub async fn load_profile(&mut self) -> ActionOutcome {
        match self.fetch_profile().await {
            Ok(profile) => {
                self.profile = Some(profile);
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.ui
                    .sink
                    .error(&failure_message("retrieving", "account", &err));
                ActionOutcome::Failed
            }
        }
    }

    /// Reloads the profile and only then reports `success`.
    async fn finish(
        &mut self,
        result: GatewayResult<()>,
        failure: &str,
        success: String,
    ) -> ActionOutcome {
        if let Err(err) = result {
            return self.ui.report(failure, &err);
        }
        if !self.load_profile().await.is_done() {
            return ActionOutcome::Failed;
        }
        self.ui.sink.success(&success);
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all, fields(account = %self.account_id, %authority, grant))]
    pub async fn set_authority(&mut self, authority: Authority, grant: bool) -> ActionOutcome {
        let name = self.name();
        let role = privilege(authority);
        let confirmation = if grant {
            Confirmation {
                header: format!("Grant {role} privileges"),
                body: format!("Are you sure you want to grant {role} privileges to user '{name}'?"),
                action: "Grant privileges".into(),
            }
        } else {
            Confirmation {
                header: format!("Revoke {role} privileges"),
                body: format!(
                    "Are you sure you want to revoke {role} privileges from user '{name}'?"
                ),
                action: "Revoke privileges".into(),
            }
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }

        let result = if grant {
            self.accounts.grant_authority(&self.account_id, authority).await
        } else {
            self.accounts.revoke_authority(&self.account_id, authority).await
        };
        let success = match (authority, grant) {
            (Authority::Admin, true) => format!("User '{name}' is now an administrator."),
            (Authority::Admin, false) => format!("User '{name}' is no longer an administrator."),
            (Authority::Reader, true) => format!("User '{name}' now has monitoring privileges."),
            (Authority::Reader, false) => {
                format!("User '{name}' no longer has monitoring privileges.")
            }
        };
        self.finish(result, "Error updating privileges", success).await
    }

    #[tracing::instrument(skip_all, fields(account = %self.account_id))]
    pub async fn toggle_service_account(&mut self) -> ActionOutcome {
        let name = self.name();
        let enable = !self
            .profile
            .as_ref()
            .map(|profile| profile.user.is_service_account())
            .unwrap_or(false);
        let confirmation = if enable {
            Confirmation {
                header: "Set as service account".into(),
                body: format!("Are you sure you want to set user '{name}' as service account?"),
                action: "Set as service account".into(),
            }
        } else {
            Confirmation {
                header: "Revoke service account status".into(),
                body: format!(
                    "Are you sure you want to revoke service account status from user '{name}'?"
                ),
                action: "Revoke service account status".into(),
            }
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }

        let result = self
            .accounts
            .set_service_account(&self.account_id, enable)
            .await;
        let success = if enable {
            format!("User '{name}' has been set as service account successfully.")
        } else {
            format!("User '{name}' is no longer a service account.")
        };
        self.finish(result, "Error updating service account status", success)
            .await
    }

    #[tracing::instrument(skip_all, fields(account = %self.account_id, group = %group.value))]
    pub async fn remove_from_group(&mut self, group: &GroupRef) -> ActionOutcome {
        let name = self.name();
        let group_name = group.display.as_deref().unwrap_or(&group.value);
        let confirmation = Confirmation {
            header: format!("Remove '{name}' from group '{group_name}'"),
            body: format!(
                "Are you sure you want to remove user '{name}' from group '{group_name}'?"
            ),
            action: "Remove from group".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }

        let result = self
            .accounts
            .remove_from_group(&self.account_id, &group.value)
            .await;
        let success = format!("User '{name}' removed from group '{group_name}'");
        self.finish(result, "Error removing user from group", success)
            .await
    }

    /// The signed in user leaving one of their own groups.
    #[tracing::instrument(skip_all, fields(group = %group.value))]
    pub async fn leave_group(&mut self, group: &GroupRef) -> ActionOutcome {
        let group_name = group.display.as_deref().unwrap_or(&group.value);
        let confirmation = Confirmation {
            header: format!("Remove yourself from group '{group_name}'"),
            body: format!("Are you sure you want to leave group '{group_name}'?"),
            action: "Leave group".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }

        let result = self.accounts.leave_group(&group.value).await;
        let success = format!("You are no longer a member of group '{group_name}'");
        self.finish(result, "Error leaving group", success).await
    }

    /// Drops the current signature so the user is asked to sign again at next login.
    #[tracing::instrument(skip_all, fields(account = %self.account_id))]
    pub async fn request_aup_signature(&mut self) -> ActionOutcome {
        let name = self.name();
        let confirmation = Confirmation {
            header: "Request AUP signature".into(),
            body: format!("Are you sure you want to request a new AUP signature from '{name}'?"),
            action: "Request signature".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }

        let result = self.aup.delete_signature(&self.account_id).await;
        let success = format!("AUP signature requested to {name}");
        self.finish(result, "Error requesting AUP signature", success)
            .await
    }

    #[tracing::instrument(skip_all, fields(account = %self.account_id))]
    pub async fn sign_aup_on_behalf(&mut self) -> ActionOutcome {
        let name = self.name();
        let result = self.aup.sign_on_behalf(&self.account_id).await;
        let success = format!("AUP signature updated for {name}");
        self.finish(result, "Error updating AUP signature", success)
            .await
    }

    /// Signs the AUP again as the signed in user.
    #[tracing::instrument(skip_all)]
    pub async fn resign_aup(&mut self) -> ActionOutcome {
        let name = self.name();
        let result = self.aup.sign().await;
        let success = format!("AUP signature updated for {name}");
        self.finish(result, "Error signing AUP", success).await
    }
}
