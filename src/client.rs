use std::sync::Arc;

use chrono::NaiveDateTime;
use gateway::{
    account_api::AccountApi, clients_api::ClientsApi, store::EntityStore, Entity,
    RegisteredClient,
};

use crate::{
    dialog::{Confirmation, DialogOutcome, SecretReveal},
    edit::EditController,
    format,
    navigation::Route,
    ActionOutcome, Ui,
};

/// Which tokens to revoke. Access tokens can be limited to those issued before a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenRevocation {
    pub refresh_tokens: bool,
    pub access_tokens: bool,
    pub issued_before: Option<NaiveDateTime>,
}

impl TokenRevocation {
    pub fn is_empty(&self) -> bool {
        !self.refresh_tokens && !self.access_tokens
    }
}

/// Administration of a single OAuth client on top of the generic edit flow.
pub struct ClientController {
    edit: EditController<RegisteredClient>,
    clients: Arc<dyn ClientsApi>,
    accounts: Arc<dyn AccountApi>,
    limited: bool,
}

impl ClientController {
    pub fn admin(
        store: Arc<dyn EntityStore<RegisteredClient>>,
        clients: Arc<dyn ClientsApi>,
        accounts: Arc<dyn AccountApi>,
        ui: Ui,
        template: RegisteredClient,
    ) -> Self {
        Self {
            edit: EditController::new(store, ui, Route::Clients, template),
            clients,
            accounts,
            limited: false,
        }
    }

    /// A user managing the clients they registered. `store` is the dynamic registration endpoint.
    pub fn self_service(
        store: Arc<dyn EntityStore<RegisteredClient>>,
        clients: Arc<dyn ClientsApi>,
        accounts: Arc<dyn AccountApi>,
        ui: Ui,
        template: RegisteredClient,
    ) -> Self {
        Self {
            edit: EditController::new(store, ui, Route::MyClients, template),
            clients,
            accounts,
            limited: true,
        }
    }

    pub fn edit(&self) -> &EditController<RegisteredClient> {
        &self.edit
    }

    pub fn edit_mut(&mut self) -> &mut EditController<RegisteredClient> {
        &mut self.edit
    }

    pub fn client(&self) -> &RegisteredClient {
        self.edit.canonical()
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    fn ui(&self) -> Ui {
        self.edit.ui().clone()
    }

    fn require_id(&self) -> Option<String> {
        let id = self.client().id();
        if id.is_none() {
            self.edit
                .ui()
                .sink
                .error("Client has not been saved yet");
        }
        id
    }

    /// Disables an active client or restores a disabled one, then reloads it.
    #[tracing::instrument(skip_all)]
    pub async fn toggle_status(&mut self) -> ActionOutcome {
        let Some(id) = self.require_id() else {
            return ActionOutcome::Failed;
        };
        let name = self.client().display_name().to_owned();
        let active = self.client().active;
        let (verb, action) = if active {
            ("Disable", "disable")
        } else {
            ("Restore", "restore")
        };
        let confirmation = Confirmation {
            header: format!("{verb} {name}"),
            body: format!("Are you sure you want to {action} client '{name}'?"),
            action: format!("{verb} client"),
        };
        if let Err(outcome) = self.ui().confirm(confirmation).await {
            return outcome;
        }

        let result = if active {
            self.clients.disable(&id).await
        } else {
            self.clients.enable(&id).await
        };
        if let Err(err) = result {
            return self.ui().report("Error updating client status", &err);
        }
        if !self.edit.load(&id).await.is_done() {
            return ActionOutcome::Failed;
        }

        let name = self.client().display_name().to_owned();
        let message = if self.client().active {
            format!("Client '{name}' has been restored successfully.")
        } else {
            format!("Client '{name}' is now disabled.")
        };
        self.ui().sink.success(&message);
        ActionOutcome::Done
    }

    /// Nothing selected counts as the user backing out.
    #[tracing::instrument(skip_all)]
    pub async fn revoke_tokens(&mut self, selection: TokenRevocation) -> ActionOutcome {
        if selection.is_empty() {
            return ActionOutcome::Cancelled;
        }
        let Some(id) = self.require_id() else {
            return ActionOutcome::Failed;
        };
        let name = self.client().display_name().to_owned();
        let confirmation = Confirmation {
            header: format!("Remove {name} tokens"),
            body: format!("Are you sure you want to remove tokens from client '{name}'?"),
            action: "Remove tokens".into(),
        };
        if let Err(outcome) = self.ui().confirm(confirmation).await {
            return outcome;
        }

        let mut result = Ok(());
        if selection.refresh_tokens {
            result = self.clients.revoke_refresh_tokens(&id).await;
        }
        if result.is_ok() && selection.access_tokens {
            result = self
                .clients
                .revoke_access_tokens(&id, selection.issued_before)
                .await;
        }
        if let Err(err) = result {
            return self.ui().report("Error removing tokens", &err);
        }
        if !self.edit.load(&id).await.is_done() {
            return ActionOutcome::Failed;
        }
        self.ui()
            .sink
            .success(&format!("Tokens of client '{name}' have been revoked."));
        ActionOutcome::Done
    }

    /// The new secret is only kept in memory and shown once; the loaded client is left as is.
    #[tracing::instrument(skip_all)]
    pub async fn rotate_secret(&mut self) -> ActionOutcome {
        let Some(id) = self.require_id() else {
            return ActionOutcome::Failed;
        };
        let name = self.client().display_name().to_owned();
        let confirmation = Confirmation {
            header: "Regenerate client secret".into(),
            body: format!(
                "Are you sure you want to regenerate the secret of client '{name}'? The current secret will stop working."
            ),
            action: "Regenerate secret".into(),
        };
        if let Err(outcome) = self.ui().confirm(confirmation).await {
            return outcome;
        }

        let secret = match self.clients.rotate_secret(&id).await {
            Ok(mut rotated) => rotated.take_one_time_secret(),
            Err(err) => return self.ui().report("Error regenerating client secret", &err),
        };
        let Some(secret) = secret else {
            self.ui()
                .sink
                .error("The server did not return a new client secret");
            return ActionOutcome::Failed;
        };

        self.edit.hold_secret(secret.clone());
        self.ui().sink.success("Client secret regenerated");
        let reveal = SecretReveal {
            client_id: id,
            secret,
            title: "Client credential details".into(),
            message: "The new client secret will not be shown again.".into(),
        };
        match self.ui().dialogs.reveal_secret(reveal).await {
            DialogOutcome::Confirmed(()) | DialogOutcome::Cancelled => ActionOutcome::Done,
            DialogOutcome::Failed(reason) => {
                self.ui().sink.error(&reason);
                ActionOutcome::Failed
            }
        }
    }

    /// Not available from the self-service view.
    #[tracing::instrument(skip_all)]
    pub async fn rotate_registration_access_token(&mut self) -> ActionOutcome {
        if self.limited {
            return ActionOutcome::Cancelled;
        }
        let Some(id) = self.require_id() else {
            return ActionOutcome::Failed;
        };
        let name = self.client().display_name().to_owned();
        match self.clients.rotate_registration_access_token(&id).await {
            Ok(rotated) => {
                self.edit.accept(rotated);
                self.ui().sink.success(&format!(
                    "Registration access token rotated for client {name}"
                ));
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.ui().sink.error(&format!(
                    "Could not rotate registration access token for client {name}"
                ));
                ActionOutcome::Failed
            }
        }
    }

    /// "Suspended by <username> on <date>" for a disabled client.
    pub async fn status_message(&self) -> Option<String> {
        status_message(self.accounts.as_ref(), self.client()).await
    }
}

/// Shared with the list view, which shows the same line per row.
pub async fn status_message(accounts: &dyn AccountApi, client: &RegisteredClient) -> Option<String> {
    if client.active {
        return None;
    }
    let mut who = "a VO admin".to_owned();
    if let Some(uuid) = client.status_changed_by.as_deref() {
        match accounts.find_by_uuid(uuid).await {
            Ok(account) => {
                if let Some(username) = account.username {
                    who = username;
                }
            }
            Err(err) => tracing::warn!("Error retrieving user account {uuid}: {err}"),
        }
    }
    Some(match client.status_changed_on.as_ref() {
        Some(date) => format!("Suspended by {who} on {}", format::timestamp(date)),
        None => format!("Suspended by {who}"),
    })
}
