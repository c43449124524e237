use std::sync::Arc;

use gateway::{store::EntityStore, Entity, GatewayError, OneTimeSecret};

use crate::{
    dialog::{Confirmation, DialogOutcome, SecretReveal},
    format::capitalized,
    navigation::Route,
    ActionOutcome, Ui,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditPhase {
    Viewing,
    Editing,
    Saving,
    ConfirmingDelete,
    Deleted,
}

/// "Error saving client: <server message>" or "Error saving client!" when the server said nothing useful.
pub(crate) fn failure_message(action: &str, kind: &str, err: &GatewayError) -> String {
    match err.message() {
        Some(message) => format!("Error {action} {kind}: {message}"),
        None => format!("Error {action} {kind}!"),
    }
}

/// Owns one entity being edited: the last server confirmed value and the
/// working copy the user changes. The two never share state.
pub struct EditController<E: Entity> {
    store: Arc<dyn EntityStore<E>>,
    ui: Ui,
    list_route: Route,
    canonical: E,
    working: E,
    phase: EditPhase,
    secret: Option<OneTimeSecret>,
}

impl<E: Entity> EditController<E> {
    /// Starts from `template`; a template without an id is created on first save.
    pub fn new(store: Arc<dyn EntityStore<E>>, ui: Ui, list_route: Route, template: E) -> Self {
        Self {
            store,
            ui,
            list_route,
            working: template.clone(),
            canonical: template,
            phase: EditPhase::Viewing,
            secret: None,
        }
    }

    pub fn canonical(&self) -> &E {
        &self.canonical
    }

    pub fn working(&self) -> &E {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut E {
        if self.phase == EditPhase::Viewing {
            self.phase = EditPhase::Editing;
        }
        &mut self.working
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.canonical
    }

    /// A secret handed out by the last save or rotation. Never part of the entity.
    pub fn revealed_secret(&self) -> Option<&OneTimeSecret> {
        self.secret.as_ref()
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    pub(crate) fn hold_secret(&mut self, secret: OneTimeSecret) {
        self.secret = Some(secret);
    }

    /// Adopts a value the server just confirmed, dropping any local edits.
    pub(crate) fn accept(&mut self, mut confirmed: E) -> Option<OneTimeSecret> {
        let secret = confirmed.take_one_time_secret();
        self.working = confirmed.clone();
        self.canonical = confirmed;
        self.phase = EditPhase::Viewing;
        secret
    }

    #[tracing::instrument(skip_all, fields(kind = E::KIND, id = %id))]
    pub async fn load(&mut self, id: &E::Id) -> ActionOutcome {
        match self.store.fetch(id).await {
            Ok(entity) => {
                tracing::debug!("loaded");
                self.secret = None;
                self.accept(entity);
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.ui
                    .sink
                    .error(&failure_message("retrieving", E::KIND, &err));
                ActionOutcome::Failed
            }
        }
    }

    pub fn reset(&mut self) {
        self.working = self.canonical.clone();
        self.phase = EditPhase::Viewing;
        self.secret = None;
        self.ui.sink.success(&format!(
            "{} has been reset to the last saved information",
            capitalized(E::KIND)
        ));
    }

    /// Creates the entity when it has no id yet, updates it otherwise.
    /// A newly created entity returns to the list, after any one-time secret was shown.
    #[tracing::instrument(skip_all, fields(kind = E::KIND))]
    pub async fn save(&mut self) -> ActionOutcome {
        let creating = self.working.is_new();
        self.phase = EditPhase::Saving;

        let result = if creating {
            self.store.create(&self.working).await
        } else {
            self.store.update(&self.working).await
        };

        let saved = match result {
            Ok(saved) => saved,
            Err(err) => {
                tracing::error!("{err:?}");
                self.phase = EditPhase::Editing;
                self.ui.sink.error(&failure_message("saving", E::KIND, &err));
                return ActionOutcome::Failed;
            }
        };

        let secret = self.accept(saved);
        self.ui
            .sink
            .success(&format!("{} saved!", capitalized(E::KIND)));

        if !creating {
            return ActionOutcome::Done;
        }
        let Some(secret) = secret else {
            self.ui.navigator.navigate(self.list_route);
            return ActionOutcome::Done;
        };

        self.secret = Some(secret.clone());
        let reveal = SecretReveal {
            client_id: self
                .canonical
                .id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            secret,
            title: "New client credential details".into(),
            message: "Save this client credential somewhere safe before confirming.".into(),
        };
        match self.ui.dialogs.reveal_secret(reveal).await {
            DialogOutcome::Confirmed(()) | DialogOutcome::Cancelled => {
                self.ui.navigator.navigate(self.list_route);
                ActionOutcome::Done
            }
            DialogOutcome::Failed(reason) => {
                self.ui.sink.error(&reason);
                ActionOutcome::Failed
            }
        }
    }

    #[tracing::instrument(skip_all, fields(kind = E::KIND))]
    pub async fn delete(&mut self) -> ActionOutcome {
        let Some(id) = self.canonical.id() else {
            self.ui.sink.error(&format!(
                "{} has not been saved yet",
                capitalized(E::KIND)
            ));
            return ActionOutcome::Failed;
        };
        let label = self.canonical.label();

        self.phase = EditPhase::ConfirmingDelete;
        let confirmation = Confirmation {
            header: format!("Delete {} {label}", E::KIND),
            body: format!("Are you sure you want to delete {} '{label}'?", E::KIND),
            action: format!("Delete {}", E::KIND),
        };
        match self.ui.dialogs.confirm(confirmation).await {
            DialogOutcome::Confirmed(()) => {}
            DialogOutcome::Cancelled => {
                self.phase = EditPhase::Viewing;
                return ActionOutcome::Cancelled;
            }
            DialogOutcome::Failed(reason) => {
                self.phase = EditPhase::Viewing;
                self.ui.sink.error(&reason);
                return ActionOutcome::Failed;
            }
        }

        match self.store.remove(&id).await {
            Ok(()) => {
                self.phase = EditPhase::Deleted;
                self.ui
                    .sink
                    .success(&format!("{} deleted!", capitalized(E::KIND)));
                self.ui.navigator.navigate(self.list_route);
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.phase = EditPhase::Viewing;
                self.ui.sink.error(&failure_message("deleting", E::KIND, &err));
                ActionOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::{
        dialog::MockDialogManager,
        navigation::MockNavigator,
        test_support::{permissive_ui, ui},
    };
    use gateway::{store::MockEntityStore, ErrorBody, RegisteredClient};
    use mockall::{predicate::eq, Sequence};

    fn client(id: &str, name: &str) -> RegisteredClient {
        RegisteredClient {
            client_id: Some(id.into()),
            client_name: Some(name.into()),
            scope: Some("openid".into()),
            ..Default::default()
        }
    }

    fn bad_request(error: &str) -> GatewayError {
        GatewayError::Status {
            status: 400,
            status_text: Some("Bad Request".into()),
            body: Some(ErrorBody {
                error: Some(error.into()),
                ..Default::default()
            }),
        }
    }

    fn controller(
        store: MockEntityStore<RegisteredClient>,
        ui: Ui,
        template: RegisteredClient,
    ) -> EditController<RegisteredClient> {
        EditController::new(Arc::new(store), ui, Route::Clients, template)
    }

    #[tokio::test]
    async fn test_save_replaces_canonical_with_server_response() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store.expect_update().returning(|sent| {
            let mut confirmed = sent.clone();
            confirmed.client_name = Some("renamed by server".into());
            Ok(confirmed)
        });
        let (ui, sink) = permissive_ui();
        let mut edit = controller(store, ui, client("abc123", "before"));

        edit.working_mut().client_name = Some("after".into());
        assert_eq!(edit.phase(), EditPhase::Editing);
        assert_eq!(edit.save().await, ActionOutcome::Done);

        assert_eq!(
            edit.canonical().client_name.as_deref(),
            Some("renamed by server")
        );
        assert_eq!(edit.working(), edit.canonical());
        edit.working_mut().client_name = Some("local".into());
        assert_eq!(
            edit.canonical().client_name.as_deref(),
            Some("renamed by server")
        );
        assert_eq!(sink.successes(), vec!["Client saved!"]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_both_copies() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store
            .expect_update()
            .returning(|_| Err(bad_request("invalid redirect uri")));
        let (ui, sink) = permissive_ui();
        let mut edit = controller(store, ui, client("abc123", "before"));

        edit.working_mut().client_name = Some("after".into());
        assert_eq!(edit.save().await, ActionOutcome::Failed);

        assert_eq!(edit.canonical().client_name.as_deref(), Some("before"));
        assert_eq!(edit.working().client_name.as_deref(), Some("after"));
        assert_eq!(edit.phase(), EditPhase::Editing);
        assert_eq!(
            sink.errors(),
            vec!["Error saving client: invalid redirect uri"]
        );
    }

    #[tokio::test]
    async fn test_failed_save_without_message_is_generic() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store
            .expect_update()
            .returning(|_| Err(GatewayError::Transport("connection reset".into())));
        let (ui, sink) = permissive_ui();
        let mut edit = controller(store, ui, client("abc123", "before"));

        assert_eq!(edit.save().await, ActionOutcome::Failed);
        assert_eq!(sink.errors(), vec!["Error saving client!"]);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let (ui, sink) = permissive_ui();
        let mut edit = controller(
            MockEntityStore::<RegisteredClient>::new(),
            ui,
            client("abc123", "saved"),
        );
        edit.working_mut().client_name = Some("scratch".into());
        assert!(edit.is_dirty());

        edit.reset();
        let once = edit.working().clone();
        edit.reset();
        assert_eq!(edit.working(), &once);
        assert_eq!(edit.working(), edit.canonical());
        assert!(!edit.is_dirty());
        assert_eq!(sink.successes().len(), 2);
        assert_eq!(
            sink.successes()[0],
            "Client has been reset to the last saved information"
        );
    }

    #[tokio::test]
    async fn test_load_failure_leaves_working_copy() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store
            .expect_fetch()
            .with(eq("abc123".to_owned()))
            .returning(|_| {
                Err(GatewayError::Status {
                    status: 404,
                    status_text: Some("Not Found".into()),
                    body: None,
                })
            });
        let (ui, sink) = permissive_ui();
        let mut edit = controller(store, ui, client("abc123", "kept"));
        edit.working_mut().client_name = Some("typing".into());

        assert_eq!(edit.load(&"abc123".to_owned()).await, ActionOutcome::Failed);
        assert_eq!(edit.working().client_name.as_deref(), Some("typing"));
        assert_eq!(sink.errors(), vec!["Error retrieving client: Not Found"]);
    }

    #[tokio::test]
    async fn test_new_client_secret_is_revealed_before_navigation() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store.expect_create().returning(|sent| {
            let mut created = sent.clone();
            created.client_id = Some("abc123".into());
            created.client_secret = Some("xyz".into());
            Ok(created)
        });

        let mut seq = Sequence::new();
        let mut dialogs = MockDialogManager::new();
        dialogs
            .expect_reveal_secret()
            .withf(|reveal| reveal.secret.expose() == "xyz" && reveal.client_id == "abc123")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| DialogOutcome::Confirmed(()));
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .with(eq(Route::Clients))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let (ui, _sink) = ui(dialogs, navigator);

        let template = RegisteredClient {
            client_name: Some("new app".into()),
            ..Default::default()
        };
        let mut edit = controller(store, ui, template);
        assert_eq!(edit.save().await, ActionOutcome::Done);

        assert_eq!(edit.canonical().client_id.as_deref(), Some("abc123"));
        assert!(edit.canonical().client_secret.is_none());
        assert!(edit.working().client_secret.is_none());
        assert_eq!(edit.revealed_secret().unwrap().expose(), "xyz");
    }

    #[tokio::test]
    async fn test_reveal_failure_stays_on_page() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store.expect_create().returning(|sent| {
            let mut created = sent.clone();
            created.client_id = Some("abc123".into());
            created.client_secret = Some("xyz".into());
            Ok(created)
        });
        let mut dialogs = MockDialogManager::new();
        dialogs
            .expect_reveal_secret()
            .returning(|_| DialogOutcome::Failed("terminal closed".into()));
        let mut navigator = MockNavigator::new();
        navigator.expect_navigate().never();
        let (ui, sink) = ui(dialogs, navigator);

        let mut edit = controller(store, ui, RegisteredClient::default());
        assert_eq!(edit.save().await, ActionOutcome::Failed);
        assert_eq!(sink.errors(), vec!["terminal closed"]);
    }

    #[tokio::test]
    async fn test_delete_cancel_changes_nothing() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store.expect_remove().never();
        let mut dialogs = MockDialogManager::new();
        dialogs
            .expect_confirm()
            .returning(|_| DialogOutcome::Cancelled);
        let mut navigator = MockNavigator::new();
        navigator.expect_navigate().never();
        let (ui, sink) = ui(dialogs, navigator);

        let mut edit = controller(store, ui, client("abc123", "keep me"));
        assert_eq!(edit.delete().await, ActionOutcome::Cancelled);
        assert_eq!(edit.phase(), EditPhase::Viewing);
        assert!(sink.all().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failed_dialog_notifies_once() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store.expect_remove().never();
        let mut dialogs = MockDialogManager::new();
        dialogs
            .expect_confirm()
            .returning(|_| DialogOutcome::Failed("dialog crashed".into()));
        let (ui, sink) = ui(dialogs, MockNavigator::new());

        let mut edit = controller(store, ui, client("abc123", "keep me"));
        assert_eq!(edit.delete().await, ActionOutcome::Failed);
        assert_eq!(sink.errors(), vec!["dialog crashed"]);
    }

    #[tokio::test]
    async fn test_confirmed_delete_navigates_away() {
        let mut store = MockEntityStore::<RegisteredClient>::new();
        store
            .expect_remove()
            .with(eq("abc123".to_owned()))
            .times(1)
            .returning(|_| Ok(()));
        let mut dialogs = MockDialogManager::new();
        dialogs
            .expect_confirm()
            .withf(|c| c.body == "Are you sure you want to delete client 'doomed'?")
            .returning(|_| DialogOutcome::Confirmed(()));
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .with(eq(Route::Clients))
            .times(1)
            .return_const(());
        let (ui, sink) = ui(dialogs, navigator);

        let mut edit = controller(store, ui, client("abc123", "doomed"));
        assert_eq!(edit.delete().await, ActionOutcome::Done);
        assert_eq!(edit.phase(), EditPhase::Deleted);
        assert_eq!(sink.successes(), vec!["Client deleted!"]);
    }
}
