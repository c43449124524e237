use std::sync::Arc;

use gateway::{policies_api::PoliciesApi, store::EntityStore, Entity, ScopePolicy};

use crate::{
    app_state::AppState,
    dialog::{Confirmation, DialogOutcome},
    edit::failure_message,
    pagination::Pager,
    ActionOutcome, Ui,
};

/// Scope policies are few, so they are fetched in one go and paged locally.
pub struct PolicyController {
    policies: Arc<dyn PoliciesApi>,
    store: Arc<dyn EntityStore<ScopePolicy>>,
    state: Arc<AppState>,
    ui: Ui,
    pager: Pager,
    all: Vec<ScopePolicy>,
}

impl PolicyController {
    pub fn new(
        policies: Arc<dyn PoliciesApi>,
        store: Arc<dyn EntityStore<ScopePolicy>>,
        state: Arc<AppState>,
        ui: Ui,
        items_per_page: u64,
    ) -> Self {
        Self {
            policies,
            store,
            state,
            ui,
            pager: Pager::new(items_per_page),
            all: Vec::new(),
        }
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn all(&self) -> &[ScopePolicy] {
        &self.all
    }

    /// The policies on the current page.
    pub fn page(&self) -> &[ScopePolicy] {
        self.pager.slice(&self.all)
    }

    #[tracing::instrument(skip_all)]
    pub async fn load_all(&mut self) -> ActionOutcome {
        match self.policies.list_all().await {
            Ok(policies) => {
                let total = policies.len() as u64;
                self.all = policies;
                self.pager.set_total(total);
                self.pager.step_back_if_past_end();
                self.state.set_policy_count(total).await;
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.ui.sink.error("Error retrieving policies!");
                ActionOutcome::Failed
            }
        }
    }

    /// Pages past the end land on the last page.
    pub fn go_to_page(&mut self, page: u64) {
        self.pager.go_to(page);
        self.pager.clamp_to_last_page();
    }

    #[tracing::instrument(skip_all)]
    pub async fn add(&mut self, policy: ScopePolicy) -> ActionOutcome {
        match self.store.create(&policy).await {
            Ok(created) => {
                let id = created.label();
                self.load_all().await;
                self.ui
                    .sink
                    .success(&format!("Policy {id} successfully added"));
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.ui.sink.error(&failure_message("adding", "policy", &err));
                ActionOutcome::Failed
            }
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn edit(&mut self, policy: ScopePolicy) -> ActionOutcome {
        match self.store.update(&policy).await {
            Ok(updated) => {
                let id = updated.label();
                self.load_all().await;
                self.ui
                    .sink
                    .success(&format!("Policy {id} successfully edited"));
                ActionOutcome::Done
            }
            Err(err) => {
                tracing::error!("{err:?}");
                self.ui.sink.error(&failure_message("editing", "policy", &err));
                ActionOutcome::Failed
            }
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn delete(&mut self, policy: &ScopePolicy) -> ActionOutcome {
        let Some(id) = policy.id() else {
            self.ui.sink.error("Policy has not been saved yet");
            return ActionOutcome::Failed;
        };
        let confirmation = Confirmation {
            header: format!("Delete policy {id}"),
            body: format!("Are you sure you want to delete policy {id}?"),
            action: "Delete policy".into(),
        };
        match self.ui.dialogs.confirm(confirmation).await {
            DialogOutcome::Confirmed(()) => {}
            DialogOutcome::Cancelled => return ActionOutcome::Cancelled,
            DialogOutcome::Failed(reason) => {
                self.ui.sink.error(&reason);
                return ActionOutcome::Failed;
            }
        }

        if let Err(err) = self.store.remove(&id).await {
            tracing::error!("{err:?}");
            self.ui.sink.error(&failure_message("deleting", "policy", &err));
            return ActionOutcome::Failed;
        }
        self.pager.item_removed();
        self.load_all().await;
        self.ui
            .sink
            .success(&format!("Policy {id} has been deleted successfully"));
        ActionOutcome::Done
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
    use gateway::{
        account_api::MockAccountApi, policies_api::MockPoliciesApi, store::MockEntityStore,
        GatewayError, PolicyRule,
    };
    use mockall::{predicate::eq, Sequence};

    fn policy(id: i64) -> ScopePolicy {
        ScopePolicy {
            id: Some(id),
            description: Some(format!("policy {id}")),
            rule: PolicyRule::Deny,
            scopes: vec!["openid".into()],
            ..Default::default()
        }
    }

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(MockAccountApi::new()),
            Arc::new(MockPoliciesApi::new()),
        ))
    }

    #[tokio::test]
    async fn test_pages_locally_and_steps_back_after_delete() {
        let mut seq = Sequence::new();
        let mut policies = MockPoliciesApi::new();
        policies
            .expect_list_all()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok((1..=11).map(policy).collect()));
        policies
            .expect_list_all()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok((1..=10).map(policy).collect()));
        let mut store = MockEntityStore::<ScopePolicy>::new();
        store
            .expect_remove()
            .with(eq(11))
            .times(1)
            .returning(|_| Ok(()));
        let state = state();
        let (ui, sink) = permissive_ui();
        let mut controller =
            PolicyController::new(Arc::new(policies), Arc::new(store), state.clone(), ui, 10);

        assert_eq!(controller.load_all().await, ActionOutcome::Done);
        controller.go_to_page(2);
        assert_eq!(controller.page().len(), 1);
        assert_eq!(state.counts().await.policies, 11);

        let last = controller.page()[0].clone();
        assert_eq!(controller.delete(&last).await, ActionOutcome::Done);
        assert_eq!(controller.pager().current_page(), 1);
        assert_eq!(controller.page().len(), 10);
        assert_eq!(state.counts().await.policies, 10);
        assert_eq!(
            sink.successes(),
            vec!["Policy 11 has been deleted successfully"]
        );
    }

    #[tokio::test]
    async fn test_page_past_the_end_shows_last_page() {
        let mut policies = MockPoliciesApi::new();
        policies
            .expect_list_all()
            .times(1)
            .returning(|| Ok((1..=15).map(policy).collect()));
        let (ui, _sink) = permissive_ui();
        let mut controller = PolicyController::new(
            Arc::new(policies),
            Arc::new(MockEntityStore::<ScopePolicy>::new()),
            state(),
            ui,
            10,
        );

        assert_eq!(controller.load_all().await, ActionOutcome::Done);
        controller.go_to_page(99);
        assert_eq!(controller.pager().current_page(), 2);
        assert_eq!(controller.page().len(), 5);
        assert_eq!(controller.page()[0].id, Some(11));

        controller.go_to_page(u64::MAX);
        assert_eq!(controller.pager().current_page(), 2);
    }

    #[tokio::test]
    async fn test_add_reports_new_id() {
        let mut policies = MockPoliciesApi::new();
        policies
            .expect_list_all()
            .returning(|| Ok(vec![policy(7)]));
        let mut store = MockEntityStore::<ScopePolicy>::new();
        store
            .expect_create()
            .withf(|p| p.id.is_none() && p.scopes == vec!["openid", "profile"])
            .times(1)
            .returning(|p| {
                let mut created = p.clone();
                created.id = Some(7);
                Ok(created)
            });
        let (ui, sink) = permissive_ui();
        let mut controller =
            PolicyController::new(Arc::new(policies), Arc::new(store), state(), ui, 10);

        let draft = ScopePolicy {
            scopes: ScopePolicy::parse_scopes("openid, profile"),
            ..Default::default()
        };
        assert_eq!(controller.add(draft).await, ActionOutcome::Done);
        assert_eq!(sink.successes(), vec!["Policy 7 successfully added"]);
        assert_eq!(controller.all().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_failure_uses_server_message() {
        let mut store = MockEntityStore::<ScopePolicy>::new();
        store.expect_update().returning(|_| {
            Err(GatewayError::Status {
                status: 400,
                status_text: Some("Bad Request".into()),
                body: None,
            })
        });
        let (ui, sink) = permissive_ui();
        let mut controller = PolicyController::new(
            Arc::new(MockPoliciesApi::new()),
            Arc::new(store),
            state(),
            ui,
            10,
        );

        assert_eq!(controller.edit(policy(3)).await, ActionOutcome::Failed);
        assert_eq!(sink.errors(), vec!["Error editing policy: Bad Request"]);
    }

    #[tokio::test]
    async fn test_cancelled_delete_is_silent() {
        let mut dialogs = MockDialogManager::new();
        dialogs
            .expect_confirm()
            .returning(|_| DialogOutcome::Cancelled);
        let (ui, sink) = ui(dialogs, MockNavigator::new());
        let mut store = MockEntityStore::<ScopePolicy>::new();
        store.expect_remove().never();
        let mut controller = PolicyController::new(
            Arc::new(MockPoliciesApi::new()),
            Arc::new(store),
            state(),
            ui,
            10,
        );

        assert_eq!(controller.delete(&policy(1)).await, ActionOutcome::Cancelled);
        assert!(sink.all().is_empty());
    }
}
