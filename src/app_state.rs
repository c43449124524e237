use std::sync::Arc;

use gateway::{account_api::AccountApi, policies_api::PoliciesApi, GatewayResult};
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub users: u64,
    pub groups: u64,
    pub policies: u64,
}

/// Dashboard wide counters. Only `refresh` and `refresh_policies` write them.
pub struct AppState {
    counts: RwLock<Counts>,
    accounts: Arc<dyn AccountApi>,
    policies: Arc<dyn PoliciesApi>,
}

impl AppState {
    pub fn new(accounts: Arc<dyn AccountApi>, policies: Arc<dyn PoliciesApi>) -> Self {
        Self {
            counts: RwLock::new(Counts::default()),
            accounts,
            policies,
        }
    }

    pub async fn counts(&self) -> Counts {
        *self.counts.read().await
    }

    /// Recomputes every counter. On failure the previous values stay.
    #[tracing::instrument(skip_all, err)]
    pub async fn refresh(&self) -> GatewayResult<Counts> {
        let (users, groups, policies) = tokio::try_join!(
            self.accounts.user_count(),
            self.accounts.group_count(),
            self.policies.list_all(),
        )?;
        let counts = Counts {
            users,
            groups,
            policies: policies.len() as u64,
        };
        *self.counts.write().await = counts;
        Ok(counts)
    }

    pub(crate) async fn set_policy_count(&self, policies: u64) {
        self.counts.write().await.policies = policies;
    }

    #[tracing::instrument(skip_all, err)]
    pub async fn refresh_policies(&self) -> GatewayResult<u64> {
        let policies = self.policies.list_all().await?.len() as u64;
        self.set_policy_count(policies).await;
        Ok(policies)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use gateway::{
        account_api::MockAccountApi, policies_api::MockPoliciesApi, GatewayError, ScopePolicy,
    };

    #[tokio::test]
    async fn test_refresh_counts() {
        let mut accounts = MockAccountApi::new();
        accounts.expect_user_count().returning(|| Ok(12));
        accounts.expect_group_count().returning(|| Ok(3));
        let mut policies = MockPoliciesApi::new();
        policies
            .expect_list_all()
            .returning(|| Ok(vec![ScopePolicy::default(), ScopePolicy::default()]));

        let state = AppState::new(Arc::new(accounts), Arc::new(policies));
        let counts = state.refresh().await.unwrap();
        assert_eq!(
            counts,
            Counts {
                users: 12,
                groups: 3,
                policies: 2
            }
        );
        assert_eq!(state.counts().await, counts);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_counts() {
        let mut accounts = MockAccountApi::new();
        accounts.expect_user_count().returning(|| Ok(1));
        accounts
            .expect_group_count()
            .returning(|| Err(GatewayError::Transport("connection refused".into())));
        let mut policies = MockPoliciesApi::new();
        policies.expect_list_all().returning(|| Ok(vec![]));

        let state = AppState::new(Arc::new(accounts), Arc::new(policies));
        state.set_policy_count(4).await;
        assert!(state.refresh().await.is_err());
        assert_eq!(state.counts().await.policies, 4);
    }
}
