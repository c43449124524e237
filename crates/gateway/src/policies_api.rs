use async_trait::async_trait;
use reqwest::Method;

use crate::{data_model::ScopePolicy, GatewayResult, IamHttpClient};

/// The policy collection is small and unpaginated on the server side.
#[mockall::automock]
#[async_trait]
pub trait PoliciesApi: Send + Sync {
    async fn list_all(&self) -> GatewayResult<Vec<ScopePolicy>>;
}

#[async_trait]
impl PoliciesApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn list_all(&self) -> GatewayResult<Vec<ScopePolicy>> {
        self.json(self.request(Method::GET, "/iam/scope_policies"))
            .await
    }
}
