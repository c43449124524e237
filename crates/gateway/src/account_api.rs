use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use urlencoding::encode;

use crate::{
    data_model::{AccountSummary, Authorities, Authority, ListResponse, ScimPatch},
    GatewayResult, IamHttpClient,
};

#[mockall::automock]
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn authorities(&self, account_id: &str) -> GatewayResult<Authorities>;
    async fn grant_authority(&self, account_id: &str, authority: Authority) -> GatewayResult<()>;
    async fn revoke_authority(&self, account_id: &str, authority: Authority)
        -> GatewayResult<()>;
    async fn find_by_uuid(&self, uuid: &str) -> GatewayResult<AccountSummary>;
    async fn set_service_account(&self, account_id: &str, enabled: bool) -> GatewayResult<()>;
    async fn remove_from_group(&self, account_id: &str, group_id: &str) -> GatewayResult<()>;
    /// Removes the calling user from a group.
    async fn leave_group(&self, group_id: &str) -> GatewayResult<()>;
    async fn user_count(&self) -> GatewayResult<u64>;
    async fn group_count(&self) -> GatewayResult<u64>;
}

#[async_trait]
impl AccountApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn authorities(&self, account_id: &str) -> GatewayResult<Authorities> {
        let path = format!("/iam/account/{}/authorities", encode(account_id));
        self.json(self.request(Method::GET, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn grant_authority(&self, account_id: &str, authority: Authority) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, &format!("/iam/account/{}/authorities", encode(account_id)))
                .query(&[("authority", authority.as_str())]),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn revoke_authority(
        &self,
        account_id: &str,
        authority: Authority,
    ) -> GatewayResult<()> {
        let path = format!("/iam/account/{}/authorities", encode(account_id));
        self.empty(
            self.request(Method::DELETE, &path)
                .query(&[("authority", authority.as_str())]),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn find_by_uuid(&self, uuid: &str) -> GatewayResult<AccountSummary> {
        self.json(self.request(Method::GET, &format!("/iam/account/find/byuuid/{}", encode(uuid))))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn set_service_account(&self, account_id: &str, enabled: bool) -> GatewayResult<()> {
        let patch = ScimPatch::replace_indigo(json!({ "serviceAccount": enabled }));
        self.empty(
            self.request(Method::PATCH, &format!("/scim/Users/{}", encode(account_id)))
                .json(&patch),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn remove_from_group(&self, account_id: &str, group_id: &str) -> GatewayResult<()> {
        self.empty(self.request(
            Method::DELETE,
            &format!("/iam/account/{}/groups/{}", encode(account_id), encode(group_id)),
        ))
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn leave_group(&self, group_id: &str) -> GatewayResult<()> {
        let path = format!("/iam/account/me/groups/{}", encode(group_id));
        self.empty(self.request(Method::DELETE, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn user_count(&self) -> GatewayResult<u64> {
        let page: ListResponse<serde_json::Value> = self
            .json(
                self.request(Method::GET, "/iam/account/search")
                    .query(&[("count", 0)]),
            )
            .await?;
        Ok(page.total_results)
    }

    #[tracing::instrument(skip_all, err)]
    async fn group_count(&self) -> GatewayResult<u64> {
        let page: ListResponse<serde_json::Value> = self
            .json(
                self.request(Method::GET, "/iam/group/search")
                    .query(&[("count", 0)]),
            )
            .await?;
        Ok(page.total_results)
    }
}
