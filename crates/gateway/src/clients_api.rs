use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Method;
use urlencoding::encode;

use crate::{data_model::RegisteredClient, GatewayResult, IamHttpClient};

/// `timeIssued` is sent as local wall clock time without an offset.
pub const TIME_ISSUED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Client operations beyond plain CRUD.
#[mockall::automock]
#[async_trait]
pub trait ClientsApi: Send + Sync {
    /// The returned client carries the new secret in `client_secret`.
    async fn rotate_secret(&self, client_id: &str) -> GatewayResult<RegisteredClient>;
    async fn rotate_registration_access_token(
        &self,
        client_id: &str,
    ) -> GatewayResult<RegisteredClient>;
    async fn enable(&self, client_id: &str) -> GatewayResult<()>;
    async fn disable(&self, client_id: &str) -> GatewayResult<()>;
    async fn revoke_refresh_tokens(&self, client_id: &str) -> GatewayResult<()>;
    /// Only tokens issued before `issued_before` when given.
    async fn revoke_access_tokens(
        &self,
        client_id: &str,
        issued_before: Option<NaiveDateTime>,
    ) -> GatewayResult<()>;
}

#[async_trait]
impl ClientsApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn rotate_secret(&self, client_id: &str) -> GatewayResult<RegisteredClient> {
        let path = format!("/iam/api/clients/{}/secret", encode(client_id));
        self.json(self.request(Method::POST, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn rotate_registration_access_token(
        &self,
        client_id: &str,
    ) -> GatewayResult<RegisteredClient> {
        let path = format!("/iam/api/clients/{}/rat", encode(client_id));
        self.json(self.request(Method::POST, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn enable(&self, client_id: &str) -> GatewayResult<()> {
        let path = format!("/iam/api/clients/{}/enable", encode(client_id));
        self.empty(self.request(Method::PATCH, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn disable(&self, client_id: &str) -> GatewayResult<()> {
        let path = format!("/iam/api/clients/{}/disable", encode(client_id));
        self.empty(self.request(Method::PATCH, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn revoke_refresh_tokens(&self, client_id: &str) -> GatewayResult<()> {
        self.empty(self.request(
            Method::PATCH,
            &format!("/iam/api/clients/{}/revoke-refresh-tokens", encode(client_id)),
        ))
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn revoke_access_tokens(
        &self,
        client_id: &str,
        issued_before: Option<NaiveDateTime>,
    ) -> GatewayResult<()> {
        let mut builder = self.request(
            Method::PATCH,
            &format!("/iam/api/clients/{}/revoke-access-tokens", encode(client_id)),
        );
        if let Some(issued_before) = issued_before {
            builder = builder.query(&[(
                "timeIssued",
                issued_before.format(TIME_ISSUED_FORMAT).to_string(),
            )]);
        }
        self.empty(builder).await
    }
}
