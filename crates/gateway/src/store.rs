/*
    Generic persistence and paging seams used by the edit and list controllers.
    Each backend collection implements them for `IamHttpClient`.
*/

use async_trait::async_trait;
use reqwest::Method;
use urlencoding::encode;

use crate::{
    data_model::{Entity, ListResponse, RegisteredClient, ScimUser, ScopePolicy, SearchFilter},
    GatewayError, GatewayResult, IamHttpClient,
};

#[mockall::automock]
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    async fn fetch(&self, id: &E::Id) -> GatewayResult<E>;
    async fn create(&self, entity: &E) -> GatewayResult<E>;
    async fn update(&self, entity: &E) -> GatewayResult<E>;
    async fn remove(&self, id: &E::Id) -> GatewayResult<()>;
}

/// `start_index` is 1-based, as SCIM has it.
#[mockall::automock]
#[async_trait]
pub trait PageSource<E: Entity>: Send + Sync {
    async fn list(&self, start_index: u64, count: u64) -> GatewayResult<ListResponse<E>>;
    async fn search(
        &self,
        filter: &SearchFilter,
        start_index: u64,
        count: u64,
    ) -> GatewayResult<ListResponse<E>>;
}

fn require_id<E: Entity>(entity: &E) -> GatewayResult<E::Id> {
    entity
        .id()
        .ok_or_else(|| GatewayError::InvalidUrl(format!("{} has no identifier yet", E::KIND)))
}

#[async_trait]
impl EntityStore<RegisteredClient> for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn fetch(&self, id: &String) -> GatewayResult<RegisteredClient> {
        self.json(self.request(Method::GET, &format!("/iam/api/clients/{}", encode(id))))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn create(&self, entity: &RegisteredClient) -> GatewayResult<RegisteredClient> {
        self.json(self.request(Method::POST, "/iam/api/clients").json(entity))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn update(&self, entity: &RegisteredClient) -> GatewayResult<RegisteredClient> {
        let id = require_id(entity)?;
        self.json(
            self.request(Method::PUT, &format!("/iam/api/clients/{}", encode(&id)))
                .json(entity),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn remove(&self, id: &String) -> GatewayResult<()> {
        self.empty(self.request(Method::DELETE, &format!("/iam/api/clients/{}", encode(id))))
            .await
    }
}

#[async_trait]
impl PageSource<RegisteredClient> for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn list(
        &self,
        start_index: u64,
        count: u64,
    ) -> GatewayResult<ListResponse<RegisteredClient>> {
        self.json(
            self.request(Method::GET, "/iam/api/clients")
                .query(&[("startIndex", start_index), ("count", count)]),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn search(
        &self,
        filter: &SearchFilter,
        start_index: u64,
        count: u64,
    ) -> GatewayResult<ListResponse<RegisteredClient>> {
        let (start_index, count) = (start_index.to_string(), count.to_string());
        self.json(self.request(Method::GET, "/iam/api/search/clients").query(&[
            ("searchType", filter.field.as_str()),
            ("search", filter.value.as_str()),
            ("startIndex", start_index.as_str()),
            ("count", count.as_str()),
        ]))
        .await
    }
}

/// The self-service face of the clients API: clients the caller registered dynamically.
#[derive(Clone, Debug)]
pub struct ClientRegistration(pub IamHttpClient);

#[async_trait]
impl EntityStore<RegisteredClient> for ClientRegistration {
    #[tracing::instrument(skip_all, err)]
    async fn fetch(&self, id: &String) -> GatewayResult<RegisteredClient> {
        self.0
            .json(
                self.0
                    .request(Method::GET, &format!("/iam/api/client-registration/{}", encode(id))),
            )
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn create(&self, entity: &RegisteredClient) -> GatewayResult<RegisteredClient> {
        self.0
            .json(
                self.0
                    .request(Method::POST, "/iam/api/client-registration")
                    .json(entity),
            )
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn update(&self, entity: &RegisteredClient) -> GatewayResult<RegisteredClient> {
        let id = require_id(entity)?;
        self.0
            .json(
                self.0
                    .request(Method::PUT, &format!("/iam/api/client-registration/{}", encode(&id)))
                    .json(entity),
            )
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn remove(&self, id: &String) -> GatewayResult<()> {
        let path = format!("/iam/api/client-registration/{}", encode(id));
        self.0.empty(self.0.request(Method::DELETE, &path)).await
    }
}

#[async_trait]
impl EntityStore<ScopePolicy> for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn fetch(&self, id: &i64) -> GatewayResult<ScopePolicy> {
        self.json(self.request(Method::GET, &format!("/iam/scope_policies/{id}")))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn create(&self, entity: &ScopePolicy) -> GatewayResult<ScopePolicy> {
        self.json(self.request(Method::POST, "/iam/scope_policies").json(entity))
            .await
    }

    /// The policy endpoint answers an update without a body, so the stored policy is read back.
    #[tracing::instrument(skip_all, err)]
    async fn update(&self, entity: &ScopePolicy) -> GatewayResult<ScopePolicy> {
        let id = require_id(entity)?;
        self.empty(
            self.request(Method::PUT, &format!("/iam/scope_policies/{id}"))
                .json(entity),
        )
        .await?;
        EntityStore::<ScopePolicy>::fetch(self, &id).await
    }

    #[tracing::instrument(skip_all, err)]
    async fn remove(&self, id: &i64) -> GatewayResult<()> {
        self.empty(self.request(Method::DELETE, &format!("/iam/scope_policies/{id}")))
            .await
    }
}

#[async_trait]
impl EntityStore<ScimUser> for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn fetch(&self, id: &String) -> GatewayResult<ScimUser> {
        self.json(self.request(Method::GET, &format!("/iam/account/{}", encode(id))))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn create(&self, entity: &ScimUser) -> GatewayResult<ScimUser> {
        self.json(self.request(Method::POST, "/scim/Users").json(entity))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn update(&self, entity: &ScimUser) -> GatewayResult<ScimUser> {
        let id = require_id(entity)?;
        self.json(
            self.request(Method::PUT, &format!("/iam/account/{}", encode(&id)))
                .json(entity),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn remove(&self, id: &String) -> GatewayResult<()> {
        self.empty(self.request(Method::DELETE, &format!("/iam/account/{}", encode(id))))
            .await
    }
}

#[async_trait]
impl PageSource<ScimUser> for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn list(&self, start_index: u64, count: u64) -> GatewayResult<ListResponse<ScimUser>> {
        self.json(
            self.request(Method::GET, "/iam/account/search")
                .query(&[("startIndex", start_index), ("count", count)]),
        )
        .await
    }

    /// Account search only knows a free text filter; the field is ignored.
    #[tracing::instrument(skip_all, err)]
    async fn search(
        &self,
        filter: &SearchFilter,
        start_index: u64,
        count: u64,
    ) -> GatewayResult<ListResponse<ScimUser>> {
        let (start_index, count) = (start_index.to_string(), count.to_string());
        self.json(self.request(Method::GET, "/iam/account/search").query(&[
            ("filter", filter.value.as_str()),
            ("startIndex", start_index.as_str()),
            ("count", count.as_str()),
        ]))
        .await
    }
}
