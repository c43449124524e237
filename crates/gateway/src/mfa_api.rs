use async_trait::async_trait;
use reqwest::Method;
use urlencoding::encode;

use crate::{
    data_model::{MfaSecret, MfaSettings},
    GatewayResult, IamHttpClient,
};

#[mockall::automock]
#[async_trait]
pub trait MfaApi: Send + Sync {
    /// Issues a fresh TOTP secret for the caller. Nothing is active until `enable`.
    async fn add_secret(&self) -> GatewayResult<MfaSecret>;
    async fn enable(&self, code: &str) -> GatewayResult<()>;
    async fn disable(&self, code: &str) -> GatewayResult<()>;
    async fn reset_for(&self, account_id: &str) -> GatewayResult<()>;
    async fn settings(&self, account_id: &str) -> GatewayResult<MfaSettings>;
}

#[async_trait]
impl MfaApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn add_secret(&self) -> GatewayResult<MfaSecret> {
        self.json(self.request(Method::PUT, "/iam/authenticator-app/add-secret"))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn enable(&self, code: &str) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, "/iam/authenticator-app/enable")
                .form(&[("code", code)]),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn disable(&self, code: &str) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, "/iam/authenticator-app/disable")
                .form(&[("code", code)]),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn reset_for(&self, account_id: &str) -> GatewayResult<()> {
        self.empty(self.request(
            Method::DELETE,
            &format!("/iam/authenticator-app/reset/{}", encode(account_id)),
        ))
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn settings(&self, account_id: &str) -> GatewayResult<MfaSettings> {
        self.json(self.request(
            Method::GET,
            &format!("/iam/multi-factor-settings/{}", encode(account_id)),
        ))
        .await
    }
}
