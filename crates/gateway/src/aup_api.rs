use async_trait::async_trait;
use reqwest::Method;
use urlencoding::encode;

use crate::{data_model::AupSignature, GatewayResult, IamHttpClient};

#[mockall::automock]
#[async_trait]
pub trait AupApi: Send + Sync {
    /// None when the account never signed, which the server reports as a 404.
    async fn signature_for(&self, account_id: &str) -> GatewayResult<Option<AupSignature>>;
    /// Signs (or re-signs) the AUP as the calling user.
    async fn sign(&self) -> GatewayResult<()>;
    async fn sign_on_behalf(&self, account_id: &str) -> GatewayResult<()>;
    /// Removing the signature forces the user to sign again at next login.
    async fn delete_signature(&self, account_id: &str) -> GatewayResult<()>;
}

#[async_trait]
impl AupApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn signature_for(&self, account_id: &str) -> GatewayResult<Option<AupSignature>> {
        match self
            .json(self.request(Method::GET, &format!("/iam/aup/signature/{}", encode(account_id))))
            .await
        {
            Ok(signature) => Ok(Some(signature)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[tracing::instrument(skip_all, err)]
    async fn sign(&self) -> GatewayResult<()> {
        self.empty(self.request(Method::POST, "/iam/aup/signature"))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn sign_on_behalf(&self, account_id: &str) -> GatewayResult<()> {
        let path = format!("/iam/aup/signature/{}", encode(account_id));
        self.empty(self.request(Method::PATCH, &path))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn delete_signature(&self, account_id: &str) -> GatewayResult<()> {
        let path = format!("/iam/aup/signature/{}", encode(account_id));
        self.empty(self.request(Method::DELETE, &path))
            .await
    }
}
