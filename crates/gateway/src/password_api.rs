use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use crate::{GatewayResult, IamHttpClient};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordReset<'a> {
    updated_password: &'a str,
    token: &'a str,
}

#[mockall::automock]
#[async_trait]
pub trait PasswordApi: Send + Sync {
    /// Mails a reset link. The backend answers the same whether or not the address is known.
    async fn forgot(&self, email: &str) -> GatewayResult<()>;
    async fn reset(&self, token: &str, new_password: &str) -> GatewayResult<()>;
    async fn change(&self, current_password: &str, new_password: &str) -> GatewayResult<()>;
}

#[async_trait]
impl PasswordApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn forgot(&self, email: &str) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, "/iam/password-reset/token")
                .form(&[("email", email)]),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn reset(&self, token: &str, new_password: &str) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, "/iam/password-reset")
                .json(&PasswordReset {
                    updated_password: new_password,
                    token,
                }),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn change(&self, current_password: &str, new_password: &str) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, "/iam/password-update")
                .form(&[
                    ("currentPassword", current_password),
                    ("updatedPassword", new_password),
                ]),
        )
        .await
    }
}
