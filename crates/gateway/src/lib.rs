pub mod account_api;
pub mod aup_api;
pub mod clients_api;
pub mod data_model;
pub mod error;
pub mod mfa_api;
pub mod password_api;
pub mod policies_api;
pub mod store;
pub mod x509_api;

use bytes::Bytes;
use reqwest::{
    header::{ACCEPT, USER_AGENT},
    Method, RequestBuilder,
};
use serde::de::DeserializeOwned;

pub use data_model::*;
pub use error::{ErrorBody, GatewayError};

pub type GatewayResult<T> = Result<T, GatewayError>;

pub static CLIENT_USER_AGENT: &str = "iam-dashboard";

/// Talks to the IAM backend over its REST API.
/// Every concern (clients, accounts, MFA...) is a trait implemented for this type.
#[derive(Clone, Debug)]
pub struct IamHttpClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl IamHttpClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, access_token)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            access_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and decodes a JSON body.
    pub(crate) async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> GatewayResult<T> {
        let body = self.execute(builder).await?;
        decode(&body)
    }

    /// Sends the request and discards whatever body came back.
    pub(crate) async fn empty(&self, builder: RequestBuilder) -> GatewayResult<()> {
        self.execute(builder).await.map(|_| ())
    }

    async fn execute(&self, builder: RequestBuilder) -> GatewayResult<Bytes> {
        let response = builder.send().await.map_err(|err| {
            tracing::error!("{err:?}");
            GatewayError::from(err)
        })?;
        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            return Ok(body);
        }
        tracing::debug!(status = status.as_u16(), "request rejected");
        Err(GatewayError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(str::to_owned),
            body: serde_json::from_slice::<ErrorBody>(&body).ok(),
        })
    }
}

/// Like `serde_json::from_slice` but the error names the JSON path that failed.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> GatewayResult<T> {
    let deserializer = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(deserializer)
        .map_err(|err| GatewayError::Decode(err.to_string()))
}
