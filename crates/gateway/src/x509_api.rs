use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use crate::{
    data_model::{
        CertLinkQuery, CertLinkRequest, CertificateSubmission, ListResponse, ProxyCertificate,
        X509Certificate,
    },
    GatewayResult, IamHttpClient,
};

/// Certificates attached to accounts.
#[mockall::automock]
#[async_trait]
pub trait X509Api: Send + Sync {
    async fn add_certificate(
        &self,
        account_id: &str,
        certificate: &CertificateSubmission,
    ) -> GatewayResult<()>;
    async fn remove_certificate(
        &self,
        account_id: &str,
        certificate: &X509Certificate,
    ) -> GatewayResult<()>;
    async fn add_proxy_certificate(&self, proxy: &ProxyCertificate) -> GatewayResult<()>;
    /// Unlinks one of the caller's own certificates.
    async fn unlink_certificate(&self, subject_dn: &str) -> GatewayResult<()>;
}

/// Requests from users asking an administrator to link a certificate.
#[mockall::automock]
#[async_trait]
pub trait CertLinkApi: Send + Sync {
    async fn page(&self, query: &CertLinkQuery) -> GatewayResult<ListResponse<CertLinkRequest>>;
    async fn submit(&self, request: &CertificateSubmission) -> GatewayResult<CertLinkRequest>;
    async fn abort(&self, uuid: Uuid) -> GatewayResult<()>;
    async fn approve(&self, uuid: Uuid) -> GatewayResult<()>;
    async fn reject(&self, uuid: Uuid, motivation: &str) -> GatewayResult<()>;
}

#[async_trait]
impl X509Api for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn add_certificate(
        &self,
        account_id: &str,
        certificate: &CertificateSubmission,
    ) -> GatewayResult<()> {
        self.empty(
            self.request(Method::POST, &format!("/scim/Users/{account_id}/certificates"))
                .json(certificate),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn remove_certificate(
        &self,
        account_id: &str,
        certificate: &X509Certificate,
    ) -> GatewayResult<()> {
        let query: Vec<(&str, &str)> = [
            ("subjectDn", certificate.subject_dn.as_deref()),
            ("issuerDn", certificate.issuer_dn.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect();
        self.empty(
            self.request(Method::DELETE, &format!("/scim/Users/{account_id}/certificates"))
                .query(&query),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn add_proxy_certificate(&self, proxy: &ProxyCertificate) -> GatewayResult<()> {
        self.empty(self.request(Method::POST, "/iam/proxycert").json(proxy))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn unlink_certificate(&self, subject_dn: &str) -> GatewayResult<()> {
        self.empty(
            self.request(Method::DELETE, "/iam/account-linking/X509")
                .query(&[("certificateSubject", subject_dn)]),
        )
        .await
    }
}

#[async_trait]
impl CertLinkApi for IamHttpClient {
    #[tracing::instrument(skip_all, err)]
    async fn page(&self, query: &CertLinkQuery) -> GatewayResult<ListResponse<CertLinkRequest>> {
        self.json(self.request(Method::GET, "/iam/cert_link_requests").query(query))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn submit(&self, request: &CertificateSubmission) -> GatewayResult<CertLinkRequest> {
        self.json(
            self.request(Method::POST, "/iam/cert_link_requests")
                .json(request),
        )
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn abort(&self, uuid: Uuid) -> GatewayResult<()> {
        self.empty(self.request(Method::DELETE, &format!("/iam/cert_link_requests/{uuid}")))
            .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn approve(&self, uuid: Uuid) -> GatewayResult<()> {
        self.empty(self.request(
            Method::POST,
            &format!("/iam/cert_link_requests/{uuid}/approve"),
        ))
        .await
    }

    #[tracing::instrument(skip_all, err)]
    async fn reject(&self, uuid: Uuid, motivation: &str) -> GatewayResult<()> {
        self.empty(
            self.request(
                Method::POST,
                &format!("/iam/cert_link_requests/{uuid}/reject"),
            )
            .query(&[("motivation", motivation)]),
        )
        .await
    }
}
