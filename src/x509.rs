use std::sync::Arc;

use futures::future::try_join_all;
use gateway::{
    x509_api::{CertLinkApi, X509Api},
    CertLinkQuery, CertLinkRequest, CertLinkStatus, CertificateSubmission, GatewayResult,
    ProxyCertificate, X509Certificate,
};

use crate::{
    dialog::{Confirmation, DialogOutcome, InputRequest},
    validation::{self, ValidationError},
    ActionOutcome, Ui,
};

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}

/// A certificate is identified either by its PEM or by both of its DNs.
pub fn check_submission(submission: &CertificateSubmission) -> Result<(), ValidationError> {
    validation::required("Label", &submission.label)?;
    if present(&submission.pem_encoded_certificate)
        || (present(&submission.subject_dn) && present(&submission.issuer_dn))
    {
        Ok(())
    } else {
        Err(ValidationError::CertificateIncomplete)
    }
}

/// Every pending request of `username`. The first page tells how many more to ask for;
/// the rest are fetched together.
#[tracing::instrument(skip(links))]
pub async fn pending_requests(
    links: &dyn CertLinkApi,
    username: &str,
) -> GatewayResult<Vec<CertLinkRequest>> {
    let query = |start_index: u64| CertLinkQuery {
        username: Some(username.to_owned()),
        status: Some(CertLinkStatus::Pending),
        start_index: Some(start_index),
    };
    let first = links.page(&query(1)).await?;
    let per_page = first
        .items_per_page
        .unwrap_or(first.resources.len() as u64);
    let mut requests = first.resources;
    if per_page == 0 {
        return Ok(requests);
    }

    let pages = first.total_results.div_ceil(per_page);
    let queries: Vec<CertLinkQuery> = (1..pages).map(|i| query(i * per_page + 1)).collect();
    let rest = try_join_all(queries.iter().map(|query| links.page(query))).await?;
    for page in rest {
        requests.extend(page.resources);
    }
    tracing::debug!(pages, found = requests.len(), "aggregated");
    Ok(requests)
}

/// Certificates on accounts and the requests users make to have one linked.
pub struct X509Controller {
    certificates: Arc<dyn X509Api>,
    links: Arc<dyn CertLinkApi>,
    ui: Ui,
}

impl X509Controller {
    pub fn new(certificates: Arc<dyn X509Api>, links: Arc<dyn CertLinkApi>, ui: Ui) -> Self {
        Self {
            certificates,
            links,
            ui,
        }
    }

    fn invalid(&self, err: ValidationError) -> ActionOutcome {
        self.ui.sink.error(&err.to_string());
        ActionOutcome::Failed
    }

    #[tracing::instrument(skip_all, fields(account = account_id))]
    pub async fn add_certificate(
        &self,
        account_id: &str,
        submission: &CertificateSubmission,
    ) -> ActionOutcome {
        if let Err(err) = check_submission(submission) {
            return self.invalid(err);
        }
        if let Err(err) = self
            .certificates
            .add_certificate(account_id, submission)
            .await
        {
            return self.ui.report("Error adding certificate", &err);
        }
        self.ui
            .sink
            .success(&format!("Certificate '{}' added", submission.label.trim()));
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all, fields(account = account_id))]
    pub async fn remove_certificate(
        &self,
        account_id: &str,
        certificate: &X509Certificate,
    ) -> ActionOutcome {
        let subject = certificate.subject_dn.as_deref().unwrap_or("unknown subject");
        let confirmation = Confirmation {
            header: "Remove certificate".into(),
            body: format!("Are you sure you want to remove certificate '{subject}'?"),
            action: "Remove certificate".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }
        if let Err(err) = self
            .certificates
            .remove_certificate(account_id, certificate)
            .await
        {
            return self.ui.report("Error removing certificate", &err);
        }
        self.ui.sink.success("Certificate removed");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all)]
    pub async fn add_proxy_certificate(&self, certificate_chain: &str) -> ActionOutcome {
        let certificate_chain = match validation::required("Certificate chain", certificate_chain)
        {
            Ok(chain) => chain,
            Err(err) => return self.invalid(err),
        };
        let proxy = ProxyCertificate {
            certificate_chain: certificate_chain.to_owned(),
        };
        if let Err(err) = self.certificates.add_proxy_certificate(&proxy).await {
            return self
                .ui
                .report("Error adding managed proxy certificate", &err);
        }
        self.ui.sink.success("Managed proxy certificate added");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all)]
    pub async fn unlink_certificate(&self, subject_dn: &str) -> ActionOutcome {
        let confirmation = Confirmation {
            header: "Unlink certificate".into(),
            body: format!("Are you sure you want to unlink certificate '{subject_dn}'?"),
            action: "Unlink certificate".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }
        if let Err(err) = self.certificates.unlink_certificate(subject_dn).await {
            return self.ui.report("Error unlinking certificate", &err);
        }
        self.ui.sink.success("Certificate unlinked");
        ActionOutcome::Done
    }

    /// Notes are required so the administrator knows why the link is asked for.
    #[tracing::instrument(skip_all)]
    pub async fn submit_link_request(&self, submission: &CertificateSubmission) -> ActionOutcome {
        let checked = check_submission(submission)
            .and_then(|()| validation::required("Notes", submission.notes.as_deref().unwrap_or("")));
        if let Err(err) = checked {
            return self.invalid(err);
        }
        if let Err(err) = self.links.submit(submission).await {
            return self
                .ui
                .report("Error submitting certificate linking request", &err);
        }
        self.ui.sink.success("Certificate linking request submitted.");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all, fields(uuid = %request.uuid))]
    pub async fn abort(&self, request: &CertLinkRequest) -> ActionOutcome {
        let confirmation = Confirmation {
            header: "Abort request".into(),
            body: "Are you sure you want to abort this certificate linking request?".into(),
            action: "Abort request".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }
        if let Err(err) = self.links.abort(request.uuid).await {
            return self.ui.report("Error aborting request", &err);
        }
        self.ui.sink.success("Request aborted");
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all, fields(uuid = %request.uuid))]
    pub async fn approve(&self, request: &CertLinkRequest) -> ActionOutcome {
        let who = request.username.as_deref().unwrap_or("unknown user");
        let confirmation = Confirmation {
            header: "Approve request".into(),
            body: format!("Link this certificate to the account of '{who}'?"),
            action: "Approve".into(),
        };
        if let Err(outcome) = self.ui.confirm(confirmation).await {
            return outcome;
        }
        if let Err(err) = self.links.approve(request.uuid).await {
            return self.ui.report("Error approving request", &err);
        }
        self.ui.sink.success(&format!("Request of {who} approved"));
        ActionOutcome::Done
    }

    #[tracing::instrument(skip_all, fields(uuid = %request.uuid))]
    pub async fn reject(&self, request: &CertLinkRequest) -> ActionOutcome {
        let who = request.username.as_deref().unwrap_or("unknown user");
        let input = InputRequest {
            header: "Reject request".into(),
            label: "Motivation".into(),
            min_length: 1,
        };
        let motivation = match self.ui.dialogs.input(input).await {
            DialogOutcome::Confirmed(motivation) => motivation,
            DialogOutcome::Cancelled => return ActionOutcome::Cancelled,
            DialogOutcome::Failed(reason) => {
                self.ui.sink.error(&reason);
                return ActionOutcome::Failed;
            }
        };
        let motivation = match validation::required("Motivation", &motivation) {
            Ok(motivation) => motivation,
            Err(err) => return self.invalid(err),
        };
        if let Err(err) = self.links.reject(request.uuid, motivation).await {
            return self.ui.report("Error rejecting request", &err);
        }
        self.ui.sink.success(&format!("Request of {who} rejected"));
        ActionOutcome::Done
    }

    pub async fn pending_for(&self, username: &str) -> Option<Vec<CertLinkRequest>> {
        match pending_requests(self.links.as_ref(), username).await {
            Ok(requests) => Some(requests),
            Err(err) => {
                self.ui
                    .report("Error retrieving certificate linking requests", &err);
                None
            }
        }
    }
}
