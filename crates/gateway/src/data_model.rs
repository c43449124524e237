use std::fmt::{self, Debug, Display};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const INDIGO_USER_SCHEMA: &str = "urn:indigo-dc:scim:schemas:IndigoUser";
pub const SCIM_PATCH_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// A backend document the dashboard can load, edit and save.
pub trait Entity: Clone + Debug + PartialEq + Send + Sync + 'static {
    type Id: Clone + Debug + Display + PartialEq + Send + Sync + 'static;

    /// Lower case noun used in messages, i.e "client".
    const KIND: &'static str;
    const PLURAL: &'static str;

    /// None until the server has assigned one.
    fn id(&self) -> Option<Self::Id>;

    /// Detaches a credential the server only hands out once.
    fn take_one_time_secret(&mut self) -> Option<OneTimeSecret> {
        None
    }

    fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// What a person would call this entity in a sentence.
    fn label(&self) -> String {
        self.id().map(|id| id.to_string()).unwrap_or_default()
    }
}

/// A credential shown to the user once and then forgotten.
/// Deliberately not `Serialize`; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeSecret(String);

impl OneTimeSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for OneTimeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeSecret(****)")
    }
}

/// The backend serializes dates either as epoch millis or as ISO-8601 strings,
/// depending on the endpoint.
pub mod flexible_timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .map(|date| date.with_timezone(&Utc))
            .ok()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Millis(millis)) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp {millis} out of range"))),
            Some(Raw::Text(text)) => parse(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("unrecognised date {text:?}"))),
        }
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// The page envelope shared by SCIM and IAM search endpoints.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub items_per_page: Option<u64>,
    #[serde(default)]
    pub start_index: Option<u64>,
    #[serde(rename = "Resources", default = "Vec::new")]
    pub resources: Vec<T>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchFilter {
    pub field: String,
    pub value: String,
}

impl SearchFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Space separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(
        default,
        with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_changed_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_changed_by: Option<String>,
    #[serde(default)]
    pub dynamically_registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_access_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegisteredClient {
    pub fn display_name(&self) -> &str {
        self.client_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.client_id.as_deref())
            .unwrap_or("unnamed client")
    }
}

impl Entity for RegisteredClient {
    type Id = String;
    const KIND: &'static str = "client";
    const PLURAL: &'static str = "clients";

    fn label(&self) -> String {
        self.display_name().to_owned()
    }

    fn id(&self) -> Option<String> {
        self.client_id.clone().filter(|id| !id.is_empty())
    }

    fn take_one_time_secret(&mut self) -> Option<OneTimeSecret> {
        self.client_secret
            .take()
            .filter(|secret| !secret.is_empty())
            .map(OneTimeSecret::new)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyRule {
    #[default]
    Permit,
    Deny,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchingPolicy {
    #[default]
    Eq,
    Regexp,
    Path,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rule: PolicyRule,
    #[serde(default)]
    pub matching_policy: MatchingPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<PolicySubject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<PolicySubject>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScopePolicy {
    /// Scopes as typed in a form: comma separated, blanks dropped.
    pub fn parse_scopes(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|scope| !scope.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Entity for ScopePolicy {
    type Id = i64;
    const KIND: &'static str = "policy";
    const PLURAL: &'static str = "policies";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    #[serde(
        default,
        with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Certificate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_dn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_dn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pem_encoded_certificate: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub has_proxy_certificate: bool,
    #[serde(
        default,
        with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndigoUser {
    #[serde(default)]
    pub certificates: Vec<X509Certificate>,
    #[serde(default)]
    pub service_account: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ScimName>,
    #[serde(default)]
    pub emails: Vec<ScimEmail>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub groups: Vec<GroupRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScimMeta>,
    #[serde(
        rename = "urn:indigo-dc:scim:schemas:IndigoUser",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub indigo: Option<IndigoUser>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScimUser {
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .and_then(|name| name.formatted.as_deref())
            .or(self.user_name.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("unknown user")
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|email| email.primary)
            .or(self.emails.first())
            .map(|email| email.value.as_str())
    }

    pub fn certificates(&self) -> &[X509Certificate] {
        self.indigo
            .as_ref()
            .map(|indigo| indigo.certificates.as_slice())
            .unwrap_or_default()
    }

    pub fn is_service_account(&self) -> bool {
        self.indigo
            .as_ref()
            .map(|indigo| indigo.service_account)
            .unwrap_or(false)
    }
}

impl Entity for ScimUser {
    type Id = String;
    const KIND: &'static str = "account";
    const PLURAL: &'static str = "accounts";

    fn label(&self) -> String {
        self.display_name().to_owned()
    }

    fn id(&self) -> Option<String> {
        self.id.clone().filter(|id| !id.is_empty())
    }
}

/// The short account view returned by lookups such as `find/byuuid`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AccountSummary {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    Admin,
    Reader,
}

impl Authority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ROLE_ADMIN",
            Self::Reader => "ROLE_READER",
        }
    }
}

impl Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Authorities {
    #[serde(default)]
    pub authorities: Vec<String>,
}

impl Authorities {
    pub fn has(&self, authority: Authority) -> bool {
        self.authorities.iter().any(|a| a == authority.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AupInfo {
    #[serde(default)]
    pub signature_validity_in_days: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AupSignature {
    #[serde(default, with = "flexible_timestamp")]
    pub signature_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub aup: Option<AupInfo>,
    #[serde(default)]
    pub account: Option<AccountSummary>,
}

impl AupSignature {
    /// None when the AUP never expires (validity of zero days) or nothing is known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let days = self.aup.as_ref()?.signature_validity_in_days;
        if days == 0 {
            return None;
        }
        self.signature_time
            .and_then(|signed| signed.checked_add_signed(Duration::days(days)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaSettings {
    #[serde(default)]
    pub authenticator_app_active: bool,
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaSecret {
    pub secret: String,
    #[serde(default)]
    pub data_uri: Option<String>,
}

impl Debug for MfaSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MfaSecret")
            .field("secret", &"****")
            .field("data_uri", &self.data_uri.as_ref().map(|_| "****"))
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertLinkStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertLinkRequest {
    pub uuid: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_uuid: Option<String>,
    #[serde(default)]
    pub user_full_name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub subject_dn: Option<String>,
    #[serde(default)]
    pub issuer_dn: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<CertLinkStatus>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(rename = "creation_time", default, with = "flexible_timestamp")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(rename = "last_update_time", default, with = "flexible_timestamp")]
    pub last_update_time: Option<DateTime<Utc>>,
}

/// Query for `/iam/cert_link_requests`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertLinkQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CertLinkStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u64>,
}

/// A certificate as entered by a user: either the PEM itself or its DNs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSubmission {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pem_encoded_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProxyCertificate {
    pub certificate_chain: String,
}

/// `{"schemas": [...PatchOp], "operations": [...]}` as accepted by `/scim/Users/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScimPatch {
    pub schemas: Vec<&'static str>,
    pub operations: Vec<ScimPatchOperation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScimPatchOperation {
    pub op: &'static str,
    pub value: Value,
}

impl ScimPatch {
    pub fn replace_indigo(value: Value) -> Self {
        let mut extension = Map::new();
        extension.insert(INDIGO_USER_SCHEMA.to_owned(), value);
        Self {
            schemas: vec![SCIM_PATCH_SCHEMA],
            operations: vec![ScimPatchOperation {
                op: "replace",
                value: Value::Object(extension),
            }],
        }
    }
}
