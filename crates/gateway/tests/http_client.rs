use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Form, Json, Router,
};
use chrono::NaiveDate;
use gateway::{
    account_api::AccountApi,
    aup_api::AupApi,
    clients_api::ClientsApi,
    mfa_api::MfaApi,
    password_api::PasswordApi,
    store::{ClientRegistration, EntityStore, PageSource},
    x509_api::CertLinkApi,
    CertLinkQuery, CertLinkStatus, Entity, GatewayError, IamHttpClient, RegisteredClient,
    ScopePolicy, SearchFilter,
};
use serde_json::{json, Value};

type Seen = Arc<Mutex<Vec<String>>>;

async fn serve(router: Router) -> IamHttpClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    IamHttpClient::new(format!("http://{addr}/"), Some("test-token".into()))
}

#[tokio::test]
async fn rotate_secret_posts_to_client_secret_path_with_bearer_token() {
    let router = Router::new().route(
        "/iam/api/clients/:id/secret",
        post(|Path(id): Path<String>, headers: HeaderMap| async move {
            assert_eq!(
                headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
                "Bearer test-token"
            );
            (
                StatusCode::CREATED,
                Json(json!({ "client_id": id, "client_secret": "xyz" })),
            )
        }),
    );
    let client = serve(router).await;

    let mut rotated = client.rotate_secret("abc123").await.unwrap();
    assert_eq!(rotated.client_id.as_deref(), Some("abc123"));
    assert_eq!(rotated.take_one_time_secret().unwrap().expose(), "xyz");
}

#[tokio::test]
async fn list_and_search_clients_use_different_endpoints() {
    let seen: Seen = Default::default();
    let (list_seen, search_seen) = (seen.clone(), seen.clone());
    let router = Router::new()
        .route(
            "/iam/api/clients",
            get(move |Query(query): Query<HashMap<String, String>>| async move {
                list_seen.lock().unwrap().push(format!(
                    "list {} {}",
                    query["startIndex"], query["count"]
                ));
                Json(json!({
                    "totalResults": 11,
                    "itemsPerPage": 10,
                    "startIndex": 11,
                    "Resources": [{ "client_id": "c11", "client_name": "eleventh" }]
                }))
            }),
        )
        .route(
            "/iam/api/search/clients",
            get(move |Query(query): Query<HashMap<String, String>>| async move {
                search_seen.lock().unwrap().push(format!(
                    "search {}={} {} {}",
                    query["searchType"], query["search"], query["startIndex"], query["count"]
                ));
                Json(json!({ "totalResults": 0, "Resources": [] }))
            }),
        );
    let client = serve(router).await;

    let page = PageSource::<RegisteredClient>::list(&client, 11, 10)
        .await
        .unwrap();
    assert_eq!(page.total_results, 11);
    assert_eq!(page.resources[0].display_name(), "eleventh");

    let filter = SearchFilter::new("name", "eleventh");
    let page = PageSource::<RegisteredClient>::search(&client, &filter, 1, 10)
        .await
        .unwrap();
    assert!(page.resources.is_empty());

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["list 11 10", "search name=eleventh 1 10"]
    );
}

#[tokio::test]
async fn error_bodies_are_parsed_into_messages() {
    let router = Router::new()
        .route(
            "/iam/api/clients",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_client_metadata", "detail": "ignored" })),
                )
            }),
        )
        .route(
            "/iam/api/clients/:id",
            put(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
    let client = serve(router).await;

    let err = EntityStore::<RegisteredClient>::create(&client, &RegisteredClient::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.message().as_deref(), Some("invalid_client_metadata"));

    let existing = RegisteredClient {
        client_id: Some("abc123".into()),
        ..Default::default()
    };
    let err = EntityStore::<RegisteredClient>::update(&client, &existing)
        .await
        .unwrap_err();
    assert_eq!(err.describe("Error saving client!"), "Service Unavailable");
}

#[tokio::test]
async fn update_without_identifier_never_reaches_the_server() {
    let client = serve(Router::new()).await;
    let err = EntityStore::<RegisteredClient>::update(&client, &RegisteredClient::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidUrl(_)));
}

#[tokio::test]
async fn policy_update_reads_the_policy_back() {
    let stored: Arc<Mutex<Value>> = Arc::new(Mutex::new(json!({ "id": 4, "scopes": [] })));
    let (put_stored, get_stored) = (stored.clone(), stored.clone());
    let router = Router::new().route(
        "/iam/scope_policies/:id",
        put(move |Json(body): Json<Value>| async move {
            *put_stored.lock().unwrap() = body;
            StatusCode::NO_CONTENT
        })
        .get(move || async move { Json(get_stored.lock().unwrap().clone()) }),
    );
    let client = serve(router).await;

    let policy = ScopePolicy {
        id: Some(4),
        description: Some("deny admin scopes".into()),
        scopes: vec!["iam:admin.write".into()],
        ..Default::default()
    };
    let saved = EntityStore::<ScopePolicy>::update(&client, &policy)
        .await
        .unwrap();
    assert_eq!(saved, policy);
    assert_eq!(stored.lock().unwrap()["rule"], "PERMIT");
}

#[tokio::test]
async fn revoke_access_tokens_sends_time_issued() {
    let seen: Seen = Default::default();
    let inner = seen.clone();
    let router = Router::new().route(
        "/iam/api/clients/:id/revoke-access-tokens",
        patch(
            move |Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                inner.lock().unwrap().push(format!(
                    "{id} {}",
                    query.get("timeIssued").cloned().unwrap_or_default()
                ));
                StatusCode::NO_CONTENT
            },
        ),
    );
    let client = serve(router).await;

    let before = NaiveDate::from_ymd_opt(2024, 5, 2)
        .unwrap()
        .and_hms_opt(13, 4, 5)
        .unwrap();
    client
        .revoke_access_tokens("abc123", Some(before))
        .await
        .unwrap();
    client.revoke_access_tokens("abc123", None).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["abc123 2024-05-02T13:04:05", "abc123 "]
    );
}

#[tokio::test]
async fn mfa_codes_are_form_encoded() {
    let seen: Seen = Default::default();
    let inner = seen.clone();
    let router = Router::new()
        .route(
            "/iam/authenticator-app/add-secret",
            put(|| async { Json(json!({ "secret": "JBSWY3DP", "dataUri": "data:image/png;base64,AA==" })) }),
        )
        .route(
            "/iam/authenticator-app/enable",
            post(move |Form(form): Form<HashMap<String, String>>| async move {
                inner.lock().unwrap().push(form["code"].clone());
                StatusCode::OK
            }),
        );
    let client = serve(router).await;

    let secret = client.add_secret().await.unwrap();
    assert_eq!(secret.secret, "JBSWY3DP");
    assert!(!format!("{secret:?}").contains("JBSWY3DP"));
    MfaApi::enable(&client, "123456").await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["123456"]);
}

#[tokio::test]
async fn missing_aup_signature_is_none() {
    let router = Router::new().route(
        "/iam/aup/signature/:id",
        get(|Path(id): Path<String>| async move {
            if id == "signed" {
                Json(json!({
                    "signatureTime": 1_700_000_000_000i64,
                    "aup": { "signatureValidityInDays": 365 }
                }))
                .into_response()
            } else {
                StatusCode::NOT_FOUND.into_response()
            }
        }),
    );
    let client = serve(router).await;

    assert!(client.signature_for("unsigned").await.unwrap().is_none());
    let signature = client.signature_for("signed").await.unwrap().unwrap();
    assert!(signature.expires_at().is_some());
}

#[tokio::test]
async fn authorities_use_query_parameter() {
    let seen: Seen = Default::default();
    let inner = seen.clone();
    let router = Router::new().route(
        "/iam/account/:id/authorities",
        post(
            move |Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                inner
                    .lock()
                    .unwrap()
                    .push(format!("{id} {}", query["authority"]));
                StatusCode::OK
            },
        )
        .get(|| async { Json(json!({ "authorities": ["ROLE_USER", "ROLE_ADMIN"] })) }),
    );
    let client = serve(router).await;

    client
        .grant_authority("u-1", gateway::Authority::Reader)
        .await
        .unwrap();
    let authorities = client.authorities("u-1").await.unwrap();
    assert!(authorities.has(gateway::Authority::Admin));
    assert!(!authorities.has(gateway::Authority::Reader));
    assert_eq!(*seen.lock().unwrap(), vec!["u-1 ROLE_READER"]);
}

#[tokio::test]
async fn counts_read_total_results() {
    let router = Router::new()
        .route(
            "/iam/account/search",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query["count"], "0");
                Json(json!({ "totalResults": 42 }))
            }),
        )
        .route(
            "/iam/group/search",
            get(|| async { Json(json!({ "totalResults": 7, "Resources": [] })) }),
        );
    let client = serve(router).await;

    assert_eq!(client.user_count().await.unwrap(), 42);
    assert_eq!(client.group_count().await.unwrap(), 7);
}

#[tokio::test]
async fn cert_link_requests_are_queried_and_rejected_with_motivation() {
    let seen: Seen = Default::default();
    let (page_seen, reject_seen) = (seen.clone(), seen.clone());
    let router = Router::new()
        .route(
            "/iam/cert_link_requests",
            get(move |Query(query): Query<HashMap<String, String>>| async move {
                page_seen.lock().unwrap().push(format!(
                    "page {} {} {}",
                    query["username"],
                    query["status"],
                    query.get("startIndex").cloned().unwrap_or_default()
                ));
                Json(json!({
                    "totalResults": 1,
                    "itemsPerPage": 10,
                    "Resources": [{
                        "uuid": "7f0f3b5e-5f1c-4d1b-9d8c-2b9b8f0c2a11",
                        "username": "test",
                        "status": "PENDING",
                        "creation_time": 1_700_000_000_000i64
                    }]
                }))
            }),
        )
        .route(
            "/iam/cert_link_requests/:uuid/reject",
            post(
                move |Path(uuid): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                    reject_seen
                        .lock()
                        .unwrap()
                        .push(format!("reject {uuid} {}", query["motivation"]));
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/iam/cert_link_requests/:uuid",
            delete(|| async { StatusCode::NO_CONTENT }),
        );
    let client = serve(router).await;

    let query = CertLinkQuery {
        username: Some("test".into()),
        status: Some(CertLinkStatus::Pending),
        start_index: None,
    };
    let page = client.page(&query).await.unwrap();
    let request = &page.resources[0];
    assert_eq!(request.status, Some(CertLinkStatus::Pending));
    client.reject(request.uuid, "unknown CA").await.unwrap();
    client.abort(request.uuid).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "page test PENDING ".to_owned(),
            "reject 7f0f3b5e-5f1c-4d1b-9d8c-2b9b8f0c2a11 unknown CA".to_owned(),
        ]
    );
}

#[tokio::test]
async fn password_reset_sends_json_and_change_sends_form() {
    let seen: Seen = Default::default();
    let (reset_seen, change_seen) = (seen.clone(), seen.clone());
    let router = Router::new()
        .route(
            "/iam/password-reset",
            post(move |Json(body): Json<Value>| async move {
                reset_seen.lock().unwrap().push(format!(
                    "reset {} {}",
                    body["token"].as_str().unwrap(),
                    body["updatedPassword"].as_str().unwrap()
                ));
                StatusCode::OK
            }),
        )
        .route(
            "/iam/password-update",
            post(move |Form(form): Form<HashMap<String, String>>| async move {
                change_seen.lock().unwrap().push(format!(
                    "change {} {}",
                    form["currentPassword"], form["updatedPassword"]
                ));
                StatusCode::OK
            }),
        );
    let client = serve(router).await;

    client.reset("tok", "new-pass").await.unwrap();
    client.change("old-pass", "new-pass").await.unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["reset tok new-pass", "change old-pass new-pass"]
    );
}

#[tokio::test]
async fn self_service_clients_use_client_registration_paths() {
    let seen: Seen = Default::default();
    let (get_seen, put_seen, delete_seen) = (seen.clone(), seen.clone(), seen.clone());
    let router = Router::new().route(
        "/iam/api/client-registration/:id",
        get(move |Path(id): Path<String>| async move {
            get_seen.lock().unwrap().push(format!("GET {id}"));
            Json(json!({ "client_id": id, "client_name": "mine" }))
        })
        .put(move |Path(id): Path<String>, Json(body): Json<Value>| async move {
            put_seen
                .lock()
                .unwrap()
                .push(format!("PUT {id} {}", body["client_name"]));
            Json(body)
        })
        .delete(move |Path(id): Path<String>| async move {
            delete_seen.lock().unwrap().push(format!("DELETE {id}"));
            StatusCode::NO_CONTENT
        }),
    );
    let registration = ClientRegistration(serve(router).await);

    let mut fetched = registration.fetch(&"dyn-1".to_owned()).await.unwrap();
    assert_eq!(fetched.display_name(), "mine");
    fetched.client_name = Some("renamed".into());
    let updated = registration.update(&fetched).await.unwrap();
    assert_eq!(updated.display_name(), "renamed");
    registration.remove(&"dyn-1".to_owned()).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["GET dyn-1", "PUT dyn-1 \"renamed\"", "DELETE dyn-1"]
    );
}

#[tokio::test]
async fn identifiers_are_percent_encoded_as_one_path_segment() {
    let router = Router::new()
        .route(
            "/iam/api/clients/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({ "client_id": id, "client_name": "odd" }))
            }),
        )
        .route(
            "/iam/api/clients/:id/enable",
            patch(|Path(id): Path<String>| async move {
                assert_eq!(id, "a b");
                StatusCode::OK
            }),
        );
    let client = serve(router).await;

    let fetched = EntityStore::<RegisteredClient>::fetch(&client, &"a/b?c#d".to_owned())
        .await
        .unwrap();
    assert_eq!(fetched.client_id.as_deref(), Some("a/b?c#d"));
    ClientsApi::enable(&client, "a b").await.unwrap();
}
