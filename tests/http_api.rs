use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, Request, StatusCode,
    },
    Router,
};
use fileshare::{
    blob::MemoryBlobStore,
    credentials::hash_password,
    email::OutboxEmailSender,
    fileshare::{router, AppConfig, AppState, Backends},
    flows::Tokens,
    model::Role,
    store::{MemoryStore, NewUser, UserDirectory},
    token::{ManualClock, Signer, SigningKey, TokenPolicy},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BASE_URL: &str = "http://files.test";
const BOUNDARY: &str = "fileshare-test-boundary";

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    outbox: Arc<OutboxEmailSender>,
    clock: Arc<ManualClock>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response is not JSON")
    }
}

fn test_app(policy: TokenPolicy) -> Result<TestApp> {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let key = SigningKey::from_bytes(b"http-test-secret-0123456789abcdef".to_vec())?;
    let signer = Signer::new(&key, clock.clone())?;
    let tokens = Tokens::new(Arc::new(signer), policy);

    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(OutboxEmailSender::new());
    let backends = Backends::from_store(
        store.clone(),
        Arc::new(MemoryBlobStore::new()),
        outbox.clone(),
    );
    let config = AppConfig::new(BASE_URL.to_string()).with_max_upload_bytes(1024);
    let state = Arc::new(AppState::new(config, tokens, backends));

    Ok(TestApp {
        app: router(state),
        store,
        outbox,
        clock,
    })
}

async fn send(app: &Router, request: Request<Body>) -> Result<TestResponse> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
    Ok(TestResponse {
        status,
        headers,
        body,
    })
}

fn get(uri: &str, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::empty())?)
}

fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn upload(token: &str, filename: &str, bytes: &[u8]) -> Result<Request<Body>> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Ok(Request::builder()
        .method("POST")
        .uri("/v1/files")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))?)
}

/// Strip the public base URL so the path can be replayed against the router.
fn local_path(url: &str) -> Result<&str> {
    url.strip_prefix(BASE_URL)
        .context("link does not start with the public base URL")
}

async fn login(app: &Router, username: &str, password: &str) -> Result<TestResponse> {
    send(
        app,
        post_json(
            "/v1/auth/login",
            &json!({"username": username, "password": password}),
        )?,
    )
    .await
}

async fn login_token(app: &Router, username: &str, password: &str) -> Result<String> {
    let response = login(app, username, password).await?;
    assert_eq!(response.status, StatusCode::OK);
    response.json()?["token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no token")
}

async fn create_ops(store: &MemoryStore) -> Result<()> {
    store
        .create_user(NewUser {
            username: "ops".to_string(),
            email: "ops@example.com".to_string(),
            password_hash: hash_password("ops-password")?,
            role: Role::Ops,
            email_verified: true,
        })
        .await?;
    Ok(())
}

/// Sign up, follow the mailed link and log in as a client.
async fn verified_client(test: &TestApp, username: &str) -> Result<String> {
    let response = send(
        &test.app,
        post_json(
            "/v1/auth/signup",
            &json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "client-password"
            }),
        )?,
    )
    .await?;
    assert_eq!(response.status, StatusCode::CREATED);

    let mail = test
        .outbox
        .sent()
        .into_iter()
        .find(|message| message.to_email == format!("{username}@example.com"))
        .context("no verification email")?;
    let url = mail
        .body
        .split_whitespace()
        .find(|word| word.starts_with(BASE_URL))
        .context("no link in verification email")?
        .to_string();

    let response = send(&test.app, get(local_path(&url)?, None)?).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()?["message"], "Email verified successfully.");

    login_token(&test.app, username, "client-password").await
}

#[tokio::test]
async fn health_reports_build_info() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;
    let response = send(&test.app, get("/health", None)?).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.contains_key("X-App"));
    assert!(response.headers.contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn served_openapi_document_has_tags_and_bearer_scheme() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;
    let response = send(&test.app, get("/api-docs/openapi.json", None)?).await?;
    assert_eq!(response.status, StatusCode::OK);

    let doc = response.json()?;
    let tags: Vec<&str> = doc["tags"]
        .as_array()
        .context("tags")?
        .iter()
        .filter_map(|tag| tag["name"].as_str())
        .collect();
    assert_eq!(tags, ["fileshare", "auth", "files"]);

    let bearer = &doc["components"]["securitySchemes"]["bearer"];
    assert_eq!(bearer["type"], "http");
    assert_eq!(bearer["scheme"], "bearer");
    assert!(doc["paths"]["/v1/download/{token}"].is_object());
    Ok(())
}

#[tokio::test]
async fn signup_verify_login() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;

    let response = send(
        &test.app,
        post_json(
            "/v1/auth/signup",
            &json!({"username": "alice", "email": "Alice@Example.com", "password": "client-password"}),
        )?,
    )
    .await?;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.json()?["message"],
        "Check your email for verification link."
    );

    let response = login(&test.app, "alice", "client-password").await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()?["error"], "Email not verified.");

    let duplicate = send(
        &test.app,
        post_json(
            "/v1/auth/signup",
            &json!({"username": "alice", "email": "other@example.com", "password": "client-password"}),
        )?,
    )
    .await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let mail = test.outbox.sent();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to_email, "alice@example.com");
    let url = mail[0]
        .body
        .split_whitespace()
        .find(|word| word.starts_with(BASE_URL))
        .context("no link in verification email")?
        .to_string();
    let path = local_path(&url)?;

    let first = send(&test.app, get(path, None)?).await?;
    assert_eq!(first.status, StatusCode::OK);
    let second = send(&test.app, get(path, None)?).await?;
    assert_eq!(second.status, StatusCode::OK);

    let response = login(&test.app, "alice", "client-password").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()?["role"], "client");

    let response = login(&test.app, "alice", "wrong-password").await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()?["error"], "Invalid credentials.");

    let unknown = login(&test.app, "nobody", "client-password").await?;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body, response.body);
    Ok(())
}

#[tokio::test]
async fn signup_rejects_short_password() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;
    let response = send(
        &test.app,
        post_json(
            "/v1/auth/signup",
            &json!({"username": "bob", "email": "bob@example.com", "password": "short"}),
        )?,
    )
    .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(test.outbox.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn tampered_verification_link_is_generic() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;
    let response = send(&test.app, get("/v1/auth/verify-email/not-a-token", None)?).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()?["error"],
        "Invalid or expired verification link."
    );
    Ok(())
}

#[tokio::test]
async fn upload_list_and_download() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;
    create_ops(&test.store).await?;
    let ops_token = login_token(&test.app, "ops", "ops-password").await?;
    let alice = verified_client(&test, "alice").await?;

    // Role gates
    let response = send(&test.app, upload(&alice, "plan.docx", b"docx-bytes")?).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()?["error"], "Only Ops users can upload files.");
    let response = send(&test.app, get("/v1/files", Some(&ops_token))?).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(&test.app, upload(&ops_token, "notes.txt", b"text")?).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&test.app, upload(&ops_token, "plan.docx", b"docx-bytes")?).await?;
    assert_eq!(response.status, StatusCode::CREATED);
    let uploaded = response.json()?;
    assert_eq!(uploaded["filename"], "plan.docx");
    assert_eq!(uploaded["size_bytes"], 10);
    let file_id = uploaded["id"]
        .as_str()
        .context("upload response has no id")?
        .to_string();

    let response = send(&test.app, get("/v1/files", Some(&alice))?).await?;
    assert_eq!(response.status, StatusCode::OK);
    let listed = response.json()?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["id"], file_id.as_str());

    let response = send(
        &test.app,
        get(&format!("/v1/files/{file_id}/download-link"), Some(&alice))?,
    )
    .await?;
    assert_eq!(response.status, StatusCode::OK);
    let link = response.json()?;
    assert_eq!(link["message"], "success");
    assert_eq!(link["expires_in"], 600);
    let download_url = link["download_url"]
        .as_str()
        .context("no download_url")?
        .to_string();
    let download_path = local_path(&download_url)?;

    let response = send(&test.app, get(download_path, Some(&alice))?).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"docx-bytes".to_vec());
    assert_eq!(
        response
            .headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok()),
        Some("attachment; filename=\"plan.docx\"")
    );
    assert_eq!(
        response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
    );

    // Another client cannot redeem alice's link.
    let mallory = verified_client(&test, "mallory").await?;
    let response = send(&test.app, get(download_path, Some(&mallory))?).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()?["error"], "Invalid or expired download link.");

    // Links expire.
    test.clock.advance(601);
    let response = send(&test.app, get(download_path, Some(&alice))?).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()?["error"], "Invalid or expired download link.");
    Ok(())
}

#[tokio::test]
async fn single_use_download_links() -> Result<()> {
    let test = test_app(TokenPolicy::new().with_single_use_downloads(true))?;
    create_ops(&test.store).await?;
    let ops_token = login_token(&test.app, "ops", "ops-password").await?;
    let alice = verified_client(&test, "alice").await?;

    let response = send(&test.app, upload(&ops_token, "sheet.xlsx", b"cells")?).await?;
    let file_id = response.json()?["id"]
        .as_str()
        .context("upload response has no id")?
        .to_string();

    let response = send(
        &test.app,
        get(&format!("/v1/files/{file_id}/download-link"), Some(&alice))?,
    )
    .await?;
    let download_url = response.json()?["download_url"]
        .as_str()
        .context("no download_url")?
        .to_string();
    let download_path = local_path(&download_url)?;

    let first = send(&test.app, get(download_path, Some(&alice))?).await?;
    assert_eq!(first.status, StatusCode::OK);
    let second = send(&test.app, get(download_path, Some(&alice))?).await?;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_file_and_missing_session() -> Result<()> {
    let test = test_app(TokenPolicy::new())?;
    let alice = verified_client(&test, "alice").await?;

    let response = send(
        &test.app,
        get("/v1/files/does-not-exist/download-link", Some(&alice))?,
    )
    .await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()?["error"], "File not found.");

    let response = send(&test.app, get("/v1/files", None)?).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let response = send(&test.app, get("/v1/files", Some("bogus-session"))?).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
