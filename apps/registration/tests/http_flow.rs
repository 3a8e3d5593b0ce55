//! End-to-end HTTP tests against the full router.
//!
//! The router runs with an in-memory record store and the real Code 128
//! generator; requests go through `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use eventpass_core::record_store::{
    NewRegistration, RecordStore, RecordStoreError, Registration, StoreFuture,
};
use eventpass_testing::{test_clock, InMemoryRecordStore, Operation};
use registration::{
    server::{build_router, AppState},
    Code128Generator, SessionRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct TestApp {
    router: Router,
    records: InMemoryRecordStore,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    fn new() -> Self {
        Self::with_capacity(16)
    }

    fn with_capacity(capacity: usize) -> Self {
        let records = InMemoryRecordStore::new();
        Self::build(
            records.clone(),
            Arc::new(records),
            capacity,
            Duration::from_secs(2),
        )
    }

    /// App whose store delays some operations; `records` is the backing data
    fn with_slow_store(store: SlowRecordStore, effect_timeout: Duration) -> Self {
        let records = store.inner.clone();
        Self::build(records, Arc::new(store), 16, effect_timeout)
    }

    fn build(
        records: InMemoryRecordStore,
        store: Arc<dyn RecordStore>,
        capacity: usize,
        effect_timeout: Duration,
    ) -> Self {
        let state = AppState::new(
            store,
            Arc::new(Code128Generator::default()),
            Arc::new(test_clock()),
            Arc::new(SessionRegistry::new(capacity)),
            effect_timeout,
        );

        Self {
            router: build_router(state),
            records,
        }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    async fn open_session(&self) -> String {
        let response = self.request(Method::POST, "/api/sessions", None).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.json()["session_id"].as_str().unwrap().to_string()
    }

    async fn submit(&self, session: &str, form: Value) -> TestResponse {
        self.request(
            Method::POST,
            &format!("/api/sessions/{session}/registration"),
            Some(form),
        )
        .await
    }
}

/// Record store that sleeps before selected operations
#[derive(Clone, Default)]
struct SlowRecordStore {
    inner: InMemoryRecordStore,
    create_delay: Duration,
    increment_delay: Duration,
}

impl RecordStore for SlowRecordStore {
    fn exists<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, bool> {
        self.inner.exists(identifier)
    }

    fn create(&self, registration: NewRegistration) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            tokio::time::sleep(self.create_delay).await;
            self.inner.create(registration).await
        })
    }

    fn increment_downloads<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            tokio::time::sleep(self.increment_delay).await;
            self.inner.increment_downloads(identifier).await
        })
    }

    fn scan_all(&self) -> StoreFuture<'_, Vec<Registration>> {
        self.inner.scan_all()
    }
}

/// Poll `condition` until it holds or two seconds pass
async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn downloads(records: &InMemoryRecordStore, identifier: &str) -> u64 {
    records.get(identifier).map_or(0, |r| r.download_count)
}

fn form(identifier: &str) -> Value {
    json!({
        "name": "John Doe",
        "identifier": identifier,
        "email": "john@example.com",
        "gender": "Male",
    })
}

#[tokio::test]
async fn test_full_registration_flow() {
    let app = TestApp::new();
    let session = app.open_session().await;

    // Initial state is the form
    let response = app
        .request(Method::GET, &format!("/api/sessions/{session}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["state"]["screen"]["name"], "form");

    // Submit
    let response = app.submit(&session, form("EMP12345")).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["state"]["screen"]["name"], "pass_shown");
    assert_eq!(body["state"]["screen"]["identifier"], "EMP12345");
    assert_eq!(body["state"]["notice"]["message"], "Registration successful!");
    assert_eq!(app.records.len(), 1);

    // Inline pass
    let response = app
        .request(Method::GET, &format!("/api/sessions/{session}/pass"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "image/png");
    assert!(response.body.starts_with(&PNG_SIGNATURE));

    // Download
    let response = app
        .request(
            Method::GET,
            &format!("/api/sessions/{session}/pass/download"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"EMP12345.png\""
    );
    assert!(response.body.starts_with(&PNG_SIGNATURE));
    assert!(eventually(|| downloads(&app.records, "EMP12345") == 1).await);

    // Register another
    let response = app
        .request(Method::POST, &format!("/api/sessions/{session}/reset"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["state"]["screen"], json!({"name": "form"}));
    assert_eq!(body["state"]["notice"], Value::Null);
}

#[tokio::test]
async fn test_missing_field_is_unprocessable() {
    let app = TestApp::new();
    let session = app.open_session().await;

    let response = app
        .submit(&session, json!({"name": "John Doe", "identifier": "EMP1"}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json(),
        json!({"code": "VALIDATION_ERROR", "message": "Please fill in all fields."})
    );
    assert_eq!(app.records.calls(Operation::Create), 0);
    assert_eq!(app.records.calls(Operation::Exists), 0);
}

#[tokio::test]
async fn test_unencodable_identifier_is_unprocessable() {
    let app = TestApp::new();
    let session = app.open_session().await;

    let response = app.submit(&session, form("caf\u{e9}")).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.records.is_empty());
}

#[tokio::test]
async fn test_duplicate_identifier_conflicts() {
    let app = TestApp::new();
    let first = app.open_session().await;
    let second = app.open_session().await;

    assert_eq!(app.submit(&first, form("EMP1")).await.status, StatusCode::OK);

    let response = app.submit(&second, form("EMP1")).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json()["message"],
        "This identifier is already registered."
    );

    // The form stays editable: another identifier goes through
    assert_eq!(app.submit(&second, form("EMP2")).await.status, StatusCode::OK);
    assert_eq!(app.records.len(), 2);
}

#[tokio::test]
async fn test_submit_on_pass_screen_conflicts() {
    let app = TestApp::new();
    let session = app.open_session().await;
    app.submit(&session, form("EMP1")).await;

    let response = app.submit(&session, form("EMP2")).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(app.records.len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_unavailable() {
    let app = TestApp::new();
    app.records.set_failing(
        Operation::Create,
        RecordStoreError::Database("connection refused".to_string()),
    );
    let session = app.open_session().await;

    let response = app.submit(&session, form("EMP1")).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.json()["message"]
        .as_str()
        .unwrap()
        .starts_with("An error occurred:"));
    assert!(app.records.is_empty());
}

#[tokio::test]
async fn test_download_survives_accounting_failure() {
    let app = TestApp::new();
    let session = app.open_session().await;
    app.submit(&session, form("EMP1")).await;
    app.records.set_failing(
        Operation::IncrementDownloads,
        RecordStoreError::Database("connection reset".to_string()),
    );

    let response = app
        .request(
            Method::GET,
            &format!("/api/sessions/{session}/pass/download"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.starts_with(&PNG_SIGNATURE));
    assert!(eventually(|| app.records.calls(Operation::IncrementDownloads) == 1).await);
    assert_eq!(downloads(&app.records, "EMP1"), 0);
}

#[tokio::test]
async fn test_download_does_not_wait_for_accounting() {
    let app = TestApp::with_slow_store(
        SlowRecordStore {
            increment_delay: Duration::from_secs(30),
            ..SlowRecordStore::default()
        },
        Duration::from_secs(5),
    );
    let session = app.open_session().await;
    assert_eq!(app.submit(&session, form("EMP1")).await.status, StatusCode::OK);

    let started = Instant::now();
    let response = app
        .request(
            Method::GET,
            &format!("/api/sessions/{session}/pass/download"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.starts_with(&PNG_SIGNATURE));
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "download took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_slow_registration_is_accepted_then_completes() {
    let app = TestApp::with_slow_store(
        SlowRecordStore {
            create_delay: Duration::from_millis(600),
            ..SlowRecordStore::default()
        },
        Duration::from_millis(200),
    );
    let session = app.open_session().await;

    let response = app.submit(&session, form("EMP1")).await;

    // Not reported as a failure: the write is still running
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let body = response.json();
    assert_eq!(body["state"]["submitting"], true);
    assert_eq!(body["state"]["screen"]["name"], "form");

    // A second submit while the first is pending conflicts
    let response = app.submit(&session, form("EMP2")).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Polling the session shows the pass once the write commits
    assert!(eventually(|| app.records.len() == 1).await);
    let mut screen = Value::Null;
    for _ in 0..100 {
        let response = app
            .request(Method::GET, &format!("/api/sessions/{session}"), None)
            .await;
        screen = response.json()["state"]["screen"].clone();
        if screen["name"] == "pass_shown" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(screen, json!({"name": "pass_shown", "identifier": "EMP1"}));
    assert!(app.records.get("EMP2").is_none());
}

#[tokio::test]
async fn test_pass_requires_registration() {
    let app = TestApp::new();
    let session = app.open_session().await;

    for path in ["pass", "pass/download"] {
        let response = app
            .request(Method::GET, &format!("/api/sessions/{session}/{path}"), None)
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT);
    }
    assert_eq!(app.records.calls(Operation::IncrementDownloads), 0);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = TestApp::new();
    let unknown = uuid::Uuid::new_v4();

    let response = app
        .request(Method::GET, &format!("/api/sessions/{unknown}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["code"], "NOT_FOUND");

    let response = app.submit(&unknown.to_string(), form("EMP1")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_session() {
    let app = TestApp::new();
    let session = app.open_session().await;

    let response = app
        .request(Method::DELETE, &format!("/api/sessions/{session}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/sessions/{session}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oldest_session_evicted_at_capacity() {
    let app = TestApp::with_capacity(1);
    let first = app.open_session().await;
    let _second = app.open_session().await;

    let response = app
        .request(Method::GET, &format!("/api/sessions/{first}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_stats() {
    let app = TestApp::new();
    for (identifier, gender) in [("EMP1", "Male"), ("EMP2", "Female"), ("EMP3", "Male")] {
        let session = app.open_session().await;
        let mut body = form(identifier);
        body["gender"] = json!(gender);
        assert_eq!(app.submit(&session, body).await.status, StatusCode::OK);

        if identifier != "EMP2" {
            app.request(
                Method::GET,
                &format!("/api/sessions/{session}/pass/download"),
                None,
            )
            .await;
        }
    }

    assert!(
        eventually(|| downloads(&app.records, "EMP1") + downloads(&app.records, "EMP3") == 2)
            .await
    );

    let response = app.request(Method::GET, "/api/admin/stats", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "total_registrations": 3,
            "total_downloads": 2,
            "gender_breakdown": {"Male": 2, "Female": 1},
            "error": null,
        })
    );
}

#[tokio::test]
async fn test_admin_stats_degrade_on_store_failure() {
    let app = TestApp::new();
    app.records.set_failing(
        Operation::ScanAll,
        RecordStoreError::Database("connection refused".to_string()),
    );

    let response = app.request(Method::GET, "/api/admin/stats", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["total_registrations"], 0);
    assert_eq!(body["gender_breakdown"], json!({}));
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"ok");

    let response = app.request(Method::GET, "/ready", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "Healthy");

    app.records.set_failing(
        Operation::Exists,
        RecordStoreError::Database("connection refused".to_string()),
    );
    let response = app.request(Method::GET, "/ready", None).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = TestApp::new();
    let id = uuid::Uuid::new_v4().to_string();

    let request = Request::builder()
        .uri("/health")
        .header("X-Correlation-ID", &id)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["X-Correlation-ID"], id.as_str());

    let response = app.request(Method::GET, "/api/admin/stats", None).await;
    assert!(response.headers.contains_key("X-Correlation-ID"));
}
