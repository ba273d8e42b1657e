//! Integration tests for the invoice server
//!
//! Drive the full router (multipart parsing, extraction, persistence) with
//! a mock model and an in-memory or counting store.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use invoice_domain::traits::InvoiceStore;
use invoice_domain::{ExtractedInvoice, InvoiceId, MediaType};
use invoice_extractor::Extractor;
use invoice_llm::MockProvider;
use invoice_server::handlers::{create_router, AppState};
use invoice_store::{SqliteStore, StoreError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

const BOUNDARY: &str = "----invoice-test-boundary";
const MAX_UPLOAD: usize = 1024 * 1024;

const VALID_REPLY: &str =
    r#"{"total_amount": 123.45, "issue_date": "2024-07-02", "tax_id": "12345678000199"}"#;

/// Store that counts inserts and can be told to fail
#[derive(Clone, Default)]
struct CountingStore {
    inserts: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingStore {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvoiceStore for CountingStore {
    type Error = StoreError;

    async fn ensure_schema(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn insert_invoice(&self, _invoice: &ExtractedInvoice) -> Result<InvoiceId, Self::Error> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(StoreError::Connection(
                "password authentication failed for user \"invoices\"".to_string(),
            ));
        }
        Ok(InvoiceId::from_value(n as i64))
    }
}

async fn sqlite_app(provider: MockProvider) -> Router {
    let store = SqliteStore::open_in_memory().unwrap();
    store.ensure_schema().await.unwrap();

    create_router(
        AppState {
            extractor: Extractor::new(provider),
            store: Arc::new(store),
        },
        MAX_UPLOAD,
    )
}

fn counting_app(provider: MockProvider, store: CountingStore) -> Router {
    create_router(
        AppState {
            extractor: Extractor::new(provider),
            store: Arc::new(store),
        },
        MAX_UPLOAD,
    )
}

/// A single-part multipart body
fn multipart_request(
    field_name: &str,
    filename: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/invoice/process")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn upload(filename: &str, content_type: &str) -> Request<Body> {
    multipart_request("file", filename, Some(content_type), b"not really an image")
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_every_supported_type_is_processed() {
    let uploads = [
        ("invoice.jpg", "image/jpeg"),
        ("invoice.jpeg", "image/jpeg"),
        ("invoice.png", "image/png"),
        ("invoice.pdf", "application/pdf"),
    ];

    for (filename, content_type) in uploads {
        let app = sqlite_app(MockProvider::new(VALID_REPLY)).await;
        let response = app.oneshot(upload(filename, content_type)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", filename);
        let body = response_json(response).await;
        assert_eq!(body["tax_id"], "12345678000199", "{}", filename);
    }
}

#[tokio::test]
async fn test_response_echoes_extracted_fields() {
    let app = sqlite_app(MockProvider::new(VALID_REPLY)).await;

    let response = app.oneshot(upload("invoice.pdf", "application/pdf")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(
        body,
        json!({
            "id": 1,
            "total_amount": 123.45,
            "issue_date": "2024-07-02",
            "tax_id": "12345678000199"
        })
    );
}

#[tokio::test]
async fn test_generic_content_type_falls_back_to_extension() {
    let provider = MockProvider::default().with_response(MediaType::Pdf, VALID_REPLY);
    let app = sqlite_app(provider.clone()).await;

    let request = multipart_request(
        "file",
        "scan.PDF",
        Some("application/octet-stream"),
        b"%PDF-1.4",
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_unsupported_type_is_rejected_before_extraction() {
    let provider = MockProvider::new(VALID_REPLY);
    let store = CountingStore::default();
    let app = counting_app(provider.clone(), store.clone());

    let response = app.oneshot(upload("notes.txt", "text/plain")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Unsupported file type"));
    assert_eq!(provider.call_count(), 0, "Model should not be called");
    assert_eq!(store.insert_count(), 0);
}

#[tokio::test]
async fn test_text_file_with_image_content_type_is_rejected() {
    let provider = MockProvider::new(VALID_REPLY);
    let store = CountingStore::default();
    let app = counting_app(provider.clone(), store.clone());

    let response = app.oneshot(upload("notes.txt", "image/png")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0, "Model should not be called");
    assert_eq!(store.insert_count(), 0);
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let provider = MockProvider::new(VALID_REPLY);
    let app = counting_app(provider.clone(), CountingStore::default());

    let request = multipart_request("attachment", "invoice.png", Some("image/png"), b"png");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_non_multipart_request_is_rejected() {
    let provider = MockProvider::new(VALID_REPLY);
    let app = counting_app(provider.clone(), CountingStore::default());

    let request = Request::builder()
        .method("POST")
        .uri("/invoice/process")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"file": "invoice.png"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let provider = MockProvider::new(VALID_REPLY);
    let app = counting_app(provider.clone(), CountingStore::default());

    let request = multipart_request("file", "invoice.png", Some("image/png"), b"");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_incomplete_extraction_is_not_persisted() {
    let provider =
        MockProvider::new(r#"{"total_amount": 123.45, "issue_date": "2024-07-02"}"#);
    let store = CountingStore::default();
    let app = counting_app(provider.clone(), store.clone());

    let response = app.oneshot(upload("invoice.png", "image/png")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(store.insert_count(), 0, "Nothing should be written");
}

#[tokio::test]
async fn test_unparseable_reply_is_a_server_error() {
    let provider = MockProvider::new("I could not read this invoice, sorry.");
    let store = CountingStore::default();
    let app = counting_app(provider, store.clone());

    let response = app.oneshot(upload("invoice.jpg", "image/jpeg")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.insert_count(), 0);
}

#[tokio::test]
async fn test_store_failure_hides_driver_details() {
    let store = CountingStore::failing();
    let app = counting_app(MockProvider::new(VALID_REPLY), store.clone());

    let response = app.oneshot(upload("invoice.png", "image/png")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.insert_count(), 1);

    let body = response_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("password"));
    assert!(!message.contains("invoices\""));
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_ids() {
    let app = sqlite_app(MockProvider::new(VALID_REPLY)).await;

    let (first, second) = tokio::join!(
        app.clone().oneshot(upload("a.png", "image/png")),
        app.clone().oneshot(upload("b.pdf", "application/pdf")),
    );
    let first = response_json(first.unwrap()).await;
    let second = response_json(second.unwrap()).await;

    assert_ne!(first["id"], second["id"]);
}

#[tokio::test]
async fn test_records_persist_to_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invoices.db");

    let store = SqliteStore::new(&path).unwrap();
    store.ensure_schema().await.unwrap();
    let app = create_router(
        AppState {
            extractor: Extractor::new(MockProvider::new(VALID_REPLY)),
            store: Arc::new(store),
        },
        MAX_UPLOAD,
    );

    for name in ["one.png", "two.png"] {
        let response = app.clone().oneshot(upload(name, "image/png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Reopening sees both rows and continues the id sequence
    let reopened = SqliteStore::new(&path).unwrap();
    reopened.ensure_schema().await.unwrap();
    let next = reopened
        .insert_invoice(&ExtractedInvoice {
            total_amount: "1.00".parse().unwrap(),
            issue_date: "2024-01-01".parse().unwrap(),
            tax_id: "1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(next.value(), 3);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = counting_app(MockProvider::default(), CountingStore::default());

    for uri in ["/", "/health"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body, json!({"status": "ok", "service": "invoice-intake"}));
    }
}
