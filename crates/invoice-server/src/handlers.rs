//! HTTP request handlers for the invoice service.
//!
//! Implements the upload endpoint and health check using axum.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use invoice_domain::{Document, InvoiceRecord, MediaType};
use invoice_extractor::{Extractor, ExtractorError};
use invoice_store::{SharedStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Multipart field carrying the invoice
pub const FILE_FIELD: &str = "file";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Turns documents into invoice fields
    pub extractor: Extractor,
    /// Where extracted invoices are saved
    pub store: SharedStore,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Always "ok" while the process is serving
    pub status: String,
    /// Service name
    pub service: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// The upload itself is unusable
    BadRequest(String),
    /// The multipart body could not be read
    Multipart(MultipartError),
    /// The model call or its reply failed
    Extraction(ExtractorError),
    /// The database rejected the insert
    Persistence(StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Server-side failures get a fixed message; details stay in the logs
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Multipart(e) => (e.status(), e.body_text()),
            AppError::Extraction(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to extract invoice data from the document".to_string(),
            ),
            AppError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save invoice data".to_string(),
            ),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Multipart(e)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

/// Pick the media type of an uploaded part
///
/// The declared content type wins unless it is missing or the generic
/// `application/octet-stream`, in which case the filename extension decides.
/// A filename whose extension is off the allow-list is rejected whatever
/// the declared type says.
pub fn resolve_media_type(content_type: Option<&str>, filename: Option<&str>) -> Option<MediaType> {
    let from_name = filename.and_then(MediaType::from_extension);
    let has_extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| !ext.is_empty());
    if has_extension && from_name.is_none() {
        return None;
    }

    match content_type.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case("application/octet-stream") => {
            MediaType::from_mime(ct)
        }
        _ => from_name,
    }
}

/// Pull the `file` part out of the upload and validate it
async fn read_document(mut multipart: Multipart) -> Result<Document, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        if let Some(name) = &filename {
            Span::current().record("filename", name.as_str());
        }

        let media_type = resolve_media_type(content_type.as_deref(), filename.as_deref())
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Unsupported file type {}; expected one of: jpg, jpeg, png, pdf",
                    filename
                        .as_deref()
                        .or(content_type.as_deref())
                        .unwrap_or("(unknown)")
                ))
            })?;

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let document = Document::new(media_type, bytes.to_vec());
        return Ok(match filename {
            Some(name) => document.with_filename(name),
            None => document,
        });
    }

    Err(AppError::BadRequest(format!(
        "Missing '{}' field in multipart form",
        FILE_FIELD
    )))
}

/// POST /invoice/process - Extract and save one invoice
async fn process_invoice(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InvoiceRecord>, AppError> {
    let span = info_span!(
        "process_invoice",
        request_id = %Uuid::now_v7(),
        filename = field::Empty,
    );

    async move {
        let document = read_document(multipart?).await.inspect_err(|e| {
            warn!(error = ?e, "Rejected upload");
        })?;

        info!(media_type = %document.media_type, bytes = document.len(), "Received invoice");

        let invoice = state.extractor.extract(&document).await.map_err(|e| {
            error!(error = %e, "Extraction failed");
            AppError::Extraction(e)
        })?;

        let id = state.store.insert_invoice(&invoice).await.map_err(|e| {
            error!(error = %e, "Failed to persist invoice");
            AppError::Persistence(e)
        })?;

        info!(%id, "Invoice processed");
        Ok::<_, AppError>(Json(InvoiceRecord::new(id, invoice)))
    }
    .instrument(span)
    .await
}

/// GET /health - Liveness check
async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        service: "invoice-intake".to_string(),
    })
}

/// Create the axum router with all routes
///
/// Request bodies above `max_upload_bytes` are refused with 413.
pub fn create_router(state: AppState, max_upload_bytes: usize) -> AxumRouter {
    AxumRouter::new()
        .route("/invoice/process", post(process_invoice))
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use invoice_llm::MockProvider;
    use invoice_store::SqliteStore;
    use std::sync::Arc;
    use tower::ServiceExt; // for oneshot

    const BOUNDARY: &str = "unit-test-boundary";

    async fn create_test_state(provider: MockProvider) -> AppState {
        let store = SqliteStore::open_in_memory().unwrap();
        invoice_domain::traits::InvoiceStore::ensure_schema(&store)
            .await
            .unwrap();

        AppState {
            extractor: Extractor::new(provider),
            store: Arc::new(store),
        }
    }

    fn upload(filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
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

    #[test]
    fn test_resolve_media_type() {
        assert_eq!(
            resolve_media_type(Some("image/png"), Some("scan.pdf")),
            Some(MediaType::Png)
        );
        assert_eq!(
            resolve_media_type(Some("application/octet-stream"), Some("scan.PDF")),
            Some(MediaType::Pdf)
        );
        assert_eq!(
            resolve_media_type(None, Some("photo.jpeg")),
            Some(MediaType::Jpeg)
        );
        assert_eq!(resolve_media_type(Some("text/plain"), Some("notes.jpg")), None);
        assert_eq!(resolve_media_type(None, Some("notes.txt")), None);
        assert_eq!(resolve_media_type(None, None), None);
    }

    #[test]
    fn test_disallowed_extension_overrides_declared_type() {
        assert_eq!(resolve_media_type(Some("image/png"), Some("notes.txt")), None);
        assert_eq!(resolve_media_type(Some("application/pdf"), Some("run.exe")), None);
        assert_eq!(
            resolve_media_type(Some("image/png"), Some("scan")),
            Some(MediaType::Png)
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = create_test_state(MockProvider::default()).await;
        let app = create_router(state, 1024);

        for uri in ["/", "/health"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_process_invoice() {
        let provider = MockProvider::new(
            r#"{"total_amount": 10.5, "issue_date": "2024-03-01", "tax_id": "123"}"#,
        );
        let state = create_test_state(provider).await;
        let app = create_router(state, 1024 * 1024);

        let response = app
            .oneshot(upload("invoice.png", "image/png", b"\x89PNG fake"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let state = create_test_state(MockProvider::default()).await;
        let app = create_router(state, 64);

        let response = app
            .oneshot(upload("invoice.pdf", "application/pdf", &[b'x'; 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_extraction_error_hides_details() {
        let state = create_test_state(MockProvider::failing("upstream secret detail")).await;
        let app = create_router(state, 1024 * 1024);

        let response = app
            .oneshot(upload("invoice.jpg", "image/jpeg", b"jpeg bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("upstream secret detail"));
    }
}
