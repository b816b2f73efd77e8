//! HTTP surface for the notes service.
//!
//! Two endpoints:
//!
//! - `GET /health` – Liveness probe returning `{"ok": true}`.
//! - `POST /make-notes` – Multipart upload of lecture material (repeated `files` field). When a
//!   shared secret is configured the caller must present it in `X-Backend-Secret`. On success the
//!   response body is `notes.zip` containing `notes.docx` and `notes.pdf`; every failure is a
//!   JSON object `{"error": "<message>"}` with a status derived from [`NotesError::status`].

use crate::error::NotesError;
use crate::ingress::{authorize, read_multipart};
use crate::package::{ARCHIVE_CONTENT_TYPE, ARCHIVE_FILENAME};
use crate::pipeline::NotesApi;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Build the HTTP router exposing the notes API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: NotesApi + 'static,
{
    let body_limit = service.limits().body_limit();
    Router::new()
        .route("/health", get(health))
        .route(
            "/make-notes",
            post(make_notes::<S>).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// Authenticate, admit uploads under the configured ceilings, and run the pipeline.
///
/// The secret is checked before the body is touched, so unauthorized callers never cause any
/// upload bytes to be read.
async fn make_notes<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError>
where
    S: NotesApi,
{
    let span = tracing::info_span!("make_notes", request_id = %Uuid::new_v4());
    async move {
        authorize(&headers, service.shared_secret())?;
        let multipart = multipart.map_err(|rejection| NotesError::Multipart {
            status: rejection.status(),
            message: rejection.body_text(),
        })?;

        let files = read_multipart(multipart, service.limits()).await?;
        tracing::info!(
            files = files.len(),
            names = ?files.iter().map(|file| file.name.as_str()).collect::<Vec<_>>(),
            "Accepted uploads"
        );

        let archive = service.make_notes(files).await?;
        Ok(archive_response(archive))
    }
    .instrument(span)
    .await
}

fn archive_response(archive: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, ARCHIVE_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        archive,
    )
        .into_response()
}

struct AppError(NotesError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let message = self.0.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<NotesError> for AppError {
    fn from(inner: NotesError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::error::NotesError;
    use crate::extract::ExtractError;
    use crate::ingress::{UploadLimits, UploadedFile};
    use crate::pipeline::NotesApi;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "notes-test-boundary";

    struct StubNotesService {
        limits: UploadLimits,
        secret: Option<String>,
        unsupported: Option<String>,
        calls: Mutex<Vec<Vec<UploadedFile>>>,
    }

    impl StubNotesService {
        fn new() -> Self {
            Self {
                limits: UploadLimits::default(),
                secret: None,
                unsupported: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        async fn recorded_calls(&self) -> Vec<Vec<UploadedFile>> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl NotesApi for StubNotesService {
        async fn make_notes(&self, files: Vec<UploadedFile>) -> Result<Vec<u8>, NotesError> {
            self.calls.lock().await.push(files);
            match &self.unsupported {
                Some(name) => Err(ExtractError::UnsupportedType { name: name.clone() }.into()),
                None => Ok(b"PK-archive".to_vec()),
            }
        }

        fn limits(&self) -> UploadLimits {
            self.limits
        }

        fn shared_secret(&self) -> Option<&str> {
            self.secret.as_deref()
        }
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, filename, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/make-notes")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(secret) = secret {
            builder = builder.header("x-backend-secret", secret);
        }
        builder.body(Body::from(body)).expect("request")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = create_router(Arc::new(StubNotesService::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn successful_upload_returns_archive_with_download_headers() {
        let service = Arc::new(StubNotesService::new());
        let app = create_router(service.clone());
        let body = multipart_body(&[
            ("files", Some("week 1 notes.txt"), "Warfarin"),
            ("comment", None, "ignored"),
            ("files", Some("slides.pdf"), "%PDF-1.4"),
        ]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"notes.zip\""
        );
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&bytes[..], b"PK-archive");

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        let names: Vec<&str> = calls[0].iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec!["week_1_notes.txt", "slides.pdf"]);
        assert_eq!(calls[0][0].bytes, b"Warfarin");
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_before_the_pipeline() {
        let service = Arc::new(StubNotesService {
            secret: Some("s3cret".into()),
            ..StubNotesService::new()
        });
        let app = create_router(service.clone());
        let body = multipart_body(&[("files", Some("a.txt"), "text")]);

        let response = app
            .oneshot(upload_request(body, Some("guess")))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Unauthorized");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn missing_secret_wins_over_malformed_body() {
        let service = Arc::new(StubNotesService {
            secret: Some("s3cret".into()),
            ..StubNotesService::new()
        });
        let app = create_router(service);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/make-notes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request");

        let response = app.oneshot(request).await.expect("router response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn correct_secret_is_accepted() {
        let service = Arc::new(StubNotesService {
            secret: Some("s3cret".into()),
            ..StubNotesService::new()
        });
        let app = create_router(service.clone());
        let body = multipart_body(&[("files", Some("a.txt"), "text")]);

        let response = app
            .oneshot(upload_request(body, Some("s3cret")))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn too_many_files_is_a_bad_request() {
        let service = Arc::new(StubNotesService {
            limits: UploadLimits::from_megabytes(2, 25, 50),
            ..StubNotesService::new()
        });
        let app = create_router(service.clone());
        let body = multipart_body(&[
            ("files", Some("a.txt"), "a"),
            ("files", Some("b.txt"), "b"),
            ("files", Some("c.txt"), "c"),
        ]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Too many files (max 2)");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn oversized_file_is_payload_too_large() {
        let service = Arc::new(StubNotesService {
            limits: UploadLimits {
                max_files: 10,
                max_file_bytes: 4,
                max_total_bytes: 1024,
            },
            ..StubNotesService::new()
        });
        let app = create_router(service.clone());
        let body = multipart_body(&[("files", Some("big.txt"), "0123456789")]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let error = json_body(response).await["error"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        assert!(error.starts_with("big.txt too large"), "{error}");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn file_count_is_reported_before_an_earlier_oversized_file() {
        let service = Arc::new(StubNotesService {
            limits: UploadLimits {
                max_files: 2,
                max_file_bytes: 4,
                max_total_bytes: 1024,
            },
            ..StubNotesService::new()
        });
        let app = create_router(service.clone());
        let body = multipart_body(&[
            ("files", Some("a.txt"), "0123456789"),
            ("files", Some("b.txt"), "b"),
            ("files", Some("c.txt"), "c"),
        ]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Too many files (max 2)");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn first_oversized_file_is_reported_before_the_aggregate() {
        let service = Arc::new(StubNotesService {
            limits: UploadLimits {
                max_files: 10,
                max_file_bytes: 6,
                max_total_bytes: 8,
            },
            ..StubNotesService::new()
        });
        let app = create_router(service.clone());
        let body = multipart_body(&[
            ("files", Some("a.txt"), "012345"),
            ("files", Some("b.txt"), "012345"),
            ("files", Some("c.txt"), "0123456789"),
        ]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let error = json_body(response).await["error"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        assert!(error.starts_with("c.txt too large"), "{error}");
    }

    #[tokio::test]
    async fn form_without_files_is_a_bad_request() {
        let app = create_router(Arc::new(StubNotesService::new()));
        let body = multipart_body(&[("comment", None, "no uploads here")]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No files uploaded");
    }

    #[tokio::test]
    async fn pipeline_errors_are_reported_as_json() {
        let service = Arc::new(StubNotesService {
            unsupported: Some("image.png".into()),
            ..StubNotesService::new()
        });
        let app = create_router(service);
        let body = multipart_body(&[("files", Some("image.png"), "PNG image data")]);

        let response = app
            .oneshot(upload_request(body, None))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Unsupported file type: image.png"
        );
    }
}
