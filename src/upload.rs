//! PDF upload flow.
//!
//! Reads and checks a local file, sends it to the backend, and on success
//! refreshes the document list so the new deal shows up on the dashboard.

use crate::api::{ApiClient, ApiError};
use crate::models::DocumentSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Errors from the upload flow.
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is empty")]
    Empty { path: String },
    #[error("{path} is not a PDF file")]
    NotPdf { path: String },
    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Result of a completed upload.
#[derive(Debug)]
pub struct UploadOutcome {
    /// The document as created by the backend.
    pub document: DocumentSummary,
    /// The refreshed list, `None` if the refresh itself failed.
    pub documents: Option<Vec<DocumentSummary>>,
}

/// Options for [`upload_pdf`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    /// Show a spinner while the request is in flight.
    pub show_progress: bool,
}

/// Read `path` and check it looks like a PDF.
///
/// A file passes when it has a `.pdf` extension (any case) or starts with
/// the `%PDF` header.
pub fn read_pdf(path: &Path) -> Result<(String, Vec<u8>), UploadError> {
    let display = path.display().to_string();

    let content = std::fs::read(path).map_err(|source| UploadError::Read {
        path: display.clone(),
        source,
    })?;

    if content.is_empty() {
        return Err(UploadError::Empty { path: display });
    }

    let has_pdf_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !has_pdf_extension && !content.starts_with(PDF_MAGIC) {
        return Err(UploadError::NotPdf { path: display });
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.pdf")
        .to_string();

    debug!("Read {} ({} bytes)", file_name, content.len());
    Ok((file_name, content))
}

/// Upload the PDF at `path`.
///
/// A failed upload leaves the cached document list untouched.
pub async fn upload_pdf(
    client: &ApiClient,
    path: &Path,
    options: UploadOptions,
) -> Result<UploadOutcome, UploadError> {
    let (file_name, content) = read_pdf(path)?;

    let spinner = options.show_progress.then(|| create_spinner(&file_name));

    let result = client.upload_document(&file_name, content).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let document = result?;
    info!("Upload accepted, document {} is {}", document.id, document.status);

    let documents = match client.refresh_documents().await {
        Ok(documents) => {
            if client.cached_document(&document.id).is_none() {
                warn!("Document {} is not listed by the backend yet", document.id);
            }
            Some(documents)
        }
        Err(e) => {
            warn!("Uploaded, but failed to refresh document list: {}", e);
            None
        }
    };

    Ok(UploadOutcome {
        document,
        documents,
    })
}

fn create_spinner(file_name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Uploading {}...", file_name));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{spawn_backend, test_client};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn create_test_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn backend(accept_upload: bool) -> Router {
        let uploaded = Arc::new(AtomicBool::new(false));
        let seen = uploaded.clone();

        Router::new().route(
            "/documents",
            get(move || {
                let seen = seen.clone();
                async move {
                    let mut documents = vec![json!({
                        "id": "doc-1",
                        "file_name": "maple_court_om.pdf",
                        "status": "ready",
                        "created_at": "2024-01-05T10:00:00Z"
                    })];
                    if seen.load(Ordering::SeqCst) {
                        documents.push(json!({
                            "id": "doc-2",
                            "file_name": "elm_street.pdf",
                            "status": "processing",
                            "created_at": "2024-02-01T08:30:00Z"
                        }));
                    }
                    Json(json!(documents))
                }
            })
            .post(move || {
                let uploaded = uploaded.clone();
                async move {
                    if !accept_upload {
                        return (StatusCode::PAYLOAD_TOO_LARGE, "File too large").into_response();
                    }
                    uploaded.store(true, Ordering::SeqCst);
                    Json(json!({
                        "id": "doc-2",
                        "file_name": "elm_street.pdf",
                        "status": "processing",
                        "created_at": "2024-02-01T08:30:00Z"
                    }))
                    .into_response()
                }
            }),
        )
    }

    #[test]
    fn test_read_pdf_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_file(&dir, "Deal.PDF", b"binary");

        let (name, content) = read_pdf(&path).unwrap();

        assert_eq!(name, "Deal.PDF");
        assert_eq!(content, b"binary");
    }

    #[test]
    fn test_read_pdf_by_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_file(&dir, "scan", b"%PDF-1.7\n...");

        assert!(read_pdf(&path).is_ok());
    }

    #[test]
    fn test_read_pdf_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = create_test_file(&dir, "notes.txt", b"hello");
        let empty = create_test_file(&dir, "empty.pdf", b"");

        assert!(matches!(read_pdf(&text), Err(UploadError::NotPdf { .. })));
        assert!(matches!(read_pdf(&empty), Err(UploadError::Empty { .. })));
        assert!(matches!(
            read_pdf(&dir.path().join("missing.pdf")),
            Err(UploadError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_refreshes_document_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_file(&dir, "elm_street.pdf", b"%PDF-1.4");
        let client = test_client(&spawn_backend(backend(true)).await);
        assert_eq!(client.list_documents().await.unwrap().len(), 1);

        let outcome = upload_pdf(&client, &path, UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.document.id, "doc-2");
        assert_eq!(outcome.documents.map(|d| d.len()), Some(2));
        assert_eq!(client.cached_documents().map(|d| d.len()), Some(2));
    }

    #[tokio::test]
    async fn test_rejected_upload_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_file(&dir, "huge.pdf", b"%PDF-1.4");
        let client = test_client(&spawn_backend(backend(false)).await);
        let before = client.list_documents().await.unwrap();

        let err = upload_pdf(&client, &path, UploadOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "File too large");
        assert_eq!(client.cached_documents(), Some(before));
    }
}
