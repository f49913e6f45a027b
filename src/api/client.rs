//! HTTP client for the Apex backend.

use super::cache::DocumentCache;
use super::error::ApiError;
use crate::models::{DocumentDetail, DocumentSummary, QueryRequest, QueryResponse};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

const PDF_MIME: &str = "application/pdf";

/// Client for the document, query and file endpoints.
///
/// Holds the document-list cache; see [`DocumentCache`].
pub struct ApiClient {
    base_url: String,
    base: Url,
    http_client: reqwest::Client,
    cache: Mutex<DocumentCache>,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                details: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::Transport {
                details: format!("invalid backend URL: {}", base_url),
            })?;

        Ok(Self {
            base_url,
            base,
            http_client,
            cache: Mutex::new(DocumentCache::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path under which the local gateway serves a document's PDF.
    pub fn document_file_path(id: &str) -> String {
        format!("/api/documents/{}/file", id)
    }

    /// Backend URL for `segments`, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Backend URL under `/documents/{id}`.
    ///
    /// Ids that would not stay a single path segment are refused.
    fn document_endpoint(&self, id: &str, rest: &[&str]) -> Result<Url, ApiError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(ApiError::InvalidId { id: id.to_string() });
        }

        let mut segments = vec!["documents", id];
        segments.extend_from_slice(rest);
        Ok(self.endpoint(&segments))
    }

    fn cache(&self) -> MutexGuard<'_, DocumentCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decode a 2xx body or turn anything else into [`ApiError::Status`].
    async fn handle_response<T: DeserializeOwned>(
        res: reqwest::Response,
        operation: &str,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let status = res.status();
        if status.is_success() {
            debug!("{} successful", operation);
            return res.json::<T>().await.map_err(|e| ApiError::Decode {
                details: e.to_string(),
            });
        }

        warn!("unexpected status {} for {}", status, operation);
        let body = res.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, body, fallback))
    }

    /// List all documents, serving from the cache when it is populated.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        if let Some(cached) = self.cached_documents() {
            debug!("Serving {} documents from cache", cached.len());
            return Ok(cached);
        }

        self.refresh_documents().await
    }

    /// Fetch the document list from the backend and replace the cache.
    pub async fn refresh_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        info!("Fetching document list from {}", self.base_url);

        let res = self.http_client.get(self.endpoint(&["documents"])).send().await?;
        let documents: Vec<DocumentSummary> =
            Self::handle_response(res, "document list", "API error").await?;

        self.cache().store(documents.clone());
        Ok(documents)
    }

    /// The cached list without touching the network.
    pub fn cached_documents(&self) -> Option<Vec<DocumentSummary>> {
        self.cache().documents().map(|d| d.to_vec())
    }

    /// Look up one summary in the cached list without touching the network.
    pub fn cached_document(&self, id: &str) -> Option<DocumentSummary> {
        self.cache().get(id).cloned()
    }

    pub fn invalidate_documents(&self) {
        let mut cache = self.cache();
        if cache.is_populated() {
            debug!("Invalidating document cache");
        }
        cache.invalidate();
    }

    /// Fetch one document with its extracted metrics.
    pub async fn get_document(&self, id: &str) -> Result<DocumentDetail, ApiError> {
        info!("Fetching document {}", id);

        let res = self
            .http_client
            .get(self.document_endpoint(id, &[])?)
            .send()
            .await?;

        Self::handle_response(res, "document detail", "API error").await
    }

    /// Upload a PDF. The document cache is invalidated only on success.
    pub async fn upload_document(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<DocumentSummary, ApiError> {
        info!("Uploading {} ({} bytes)", file_name, content.len());

        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = Form::new().part("file", part);

        let res = self
            .http_client
            .post(self.endpoint(&["documents"]))
            .multipart(form)
            .send()
            .await?;

        let created: DocumentSummary =
            Self::handle_response(res, "document upload", "Upload failed").await?;

        self.invalidate_documents();
        info!("Uploaded {} as {}", created.file_name, created.id);
        Ok(created)
    }

    /// Ask a question about one document.
    pub async fn query_document(
        &self,
        id: &str,
        question: &str,
    ) -> Result<QueryResponse, ApiError> {
        info!("Querying document {}", id);
        debug!("Question: {}", question);

        let request = QueryRequest {
            question: question.to_string(),
        };

        let res = self
            .http_client
            .post(self.document_endpoint(id, &["query"])?)
            .json(&request)
            .send()
            .await?;

        Self::handle_response(res, "document query", "API error").await
    }

    /// Open the PDF stream of a document.
    ///
    /// On success the raw response is returned so callers can forward its
    /// headers and stream the body.
    pub async fn fetch_document_file(&self, id: &str) -> Result<reqwest::Response, ApiError> {
        debug!("Fetching file for document {}", id);

        let res = self
            .http_client
            .get(self.document_endpoint(id, &["file"])?)
            .header(ACCEPT, PDF_MIME)
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        warn!("File for document {} unavailable: {}", id, status);
        let body = res.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, body, "API error"))
    }
}
