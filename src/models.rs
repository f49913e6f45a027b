//! Data models for the deal-intelligence client.
//!
//! This module contains the wire types exchanged with the backend and the
//! derived portfolio statistics shown on the dashboard.

use serde::{Deserialize, Serialize};

/// Lifecycle label reserved for documents whose extraction has finished.
pub const STATUS_READY: &str = "ready";

/// One row of the portfolio list returned by `GET /documents`.
///
/// Every numeric field is optional: `None` means "not extracted yet" and is
/// never treated as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Opaque identifier assigned by the backend.
    pub id: String,
    /// Display name of the uploaded file.
    pub file_name: String,
    /// Lifecycle label, e.g. "ready" or "processing".
    pub status: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    /// Net operating income.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noi: Option<f64>,
    /// Cap rate as a fraction (0.05 = 5%).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_rate: Option<f64>,
    /// Occupancy as a fraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl DocumentSummary {
    /// Creates a summary with no extracted metrics.
    pub fn new(
        id: impl Into<String>,
        file_name: impl Into<String>,
        status: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            status: status.into(),
            created_at: created_at.into(),
            purchase_price: None,
            noi: None,
            cap_rate: None,
            occupancy: None,
            units: None,
            year_built: None,
            property_type: None,
            location: None,
        }
    }

    /// Whether extraction has completed for this document.
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_READY
    }
}

/// Extracted metrics attached to a document detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetrics {
    pub id: String,
    pub document_id: String,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub noi: Option<f64>,
    #[serde(default)]
    pub cap_rate: Option<f64>,
    #[serde(default)]
    pub occupancy: Option<f64>,
    #[serde(default)]
    pub units: Option<u32>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Free-text risk narrative produced by the extraction backend.
    #[serde(default)]
    pub risk_summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response of `GET /documents/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub id: String,
    pub file_name: String,
    pub status: String,
    pub created_at: String,
    /// Absent while the document is still being processed.
    #[serde(default)]
    pub metrics: Option<DocumentMetrics>,
}

impl DocumentDetail {
    pub fn is_ready(&self) -> bool {
        self.status == STATUS_READY
    }
}

/// Body of `POST /documents/{id}/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub question: String,
}

/// A citation returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Response of `POST /documents/{id}/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<QuerySource>>,
}

impl QueryResponse {
    /// Returns the cited sources, empty when the backend sent none.
    pub fn sources(&self) -> &[QuerySource] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// Portfolio-level statistics derived from a document list.
///
/// Each average is `None` when no document carries that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Number of documents, including those without extracted metrics.
    pub total_deals: usize,
    pub avg_cap_rate: Option<f64>,
    pub avg_noi: Option<f64>,
    pub avg_purchase_price: Option<f64>,
    pub avg_occupancy: Option<f64>,
}

/// Ready vs. in-progress document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub ready: usize,
    pub pending: usize,
}
