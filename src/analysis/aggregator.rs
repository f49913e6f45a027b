//! Portfolio aggregation and statistics.
//!
//! This module computes the dashboard's portfolio-level numbers from a
//! snapshot of the document list.

use crate::models::{DocumentSummary, PortfolioMetrics, StatusBreakdown};

/// Compute portfolio metrics for a list of documents.
///
/// Each average only considers the documents where that particular field is
/// present, so a document missing `cap_rate` still contributes its `noi`.
pub fn aggregate(documents: &[DocumentSummary]) -> PortfolioMetrics {
    PortfolioMetrics {
        total_deals: documents.len(),
        avg_cap_rate: mean_of(documents, |d| d.cap_rate),
        avg_noi: mean_of(documents, |d| d.noi),
        avg_purchase_price: mean_of(documents, |d| d.purchase_price),
        avg_occupancy: mean_of(documents, |d| d.occupancy),
    }
}

/// Arithmetic mean of one optional field, `None` when no document has it.
pub fn mean_of<F>(documents: &[DocumentSummary], field: F) -> Option<f64>
where
    F: Fn(&DocumentSummary) -> Option<f64>,
{
    let (sum, count) = documents
        .iter()
        .filter_map(field)
        .fold((0.0_f64, 0_usize), |(sum, count), value| {
            (sum + value, count + 1)
        });

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Count ready documents against everything still in flight.
pub fn status_breakdown(documents: &[DocumentSummary]) -> StatusBreakdown {
    let ready = documents.iter().filter(|d| d.is_ready()).count();

    StatusBreakdown {
        ready,
        pending: documents.len() - ready,
    }
}
