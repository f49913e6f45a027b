//! Text and JSON rendering of dashboard, document and answer views.
//!
//! Text output uses Markdown-style tables so it reads well in a terminal and
//! pastes cleanly into notes.

use crate::format::{
    format_currency, format_date, format_number, format_percent, format_text, MISSING,
};
use crate::models::{
    DocumentDetail, DocumentSummary, PortfolioMetrics, QuerySource, StatusBreakdown,
};
use crate::session::DocumentSession;
use anyhow::Result;
use serde::Serialize;

/// Everything shown on the dashboard, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView<'a> {
    pub metrics: PortfolioMetrics,
    pub status: StatusBreakdown,
    pub documents: &'a [DocumentSummary],
}

/// Render the full dashboard: metric cards followed by the deals table.
pub fn generate_dashboard(view: &DashboardView<'_>) -> String {
    let mut output = String::new();

    output.push_str("# Deal Intelligence\n\n");
    output.push_str("Portfolio overview and deal analysis\n\n");
    output.push_str(&generate_metrics_section(&view.metrics, &view.status));
    output.push_str(&generate_deals_section(view.documents));

    output
}

/// Generate the portfolio metric cards.
fn generate_metrics_section(metrics: &PortfolioMetrics, status: &StatusBreakdown) -> String {
    let mut section = String::new();

    section.push_str(
        "| Total Deals | Avg Cap Rate | Avg NOI | Avg Purchase Price | Avg Occupancy |\n",
    );
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        metrics.total_deals,
        format_percent(metrics.avg_cap_rate),
        format_currency(metrics.avg_noi),
        format_currency(metrics.avg_purchase_price),
        format_percent(metrics.avg_occupancy),
    ));

    if status.pending > 0 {
        section.push_str(&format!(
            "{} ready, {} still processing\n\n",
            status.ready, status.pending
        ));
    }

    section
}

/// Generate the deals table.
fn generate_deals_section(documents: &[DocumentSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Deals\n\n");

    if documents.is_empty() {
        section.push_str("No documents yet. Upload a PDF to get started.\n");
        return section;
    }

    section.push_str(
        "| Deal Name | Location | Property Type | Purchase Price | NOI | Cap Rate | Occupancy | Status | Created At | ID |\n",
    );
    section.push_str("|:---|:---|:---|---:|---:|---:|---:|:---|:---|:---|\n");

    for doc in documents {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | `{}` |\n",
            escape_cell(&doc.file_name),
            escape_cell(&format_text(doc.location.as_deref())),
            escape_cell(&format_text(doc.property_type.as_deref())),
            format_currency(doc.purchase_price),
            format_currency(doc.noi),
            format_percent(doc.cap_rate),
            format_percent(doc.occupancy),
            escape_cell(&status_badge(&doc.status)),
            format_date(Some(&doc.created_at)),
            escape_cell(&doc.id),
        ));
    }

    section
}

/// Make backend text safe inside a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Status label with a marker distinguishing ready documents.
pub fn status_badge(status: &str) -> String {
    if status == crate::models::STATUS_READY {
        format!("🟢 {}", status)
    } else {
        format!("🟡 {}", status)
    }
}

/// Render one document's extracted metrics and risk summary.
pub fn generate_document_detail(detail: &DocumentDetail) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", detail.file_name));
    output.push_str(&format!("- **Status:** {}\n", status_badge(&detail.status)));
    output.push_str(&format!(
        "- **Created:** {}\n\n",
        format_date(Some(&detail.created_at))
    ));

    output.push_str("## Extracted Metrics\n\n");

    match detail.metrics {
        Some(ref metrics) => {
            output.push_str("| Metric | Value |\n");
            output.push_str("|:---|---:|\n");
            let rows = [
                ("Purchase Price", format_currency(metrics.purchase_price)),
                ("NOI", format_currency(metrics.noi)),
                ("Cap Rate", format_percent(metrics.cap_rate)),
                ("Occupancy", format_percent(metrics.occupancy)),
                ("Units", format_number(metrics.units)),
                ("Year Built", format_number(metrics.year_built)),
                ("Property Type", format_text(metrics.property_type.as_deref())),
                ("Location", format_text(metrics.location.as_deref())),
            ];
            for (label, value) in rows {
                output.push_str(&format!("| {} | {} |\n", label, escape_cell(&value)));
            }
            output.push('\n');

            if let Some(risk) = metrics.risk_summary.as_deref().filter(|r| !r.is_empty()) {
                output.push_str("## Risk Summary\n\n");
                output.push_str(risk);
                output.push_str("\n\n");
            }
        }
        None if !detail.is_ready() => {
            output.push_str("Metrics will be available when processing completes.\n\n");
        }
        None => {
            output.push_str(&format!("No metrics were extracted ({}).\n\n", MISSING));
        }
    }

    output
}

/// Render the answer panel: answer text, cited sources and viewer position.
pub fn generate_answer(session: &DocumentSession) -> String {
    let mut output = String::new();

    if session.is_pending() {
        output.push_str("⏳ Waiting for an answer...\n\n");
    }

    if let Some(error) = session.last_error() {
        output.push_str(&format!("❌ {}\n\n", error));
    }

    let Some(answer) = session.answer() else {
        return output;
    };

    output.push_str("## Answer\n\n");
    output.push_str(answer.answer.trim());
    output.push_str("\n\n");

    let sources = answer.sources();
    if !sources.is_empty() {
        output.push_str(&format!("### Sources ({})\n\n", sources.len()));
        for (i, source) in sources.iter().enumerate() {
            output.push_str(&generate_source_line(
                i + 1,
                source,
                session.is_referenced(source),
            ));
        }
        output.push('\n');
    }

    output.push_str(&generate_viewer_line(session));
    output
}

/// One-line summary of the viewer position.
pub fn generate_viewer_line(session: &DocumentSession) -> String {
    let viewer = session.viewer();
    if let Some(fault) = viewer.fault() {
        return format!("⚠️  {}\n", fault);
    }

    let marker = if viewer.is_highlighted(session.referenced_page()) {
        " (referenced)"
    } else {
        ""
    };
    match viewer.page_count() {
        Some(count) => format!(
            "📄 Viewer: page {} of {}{}\n",
            viewer.current_page(),
            count,
            marker
        ),
        None => format!("📄 Viewer: page {}{}\n", viewer.current_page(), marker),
    }
}

fn generate_source_line(number: usize, source: &QuerySource, referenced: bool) -> String {
    let page = source
        .page
        .map_or_else(|| "?".to_string(), |p| p.to_string());
    let pointer = if referenced { "▶" } else { " " };

    let mut line = format!("{} {}. Page {}", pointer, number, page);
    if let Some(excerpt) = source.excerpt.as_deref().filter(|e| !e.is_empty()) {
        line.push_str(&format!(" — {}", truncate_excerpt(excerpt, 160)));
    }
    line.push('\n');
    line
}

/// Shorten an excerpt to at most `max_chars` characters on one line.
fn truncate_excerpt(excerpt: &str, max_chars: usize) -> String {
    let flat = excerpt.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }

    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Generate pretty JSON for any view.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{aggregate, status_breakdown};
    use crate::models::{DocumentMetrics, QueryResponse};

    fn create_test_documents() -> Vec<DocumentSummary> {
        let mut ready = DocumentSummary::new(
            "doc-1",
            "maple_court_om.pdf",
            "ready",
            "2024-01-05T10:00:00Z",
        );
        ready.purchase_price = Some(3_150_000.0);
        ready.noi = Some(158_000.0);
        ready.cap_rate = Some(0.05);
        ready.occupancy = Some(1.0);
        ready.location = Some("Austin, TX".to_string());
        ready.property_type = Some("Multifamily".to_string());

        let processing = DocumentSummary::new(
            "doc-2",
            "elm_street.pdf",
            "processing",
            "2024-02-01T08:30:00Z",
        );

        vec![ready, processing]
    }

    fn create_test_metrics(risk: Option<&str>) -> DocumentMetrics {
        DocumentMetrics {
            id: "m-1".to_string(),
            document_id: "doc-1".to_string(),
            purchase_price: Some(3_150_000.0),
            noi: Some(158_000.0),
            cap_rate: Some(0.05),
            occupancy: None,
            units: Some(24),
            year_built: Some(1987),
            property_type: Some("Multifamily".to_string()),
            location: None,
            risk_summary: risk.map(str::to_string),
            created_at: None,
        }
    }

    #[test]
    fn test_generate_dashboard() {
        let documents = create_test_documents();
        let view = DashboardView {
            metrics: aggregate(&documents),
            status: status_breakdown(&documents),
            documents: &documents,
        };

        let text = generate_dashboard(&view);

        assert!(text.contains("# Deal Intelligence"));
        assert!(text.contains("| 2 | 5.0% | $158,000 | $3,150,000 | 100.0% |"));
        assert!(text.contains("1 ready, 1 still processing"));
        assert!(text.contains("maple_court_om.pdf"));
        assert!(text.contains("🟢 ready"));
        assert!(text.contains("🟡 processing"));
        assert!(text.contains("Jan 5, 2024"));
    }

    #[test]
    fn test_generate_empty_dashboard() {
        let view = DashboardView {
            metrics: aggregate(&[]),
            status: status_breakdown(&[]),
            documents: &[],
        };

        let text = generate_dashboard(&view);

        assert!(text.contains("| 0 | — | — | — | — |"));
        assert!(text.contains("No documents yet"));
    }

    #[test]
    fn test_dashboard_json_marks_missing_averages() {
        let documents = create_test_documents();
        let mut only_processing = documents[1..].to_vec();
        only_processing[0].noi = Some(50_000.0);
        let view = DashboardView {
            metrics: aggregate(&only_processing),
            status: status_breakdown(&only_processing),
            documents: &only_processing,
        };

        let json = generate_json(&view).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metrics"]["total_deals"], 1);
        assert_eq!(value["metrics"]["avg_noi"], 50_000.0);
        assert!(value["metrics"]["avg_cap_rate"].is_null());
        assert_eq!(value["status"]["pending"], 1);
    }

    #[test]
    fn test_generate_document_detail() {
        let detail = DocumentDetail {
            id: "doc-1".to_string(),
            file_name: "maple_court_om.pdf".to_string(),
            status: "ready".to_string(),
            created_at: "2024-01-05T10:00:00Z".to_string(),
            metrics: Some(create_test_metrics(Some("Deferred maintenance on roofs."))),
        };

        let text = generate_document_detail(&detail);

        assert!(text.contains("| Cap Rate | 5.0% |"));
        assert!(text.contains("| Occupancy | — |"));
        assert!(text.contains("| Units | 24 |"));
        assert!(text.contains("| Year Built | 1987 |"));
        assert!(text.contains("## Risk Summary"));
        assert!(text.contains("Deferred maintenance"));
    }

    #[test]
    fn test_document_detail_while_processing() {
        let detail = DocumentDetail {
            id: "doc-2".to_string(),
            file_name: "elm_street.pdf".to_string(),
            status: "processing".to_string(),
            created_at: "2024-02-01T08:30:00Z".to_string(),
            metrics: None,
        };

        let text = generate_document_detail(&detail);

        assert!(text.contains("Metrics will be available when processing completes."));
        assert!(!text.contains("## Risk Summary"));
    }

    #[test]
    fn test_generate_answer_marks_referenced_source() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("Where is the NOI?").unwrap();
        session.complete_query(
            ticket,
            Ok(QueryResponse {
                answer: "NOI is shown on page 4.".to_string(),
                sources: Some(vec![
                    QuerySource {
                        page: Some(4),
                        excerpt: Some("Net Operating Income   $158,000".to_string()),
                    },
                    QuerySource {
                        page: None,
                        excerpt: None,
                    },
                ]),
            }),
        );
        session.viewer_mut().sync();

        let text = generate_answer(&session);

        assert!(text.contains("## Answer"));
        assert!(text.contains("### Sources (2)"));
        assert!(text.contains("▶ 1. Page 4 — Net Operating Income $158,000"));
        assert!(text.contains("  2. Page ?"));
        assert!(text.contains("📄 Viewer: page 4 (referenced)"));
    }

    #[test]
    fn test_generate_answer_without_answer() {
        let session = DocumentSession::new("doc-1");
        assert!(generate_answer(&session).is_empty());
    }

    #[test]
    fn test_viewer_line_reports_fault() {
        let mut session = DocumentSession::new("doc-1");
        assert_eq!(generate_viewer_line(&session), "📄 Viewer: page 1\n");

        session.viewer_mut().on_load_success(12);
        assert_eq!(generate_viewer_line(&session), "📄 Viewer: page 1 of 12\n");

        session
            .viewer_mut()
            .on_load_error(crate::viewer::LoadFault::NotAvailable);
        assert!(generate_viewer_line(&session).contains("PDF file not available"));
    }

    #[test]
    fn test_pending_query_shown() {
        let mut session = DocumentSession::new("doc-1");
        let _ticket = session.begin_query("NOI?").unwrap();

        assert!(generate_answer(&session).starts_with("⏳ Waiting for an answer"));
    }

    #[test]
    fn test_pending_query_hides_previous_answer() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("Where is the NOI?").unwrap();
        session.complete_query(
            ticket,
            Ok(QueryResponse {
                answer: "NOI is shown on page 4.".to_string(),
                sources: Some(vec![QuerySource {
                    page: Some(4),
                    excerpt: None,
                }]),
            }),
        );
        session.viewer_mut().sync();

        let _ticket = session.begin_query("And the cap rate?").unwrap();
        let text = generate_answer(&session);

        assert!(text.starts_with("⏳ Waiting for an answer"));
        assert!(!text.contains("NOI is shown on page 4."));
        assert!(!text.contains("(referenced)"));
    }

    #[test]
    fn test_table_cells_escape_pipes() {
        let mut doc = DocumentSummary::new(
            "doc-9",
            "North | South Portfolio.pdf",
            "ready",
            "2024-01-05T10:00:00Z",
        );
        doc.location = Some("Austin\nTX".to_string());
        let documents = vec![doc];
        let view = DashboardView {
            metrics: aggregate(&documents),
            status: status_breakdown(&documents),
            documents: &documents,
        };

        let text = generate_dashboard(&view);
        let row = text
            .lines()
            .find(|line| line.contains("North"))
            .unwrap();

        assert!(row.contains("North \\| South Portfolio.pdf"));
        assert!(row.contains("| Austin TX |"));
        assert_eq!(row.matches(" | ").count(), 9);
    }

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short\n  text", 20), "short text");
        assert_eq!(truncate_excerpt("abcdefghij", 4), "abcd…");
    }
}
