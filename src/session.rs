//! Question-answering session for one document.
//!
//! A session pairs the answer panel with the document viewer: it guards
//! against overlapping queries, drops answers that arrive after the user
//! has moved on, and turns page references into viewer navigation.

use crate::analysis::extract_page_reference;
use crate::api::{ApiClient, ApiError};
use crate::models::{QueryResponse, QuerySource};
use crate::viewer::{count_pages, LoadFault, ViewerState};
use tracing::{debug, info, warn};

/// Reasons a session refuses an interaction.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("a question is already being answered")]
    QueryPending,
    #[error("no source #{number} (answer cites {count})")]
    NoSuchSource { number: usize, count: usize },
}

/// Handle for a query in flight, tied to the session generation that issued it.
#[derive(Debug)]
pub struct QueryTicket {
    generation: u64,
    question: String,
}

impl QueryTicket {
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// What happened to a completed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The answer was accepted; carries the page reference found in it.
    Answered { referenced_page: Option<u32> },
    /// The backend call failed; carries the message to display.
    Failed(String),
    /// The session moved on before the answer arrived.
    Discarded,
}

/// State of the document page: answer, citations and viewer.
#[derive(Debug)]
pub struct DocumentSession {
    document_id: String,
    generation: u64,
    in_flight: bool,
    answer: Option<QueryResponse>,
    referenced_page: Option<u32>,
    last_error: Option<String>,
    viewer: ViewerState,
}

impl DocumentSession {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            generation: 0,
            in_flight: false,
            answer: None,
            referenced_page: None,
            last_error: None,
            viewer: ViewerState::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
    }

    pub fn answer(&self) -> Option<&QueryResponse> {
        self.answer.as_ref()
    }

    /// Page reference extracted from the current answer.
    pub fn referenced_page(&self) -> Option<u32> {
        self.referenced_page
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut ViewerState {
        &mut self.viewer
    }

    /// Start a query. Refused for blank questions or while another query is
    /// still pending.
    ///
    /// The previous answer, its page reference and any error are cleared.
    pub fn begin_query(&mut self, question: &str) -> Result<QueryTicket, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        if self.in_flight {
            return Err(SessionError::QueryPending);
        }

        self.in_flight = true;
        self.answer = None;
        self.referenced_page = None;
        self.last_error = None;
        Ok(QueryTicket {
            generation: self.generation,
            question: question.to_string(),
        })
    }

    /// Apply the result of a query started with [`begin_query`](Self::begin_query).
    pub fn complete_query(
        &mut self,
        ticket: QueryTicket,
        result: Result<QueryResponse, ApiError>,
    ) -> QueryOutcome {
        if ticket.generation != self.generation {
            debug!(
                "Discarding stale answer for '{}' (generation {} != {})",
                ticket.question, ticket.generation, self.generation
            );
            return QueryOutcome::Discarded;
        }

        self.in_flight = false;

        match result {
            Ok(response) => {
                let referenced_page = extract_page_reference(&response.answer);
                if let Some(page) = referenced_page {
                    info!("Answer references page {}", page);
                    self.viewer.request_page(page);
                }

                self.referenced_page = referenced_page;
                self.answer = Some(response);
                self.last_error = None;
                QueryOutcome::Answered { referenced_page }
            }
            Err(err) => {
                let message = err.to_string();
                self.last_error = Some(message.clone());
                QueryOutcome::Failed(message)
            }
        }
    }

    /// Ask `question` through `client` and apply the answer.
    pub async fn ask(
        &mut self,
        client: &ApiClient,
        question: &str,
    ) -> Result<QueryOutcome, SessionError> {
        let ticket = self.begin_query(question)?;
        let result = client
            .query_document(&self.document_id, ticket.question())
            .await;
        Ok(self.complete_query(ticket, result))
    }

    /// Open the document file in the viewer.
    ///
    /// Returns the page count when it could be determined. A failed load is
    /// recorded as the viewer fault; the session stays usable for questions.
    pub async fn load_document(&mut self, client: &ApiClient) -> Option<u32> {
        let result = match client.fetch_document_file(&self.document_id).await {
            Ok(res) => res.bytes().await.map_err(ApiError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(pdf) => match count_pages(&pdf) {
                Some(count) => {
                    debug!("Loaded {} ({} pages)", self.document_id, count);
                    self.viewer.on_load_success(count);
                    Some(count)
                }
                None => {
                    debug!("Loaded {}, page count unknown", self.document_id);
                    None
                }
            },
            Err(e) => {
                let fault = LoadFault::from(&e);
                warn!("{}", fault);
                self.viewer.on_load_error(fault);
                None
            }
        }
    }

    /// Jump to the page of the `number`th cited source (1-based).
    ///
    /// Returns the requested page, or `None` when that source has no page.
    pub fn select_source(&mut self, number: usize) -> Result<Option<u32>, SessionError> {
        let sources = self.answer.as_ref().map(|a| a.sources()).unwrap_or(&[]);
        let source = number
            .checked_sub(1)
            .and_then(|index| sources.get(index))
            .ok_or(SessionError::NoSuchSource {
                number,
                count: sources.len(),
            })?;

        let page = source.page;
        if let Some(page) = page {
            debug!("Source #{} selected, page {}", number, page);
            self.viewer.request_page(page);
        }
        Ok(page)
    }

    /// Whether `source` cites the page referenced by the answer text.
    pub fn is_referenced(&self, source: &QuerySource) -> bool {
        source.page.is_some() && source.page == self.referenced_page
    }

    /// Leave the document: forget the answer and ignore any reply still in flight.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.answer = None;
        self.referenced_page = None;
        self.last_error = None;
        self.viewer = ViewerState::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{spawn_backend, test_client};
    use axum::http::header;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use reqwest::StatusCode;
    use serde_json::json;

    fn answer(text: &str, pages: &[Option<u32>]) -> QueryResponse {
        QueryResponse {
            answer: text.to_string(),
            sources: Some(
                pages
                    .iter()
                    .map(|page| QuerySource {
                        page: *page,
                        excerpt: Some("excerpt".to_string()),
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_blank_question_rejected() {
        let mut session = DocumentSession::new("doc-1");
        assert_eq!(
            session.begin_query("   \n").unwrap_err(),
            SessionError::EmptyQuestion
        );
        assert!(!session.is_pending());
    }

    #[test]
    fn test_second_query_rejected_while_pending() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("What is the NOI?").unwrap();
        assert_eq!(ticket.question(), "What is the NOI?");

        assert_eq!(
            session.begin_query("And the cap rate?").unwrap_err(),
            SessionError::QueryPending
        );

        session.complete_query(ticket, Ok(answer("About $158K.", &[])));
        assert!(session.begin_query("And the cap rate?").is_ok());
    }

    #[test]
    fn test_answer_reference_requests_navigation() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("Where is the rent roll?").unwrap();

        let outcome = session.complete_query(
            ticket,
            Ok(answer("The rent roll is on Page 14, summary on page 2.", &[Some(14)])),
        );

        assert_eq!(
            outcome,
            QueryOutcome::Answered {
                referenced_page: Some(14)
            }
        );
        assert_eq!(session.viewer().pending(), Some(14));
        assert_eq!(session.viewer_mut().sync(), Some(14));
        assert!(session.viewer().is_highlighted(session.referenced_page()));
    }

    #[test]
    fn test_source_selection_takes_precedence() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("Occupancy?").unwrap();
        session.complete_query(
            ticket,
            Ok(answer("Occupancy is 96% (page 3).", &[Some(3), Some(8), None])),
        );

        assert_eq!(session.select_source(2), Ok(Some(8)));
        assert_eq!(session.viewer().pending(), Some(8));
        assert_eq!(session.viewer_mut().sync(), Some(8));

        let sources = session.answer().unwrap().sources().to_vec();
        assert!(session.is_referenced(&sources[0]));
        assert!(!session.is_referenced(&sources[1]));
        assert!(!session.is_referenced(&sources[2]));
    }

    #[test]
    fn test_source_without_page_is_noop() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("Year built?").unwrap();
        session.complete_query(ticket, Ok(answer("Built in 1987.", &[None])));

        assert_eq!(session.select_source(1), Ok(None));
        assert_eq!(session.viewer().pending(), None);
    }

    #[test]
    fn test_unknown_source_number() {
        let mut session = DocumentSession::new("doc-1");
        assert_eq!(
            session.select_source(1),
            Err(SessionError::NoSuchSource {
                number: 1,
                count: 0
            })
        );
        assert_eq!(
            session.select_source(0),
            Err(SessionError::NoSuchSource {
                number: 0,
                count: 0
            })
        );
    }

    #[test]
    fn test_stale_answer_discarded_after_reset() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("Risks?").unwrap();

        session.reset();
        let outcome = session.complete_query(ticket, Ok(answer("See page 5.", &[])));

        assert_eq!(outcome, QueryOutcome::Discarded);
        assert!(session.answer().is_none());
        assert_eq!(session.viewer().pending(), None);
        assert!(!session.is_pending());
    }

    #[test]
    fn test_new_query_clears_previous_answer() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("NOI?").unwrap();
        session.complete_query(ticket, Ok(answer("NOI is on page 4.", &[Some(4)])));
        assert_eq!(session.referenced_page(), Some(4));

        let ticket = session.begin_query("Cap rate?").unwrap();
        assert!(session.answer().is_none());
        assert_eq!(session.referenced_page(), None);

        let outcome = session.complete_query(
            ticket,
            Err(ApiError::from_status(
                StatusCode::SERVICE_UNAVAILABLE,
                String::new(),
                "API error",
            )),
        );

        assert_eq!(outcome, QueryOutcome::Failed("API error 503".to_string()));
        assert_eq!(session.last_error(), Some("API error 503"));
        assert!(session.answer().is_none());
        assert_eq!(session.referenced_page(), None);
        assert!(!session.is_pending());
    }

    #[test]
    fn test_new_query_clears_previous_error() {
        let mut session = DocumentSession::new("doc-1");
        let ticket = session.begin_query("NOI?").unwrap();
        session.complete_query(
            ticket,
            Err(ApiError::from_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                String::new(),
                "API error",
            )),
        );
        assert!(session.last_error().is_some());

        session.begin_query("NOI again?").unwrap();
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_ask_through_backend() {
        let app = Router::new().route(
            "/documents/:id/query",
            post(|| async {
                Json(json!({
                    "answer": "Purchase price is listed on page 2.",
                    "sources": [{"page": 2, "excerpt": "Offered at $3,150,000"}]
                }))
            }),
        );
        let client = test_client(&spawn_backend(app).await);
        let mut session = DocumentSession::new("doc-1");

        let outcome = session
            .ask(&client, "  What is the purchase price?  ")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            QueryOutcome::Answered {
                referenced_page: Some(2)
            }
        );
        assert_eq!(session.answer().unwrap().sources().len(), 1);
    }

    #[tokio::test]
    async fn test_load_document_bounds_navigation() {
        let app = Router::new()
            .route(
                "/documents/:id/file",
                get(|| async {
                    (
                        [(header::CONTENT_TYPE, "application/pdf")],
                        "%PDF-1.4 << /Type /Page >> << /Type /Page >> << /Type /Pages >>",
                    )
                }),
            )
            .route(
                "/documents/:id/query",
                post(|| async { Json(json!({"answer": "See page 9."})) }),
            );
        let client = test_client(&spawn_backend(app).await);
        let mut session = DocumentSession::new("doc-1");

        assert_eq!(session.load_document(&client).await, Some(2));
        session.ask(&client, "Where?").await.unwrap();

        assert_eq!(session.viewer_mut().sync(), None);
        assert_eq!(session.viewer().current_page(), 1);
    }

    #[tokio::test]
    async fn test_load_document_missing_file() {
        let app = Router::new().route(
            "/documents/:id/file",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let client = test_client(&spawn_backend(app).await);
        let mut session = DocumentSession::new("doc-1");

        assert_eq!(session.load_document(&client).await, None);
        assert_eq!(session.viewer().fault(), Some(&LoadFault::NotAvailable));
    }
}
