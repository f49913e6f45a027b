//! Document viewer state.
//!
//! Tracks what a PDF reader would display: the current page, the page count
//! once the file has loaded, a single pending navigation target, and the
//! load fault if the file could not be opened. Rendering itself is left to
//! whatever reader consumes this state.

use crate::api::ApiError;
use regex::bytes::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn page_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // `/Type /Page` but not `/Type /Pages`
        Regex::new(r"/Type\s*/Page(?:(?-u:[^s])|$)").expect("page object pattern is valid")
    })
}

/// Count the page objects of a PDF.
///
/// Returns `None` when no page object is visible, which happens for files
/// that keep their objects in compressed streams.
pub fn count_pages(pdf: &[u8]) -> Option<u32> {
    let count = page_object_pattern().find_iter(pdf).count();
    u32::try_from(count).ok().filter(|&n| n > 0)
}

/// Why the document file could not be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFault {
    /// The backend has no file for this document (yet).
    NotAvailable,
    /// Any other failure, with the underlying message.
    Failed(String),
}

impl From<&ApiError> for LoadFault {
    fn from(err: &ApiError) -> Self {
        if err.is_not_found() {
            LoadFault::NotAvailable
        } else {
            LoadFault::Failed(err.to_string())
        }
    }
}

impl fmt::Display for LoadFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFault::NotAvailable => write!(
                f,
                "PDF file not available. The document may still be processing, \
                 or the backend may not expose file download yet."
            ),
            LoadFault::Failed(message) => write!(f, "Failed to load PDF: {}", message),
        }
    }
}

/// Page-level state of the document viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerState {
    current_page: u32,
    page_count: Option<u32>,
    pending: Option<u32>,
    fault: Option<LoadFault>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            page_count: None,
            pending: None,
            fault: None,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    /// The navigation target not yet consumed, if any.
    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    pub fn fault(&self) -> Option<&LoadFault> {
        self.fault.as_ref()
    }

    /// Queue a jump to `page`. Replaces any target not yet consumed.
    pub fn request_page(&mut self, page: u32) {
        if let Some(previous) = self.pending.replace(page) {
            debug!("Navigation to page {} superseded by page {}", previous, page);
        }
    }

    /// Consume the pending target.
    ///
    /// Returns the page navigated to. A target below 1, or above a known page
    /// count, is discarded without moving.
    pub fn sync(&mut self) -> Option<u32> {
        let target = self.pending.take()?;

        if !self.accepts(target) {
            warn!(
                "Ignoring navigation to page {} (page count: {:?})",
                target, self.page_count
            );
            return None;
        }

        self.current_page = target;
        Some(target)
    }

    fn accepts(&self, page: u32) -> bool {
        page >= 1 && self.page_count.map_or(true, |count| page <= count)
    }

    /// Record a successful load of a document with `page_count` pages.
    ///
    /// Resets to the first page and then applies any pending target.
    pub fn on_load_success(&mut self, page_count: u32) -> Option<u32> {
        self.page_count = Some(page_count);
        self.current_page = 1;
        self.fault = None;
        self.sync()
    }

    pub fn on_load_error(&mut self, fault: LoadFault) {
        self.fault = Some(fault);
    }

    pub fn previous_page(&mut self) -> u32 {
        self.current_page = self.current_page.saturating_sub(1).max(1);
        self.current_page
    }

    pub fn next_page(&mut self) -> u32 {
        let limit = self.page_count.unwrap_or(self.current_page);
        self.current_page = self.current_page.saturating_add(1).min(limit.max(1));
        self.current_page
    }

    /// Whether `referenced` is the page currently on screen.
    pub fn is_highlighted(&self, referenced: Option<u32>) -> bool {
        referenced == Some(self.current_page)
    }
}
