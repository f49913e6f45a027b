//! Backend API access.
//!
//! This module provides the HTTP client for the Apex backend together with
//! its error type and document-list cache.

pub mod cache;
pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
