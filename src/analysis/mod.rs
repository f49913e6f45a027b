//! Analysis modules.
//!
//! Pure computations over data returned by the backend: portfolio
//! aggregation and page references in answers.

pub mod aggregator;
pub mod citations;

pub use aggregator::*;
pub use citations::*;
