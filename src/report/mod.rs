//! Rendering of terminal views.

pub mod generator;

pub use generator::*;
