//! Initiative Viewer web front end
//!
//! Serves the analysis form, runs hierarchy builds and backward checks
//! against Jira, and offers the cached results as PDF, HTML and text
//! downloads.

pub mod form;
pub mod routes;
pub mod views;

// Re-export for convenience
pub use routes::{create_routes, AppContext};
