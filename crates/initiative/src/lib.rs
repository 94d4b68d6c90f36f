//! Initiative Viewer Library
//!
//! Rebuilds the Business Initiative → Feature → Sub-Feature → Epic hierarchy
//! from a Jira instance, runs the backward check analysis, caches results and
//! renders them as PDF, Confluence HTML and plain-text reports.

pub mod backward_check;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod hierarchy;
pub mod jira;
pub mod report;
pub mod stats;

// Re-export commonly used types
pub use backward_check::{BackwardCheckAnalyzer, BackwardCheckResult};
pub use cache::{AnalysisResult, CacheStore, DiskCacheStore, InMemoryCacheStore, ResultCache};
pub use config::ViewerConfig;
pub use domain::{Hierarchy, Issue, IssueType};
pub use errors::ViewerError;
pub use hierarchy::HierarchyBuilder;
pub use jira::{InMemoryIssueSource, IssueSource, JiraClient, JiraConnector, SourceConnector};
pub use stats::StatisticsSnapshot;
