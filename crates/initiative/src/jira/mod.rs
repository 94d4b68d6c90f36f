//! Remote issue access.
//!
//! [`IssueSource`] is the seam between the analysis code and Jira. The
//! production implementation is [`JiraClient`]; [`InMemoryIssueSource`] backs
//! tests and fixtures.

mod client;
pub mod fields;
mod memory;

pub use client::JiraClient;
pub use memory::{Failure, InMemoryIssueSource};

use crate::config::JiraConfig;
use crate::domain::{Issue, IssueType};
use crate::errors::ViewerError;

/// Read access to a remote issue tracker
pub trait IssueSource: Send + Sync {
    /// Run a JQL search, following pagination.
    fn search(&self, jql: &str) -> Result<Vec<Issue>, ViewerError>;

    /// Descendants of `key`, optionally restricted to one issue type.
    fn get_children(
        &self,
        key: &str,
        type_filter: Option<IssueType>,
    ) -> Result<Vec<Issue>, ViewerError>;
}

/// Creates an [`IssueSource`] for a server URL and access token
pub trait SourceConnector: Send + Sync {
    fn connect(&self, url: &str, token: &str) -> Result<Box<dyn IssueSource>, ViewerError>;
}

/// Connects to a real Jira instance
#[derive(Debug, Clone, Default)]
pub struct JiraConnector {
    config: JiraConfig,
}

impl JiraConnector {
    pub fn new(config: JiraConfig) -> Self {
        Self { config }
    }
}

impl SourceConnector for JiraConnector {
    fn connect(&self, url: &str, token: &str) -> Result<Box<dyn IssueSource>, ViewerError> {
        if !url.starts_with("http") {
            return Err(ViewerError::input("server URL", "must start with http"));
        }
        Ok(Box::new(JiraClient::new(url, token, &self.config)))
    }
}

/// JQL selecting the descendants of an issue.
pub fn children_jql(key: &str, type_filter: Option<IssueType>) -> String {
    match type_filter {
        Some(issue_type) => format!(
            "issuekey in childIssuesOf(\"{}\") AND issuetype = \"{}\"",
            key,
            issue_type.jql_name()
        ),
        None => format!("issuekey in childIssuesOf(\"{}\")", key),
    }
}

/// JQL selecting a list of issues by key, `None` when the list is empty.
pub fn keys_jql(keys: &[String]) -> Option<String> {
    if keys.is_empty() {
        None
    } else {
        Some(format!("issuekey in ({})", keys.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_jql() {
        assert_eq!(
            children_jql("INIT-1", Some(IssueType::SubFeature)),
            "issuekey in childIssuesOf(\"INIT-1\") AND issuetype = \"Sub-Feature\""
        );
        assert_eq!(
            children_jql("EPIC-9", None),
            "issuekey in childIssuesOf(\"EPIC-9\")"
        );
    }

    #[test]
    fn test_keys_jql() {
        assert_eq!(keys_jql(&[]), None);
        assert_eq!(
            keys_jql(&["A-1".to_string(), "B-2".to_string()]).as_deref(),
            Some("issuekey in (A-1, B-2)")
        );
    }

    #[test]
    fn test_jira_connector_rejects_non_http_url() {
        let connector = JiraConnector::default();
        assert!(connector.connect("ftp://jira", "token").is_err());
        assert!(connector.connect("https://jira.example.com", "token").is_ok());
    }
}
