//! In-memory issue source for tests and fixtures.

use super::{IssueSource, SourceConnector};
use crate::domain::{Issue, IssueType};
use crate::errors::ViewerError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Failure injected for a query or issue key
#[derive(Debug, Clone)]
pub enum Failure {
    Auth,
    Permission,
    Query(String),
    Transport(String),
}

impl Failure {
    fn to_error(&self, target: &str) -> ViewerError {
        match self {
            Failure::Auth => ViewerError::RemoteAuth {
                target: target.to_string(),
            },
            Failure::Permission => ViewerError::RemotePermission {
                target: target.to_string(),
            },
            Failure::Query(message) => ViewerError::RemoteQuery {
                query: target.to_string(),
                message: message.clone(),
            },
            Failure::Transport(message) => ViewerError::RemoteTransport {
                target: target.to_string(),
                message: message.clone(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Issues in insertion order
    issues: Vec<Issue>,
    /// Registered JQL → result keys
    searches: HashMap<String, Vec<String>>,
    /// Query or key → injected failure
    failures: HashMap<String, Failure>,
    /// Every search and children request, in order
    requests: Vec<String>,
}

/// Issue source holding issues in memory.
///
/// Clones share state, so a test can keep a handle and inspect the requests
/// made through a clone handed to the code under test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIssueSource {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryIssueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue; its `parent_key` links it into the tree.
    pub fn with_issue(self, issue: Issue) -> Self {
        self.add_issue(issue);
        self
    }

    /// Register the keys returned for an exact JQL string.
    pub fn with_search(self, jql: &str, keys: &[&str]) -> Self {
        self.write()
            .searches
            .insert(jql.trim().to_string(), keys.iter().map(|k| k.to_string()).collect());
        self
    }

    /// Fail requests for a JQL string or a children lookup of a key.
    pub fn with_failure(self, target: &str, failure: Failure) -> Self {
        self.write().failures.insert(target.to_string(), failure);
        self
    }

    pub fn add_issue(&self, issue: Issue) {
        self.write().issues.push(issue);
    }

    /// Requests made so far (JQL for searches, key for children lookups)
    pub fn requests(&self) -> Vec<String> {
        self.read().requests.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IssueSource for InMemoryIssueSource {
    fn search(&self, jql: &str) -> Result<Vec<Issue>, ViewerError> {
        let jql = jql.trim();
        let mut inner = self.write();
        inner.requests.push(jql.to_string());

        if let Some(failure) = inner.failures.get(jql) {
            return Err(failure.to_error(jql));
        }

        let keys = inner.searches.get(jql).cloned().unwrap_or_default();
        Ok(keys
            .iter()
            .filter_map(|key| inner.issues.iter().find(|i| &i.key == key).cloned())
            .collect())
    }

    fn get_children(
        &self,
        key: &str,
        type_filter: Option<IssueType>,
    ) -> Result<Vec<Issue>, ViewerError> {
        let mut inner = self.write();
        inner.requests.push(key.to_string());

        if let Some(failure) = inner.failures.get(key) {
            return Err(failure.to_error(key));
        }

        // Breadth-first over parent links, like childIssuesOf
        let mut frontier = vec![key.to_string()];
        let mut descendants = Vec::new();
        while !frontier.is_empty() {
            let children: Vec<&Issue> = inner
                .issues
                .iter()
                .filter(|i| {
                    i.parent_key
                        .as_ref()
                        .is_some_and(|p| frontier.contains(p))
                })
                .collect();
            frontier = children.iter().map(|i| i.key.clone()).collect();
            descendants.extend(children.into_iter().cloned());
        }

        Ok(descendants
            .into_iter()
            .filter(|i| type_filter.map_or(true, |t| i.issue_type == t))
            .collect())
    }
}

impl SourceConnector for InMemoryIssueSource {
    fn connect(&self, _url: &str, _token: &str) -> Result<Box<dyn IssueSource>, ViewerError> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> InMemoryIssueSource {
        InMemoryIssueSource::new()
            .with_issue(Issue::new("I-1", "Init", IssueType::Initiative))
            .with_issue(Issue::new("F-1", "Feature", IssueType::Feature).with_parent("I-1"))
            .with_issue(Issue::new("SF-1", "Sub", IssueType::SubFeature).with_parent("F-1"))
            .with_issue(Issue::new("E-1", "Epic", IssueType::Epic).with_parent("SF-1"))
            .with_search("project = X", &["I-1"])
    }

    #[test]
    fn test_search_returns_registered_keys() {
        let source = source();
        let found = source.search(" project = X ").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "I-1");
        assert!(source.search("project = Y").unwrap().is_empty());
    }

    #[test]
    fn test_get_children_returns_descendants_filtered_by_type() {
        let source = source();
        let subs = source.get_children("I-1", Some(IssueType::SubFeature)).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].key, "SF-1");

        let all = source.get_children("I-1", None).unwrap();
        let keys: Vec<_> = all.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["F-1", "SF-1", "E-1"]);
    }

    #[test]
    fn test_injected_failure() {
        let source = source().with_failure("F-1", Failure::Permission);
        let err = source.get_children("F-1", None).unwrap_err();
        assert!(matches!(err, ViewerError::RemotePermission { target } if target == "F-1"));
    }

    #[test]
    fn test_clones_share_request_log() {
        let source = source();
        let handle = source.clone();
        source.get_children("I-1", None).unwrap();
        assert_eq!(handle.requests(), vec!["I-1".to_string()]);
    }
}
