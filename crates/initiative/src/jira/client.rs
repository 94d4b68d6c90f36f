//! Blocking Jira REST client.

use super::fields::{discover_risk_field, map_issue, FieldMapping};
use super::{children_jql, IssueSource};
use crate::config::JiraConfig;
use crate::domain::{Issue, IssueType};
use crate::errors::ViewerError;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("initiative-viewer/", env!("CARGO_PKG_VERSION"));

/// One page of `/rest/api/2/search`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(default)]
    names: Option<Map<String, Value>>,
}

/// Error body Jira returns with 4xx responses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JiraErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: Map<String, Value>,
}

impl JiraErrorBody {
    fn joined(&self) -> String {
        let mut messages = self.error_messages.clone();
        messages.extend(
            self.errors
                .iter()
                .map(|(field, msg)| format!("{}: {}", field, msg.as_str().unwrap_or_default())),
        );
        if messages.is_empty() {
            "Bad request".to_string()
        } else {
            messages.join("; ")
        }
    }
}

/// Map a non-2xx status to the viewer error taxonomy.
pub(crate) fn status_error(
    code: u16,
    body: Option<JiraErrorBody>,
    target: &str,
    query: &str,
) -> ViewerError {
    match code {
        401 => ViewerError::RemoteAuth {
            target: query.to_string(),
        },
        403 => ViewerError::RemotePermission {
            target: query.to_string(),
        },
        400 => ViewerError::RemoteQuery {
            query: query.to_string(),
            message: body.unwrap_or_default().joined(),
        },
        other => ViewerError::RemoteTransport {
            target: target.to_string(),
            message: format!("HTTP {} for {}", other, query),
        },
    }
}

/// Jira client authenticated with a bearer token
pub struct JiraClient {
    base_url: String,
    token: String,
    agent: ureq::Agent,
    mapping: FieldMapping,
    batch_size: usize,
    max_results: usize,
}

impl JiraClient {
    pub fn new(base_url: &str, token: &str, config: &JiraConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout())
            .timeout_read(config.read_timeout())
            .user_agent(USER_AGENT)
            .build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            agent,
            mapping: FieldMapping::from_config(config),
            batch_size: config.batch_size(),
            max_results: config.max_results(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_page(&self, jql: &str, start_at: usize, max_results: usize) -> Result<SearchPage, ViewerError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
            .query("jql", jql)
            .query("startAt", &start_at.to_string())
            .query("maxResults", &max_results.to_string())
            .query("fields", &self.mapping.search_fields())
            .query("expand", "names")
            .call();

        match response {
            Ok(resp) => resp
                .into_json::<SearchPage>()
                .map_err(|e| ViewerError::RemoteTransport {
                    target: self.base_url.clone(),
                    message: format!("invalid search response: {}", e),
                }),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_json::<JiraErrorBody>().ok();
                Err(status_error(code, body, &self.base_url, jql))
            }
            Err(ureq::Error::Transport(t)) => Err(ViewerError::RemoteTransport {
                target: self.base_url.clone(),
                message: t.to_string(),
            }),
        }
    }
}

impl IssueSource for JiraClient {
    fn search(&self, jql: &str) -> Result<Vec<Issue>, ViewerError> {
        let mut issues = Vec::new();
        let mut start_at = 0;

        loop {
            let remaining = self.max_results.saturating_sub(issues.len());
            if remaining == 0 {
                warn!("Result cap of {} reached for query: {}", self.max_results, jql);
                break;
            }

            let page = self.fetch_page(jql, start_at, self.batch_size.min(remaining))?;
            if page.issues.is_empty() {
                break;
            }

            let risk_field = self
                .mapping
                .risk_field
                .clone()
                .or_else(|| page.names.as_ref().and_then(discover_risk_field));

            let fetched = page.issues.len();
            for raw in &page.issues {
                match map_issue(raw, &self.mapping, risk_field.as_deref()) {
                    Some(issue) => {
                        debug!("Fetched {} ({:?})", issue.key, issue.issue_type);
                        issues.push(issue);
                    }
                    None => warn!("Skipping issue without key in results of: {}", jql),
                }
            }

            start_at += fetched;
            debug!("Fetched {}/{} issues for: {}", start_at, page.total, jql);
            if start_at >= page.total {
                break;
            }
        }

        info!("Query returned {} issues: {}", issues.len(), jql);
        Ok(issues)
    }

    fn get_children(
        &self,
        key: &str,
        type_filter: Option<IssueType>,
    ) -> Result<Vec<Issue>, ViewerError> {
        self.search(&children_jql(key, type_filter))
    }
}
