//! Mapping of raw Jira issue JSON into [`Issue`] records.
//!
//! Jira returns issues as loosely typed JSON with instance-specific custom
//! field ids. Everything here is pure so the mapping can be tested against
//! captured payloads without a server.

use crate::config::JiraConfig;
use crate::domain::{Issue, IssueType, Sprint, SprintState, UNKNOWN_AREA};
use serde_json::{Map, Value};
use tracing::debug;

/// Custom field ids used when mapping issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Risk field id; discovered from the `names` expansion when absent
    pub risk_field: Option<String>,
    pub rank_field: String,
    pub sprint_field: String,
}

impl FieldMapping {
    pub fn from_config(config: &JiraConfig) -> Self {
        Self {
            risk_field: config.risk_field.clone(),
            rank_field: config.rank_field(),
            sprint_field: config.sprint_field(),
        }
    }

    /// Fields to request from the search endpoint.
    ///
    /// Without a configured risk field all navigable fields are requested so
    /// the risk field can be discovered by display name.
    pub fn search_fields(&self) -> String {
        let mut fields = vec![
            "summary",
            "status",
            "issuetype",
            "assignee",
            "project",
            "fixVersions",
            "parent",
            self.rank_field.as_str(),
            self.sprint_field.as_str(),
        ];
        match &self.risk_field {
            Some(risk) => fields.push(risk.as_str()),
            None => fields.push("*navigable"),
        }
        fields.join(",")
    }
}

/// Find the risk field id by display name.
///
/// The first field (by id order) whose name contains "risk" and either
/// "status" or "probability" wins.
pub fn discover_risk_field(names: &Map<String, Value>) -> Option<String> {
    names.iter().find_map(|(id, name)| {
        let name = name.as_str()?.to_lowercase();
        let matches =
            name.contains("risk") && (name.contains("status") || name.contains("probability"));
        matches.then(|| id.clone())
    })
}

/// Normalise a raw risk field value onto the 1-5 scale.
pub fn normalize_risk(raw: &Value) -> Option<u8> {
    let value = match raw {
        Value::Object(obj) => obj.get("value")?.clone(),
        Value::Array(items) => match items.first()? {
            Value::Object(obj) => obj.get("value")?.clone(),
            other => other.clone(),
        },
        Value::Null => return None,
        other => other.clone(),
    };

    let text = match &value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.trim().is_empty() {
        return None;
    }
    // User picker values render as "Name (id)"
    if text.contains('(') && text.contains(')') {
        debug!("Ignoring user-like risk value '{}'", text);
        return None;
    }

    let lower = text.to_lowercase();
    if lower.contains("green") || lower.contains("no risk") || lower.contains("committed") {
        Some(1)
    } else if lower.contains("yellow") || lower.contains("medium") {
        Some(3)
    } else if lower.contains("red")
        || lower.contains("high risk")
        || lower.contains("can't deliver")
        || lower.contains("cannot deliver")
    {
        Some(5)
    } else if lower.contains("none") || lower.contains("undefined") {
        None
    } else {
        match lower.trim().parse::<u8>() {
            Ok(n) if (1..=5).contains(&n) => Some(n),
            _ => None,
        }
    }
}

/// Parse a sprint field value.
///
/// Cloud returns objects with `name` and `state`; Data Center returns
/// strings like `...Sprint@1a2b[id=1,state=ACTIVE,name=Sprint 1,...]`.
pub fn parse_sprints(raw: &Value) -> Vec<Sprint> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items.iter().filter_map(parse_sprint).collect()
}

fn parse_sprint(item: &Value) -> Option<Sprint> {
    match item {
        Value::Object(obj) => Some(Sprint {
            name: obj.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
            state: obj
                .get("state")
                .and_then(Value::as_str)
                .map(SprintState::parse)
                .unwrap_or(SprintState::Unknown),
        }),
        Value::String(s) => {
            let start = s.find('[')?;
            let body = s[start + 1..].trim_end_matches(']');
            let mut name = String::new();
            let mut state = SprintState::Unknown;
            for part in body.split(',') {
                if let Some((k, v)) = part.split_once('=') {
                    match k.trim() {
                        "name" => name = v.to_string(),
                        "state" => state = SprintState::parse(v),
                        _ => {}
                    }
                }
            }
            Some(Sprint { name, state })
        }
        _ => None,
    }
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str()
}

/// Map a raw issue into an [`Issue`].
///
/// `risk_field` is the resolved risk field id for this response. Returns
/// `None` when the payload has no key.
pub fn map_issue(raw: &Value, mapping: &FieldMapping, risk_field: Option<&str>) -> Option<Issue> {
    let key = raw.get("key")?.as_str()?.to_string();
    let null = Value::Null;
    let fields = raw.get("fields").unwrap_or(&null);

    let issue_type = str_at(fields, &["issuetype", "name"])
        .map(IssueType::from_jira_name)
        .unwrap_or(IssueType::Other);

    let fix_versions = fields
        .get("fixVersions")
        .and_then(Value::as_array)
        .map(|versions| {
            versions
                .iter()
                .filter_map(|v| v.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let risk = risk_field
        .and_then(|id| fields.get(id))
        .and_then(normalize_risk);

    let area = str_at(fields, &["project", "key"])
        .filter(|k| !k.is_empty())
        .unwrap_or(UNKNOWN_AREA)
        .to_string();

    Some(Issue {
        key,
        summary: str_at(fields, &["summary"]).unwrap_or("").to_string(),
        issue_type,
        status: str_at(fields, &["status", "name"]).unwrap_or("").to_string(),
        assignee: str_at(fields, &["assignee", "displayName"]).map(String::from),
        risk,
        area,
        fix_versions,
        parent_key: str_at(fields, &["parent", "key"]).map(String::from),
        rank: str_at(fields, &[mapping.rank_field.as_str()]).map(String::from),
        sprints: fields
            .get(&mapping.sprint_field)
            .map(parse_sprints)
            .unwrap_or_default(),
    })
}
