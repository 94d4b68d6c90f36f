//! Core domain types for the initiative hierarchy.
//!
//! This module defines the work items fetched from Jira and the tree they are
//! assembled into: initiatives, features, sub-features and epics grouped by
//! area.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Area used when an epic carries no project information.
pub const UNKNOWN_AREA: &str = "Unknown";

/// Work item type, parsed from the Jira issue type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Business Initiative (top of the hierarchy)
    Initiative,
    /// Feature under an initiative
    Feature,
    /// Sub-Feature under a feature
    SubFeature,
    /// Epic under a sub-feature
    Epic,
    /// Story tracked under an epic
    Story,
    /// Task or sub-task tracked under an epic
    Task,
    /// Any other issue type
    Other,
}

impl IssueType {
    /// Parse a Jira issue type display name.
    pub fn from_jira_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "business initiative" | "initiative" => IssueType::Initiative,
            "feature" => IssueType::Feature,
            "sub-feature" | "sub feature" | "subfeature" => IssueType::SubFeature,
            "epic" => IssueType::Epic,
            "story" => IssueType::Story,
            "task" | "sub-task" | "subtask" => IssueType::Task,
            _ => IssueType::Other,
        }
    }

    /// Name used in JQL `issuetype = "..."` clauses.
    pub fn jql_name(&self) -> &'static str {
        match self {
            IssueType::Initiative => "Business Initiative",
            IssueType::Feature => "Feature",
            IssueType::SubFeature => "Sub-Feature",
            IssueType::Epic => "Epic",
            IssueType::Story => "Story",
            IssueType::Task => "Task",
            IssueType::Other => "Other",
        }
    }

    /// Stories and tasks carry the sprint assignments checked by the backward check.
    pub fn is_work_item(&self) -> bool {
        matches!(self, IssueType::Story | IssueType::Task)
    }
}

/// Sprint lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintState {
    /// Sprint in progress
    Active,
    /// Sprint finished
    Closed,
    /// Sprint not started yet
    Future,
    /// State missing or unrecognised
    Unknown,
}

impl SprintState {
    /// Parse a sprint state; Jira Cloud reports lowercase, Data Center uppercase.
    pub fn parse(state: &str) -> Self {
        match state.trim().to_uppercase().as_str() {
            "ACTIVE" => SprintState::Active,
            "CLOSED" => SprintState::Closed,
            "FUTURE" => SprintState::Future,
            _ => SprintState::Unknown,
        }
    }
}

/// A sprint an issue is (or was) assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub name: String,
    pub state: SprintState,
}

/// A remote work item with the fields the viewer cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Jira issue key (e.g., "PROJ-123")
    pub key: String,
    /// Short summary
    pub summary: String,
    /// Hierarchy level or work item kind
    pub issue_type: IssueType,
    /// Workflow status name, free text
    pub status: String,
    /// Assignee display name
    pub assignee: Option<String>,
    /// Risk probability on a 1 (low) to 5 (high) scale
    pub risk: Option<u8>,
    /// Project key the issue is tracked under
    pub area: String,
    /// Fix version names
    pub fix_versions: Vec<String>,
    /// Parent issue key
    pub parent_key: Option<String>,
    /// Source rank used for ordering siblings
    pub rank: Option<String>,
    /// Sprint assignments
    pub sprints: Vec<Sprint>,
}

impl Issue {
    /// Create an issue with default values for everything but key, summary and type
    pub fn new(key: impl Into<String>, summary: impl Into<String>, issue_type: IssueType) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            issue_type,
            status: "Open".to_string(),
            assignee: None,
            risk: None,
            area: UNKNOWN_AREA.to_string(),
            fix_versions: Vec::new(),
            parent_key: None,
            rank: None,
            sprints: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn with_fix_version(mut self, version: impl Into<String>) -> Self {
        self.fix_versions.push(version.into());
        self
    }

    pub fn with_parent(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = Some(rank.into());
        self
    }

    pub fn with_risk(mut self, risk: u8) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_sprint(mut self, name: impl Into<String>, state: SprintState) -> Self {
        self.sprints.push(Sprint {
            name: name.into(),
            state,
        });
        self
    }

    /// Check whether the issue is tagged with the given release.
    ///
    /// Comparison trims surrounding whitespace on both sides.
    pub fn has_release(&self, release: &str) -> bool {
        let release = release.trim();
        self.fix_versions.iter().any(|v| v.trim() == release)
    }

    /// Check whether any assigned sprint is currently active
    pub fn in_active_sprint(&self) -> bool {
        self.sprints.iter().any(|s| s.state == SprintState::Active)
    }

    /// Case-insensitive exact match of the status against a status list
    pub fn status_in(&self, statuses: &[String]) -> bool {
        let status = self.status.trim().to_lowercase();
        statuses.iter().any(|s| s.trim().to_lowercase() == status)
    }
}

/// Canonical sibling ordering: ranked issues first by rank, unranked after.
///
/// Used with a stable sort so ties keep the order the API returned.
pub fn rank_order(a: &Issue, b: &Issue) -> Ordering {
    match (&a.rank, &b.rank) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Epic leaf of the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicNode {
    pub issue: Issue,
    /// Set by the backward check when a story/task is in an active sprint
    #[serde(default)]
    pub active_sprint: bool,
}

impl EpicNode {
    pub fn new(issue: Issue) -> Self {
        Self {
            issue,
            active_sprint: false,
        }
    }
}

/// Epics of one sub-feature that belong to the same area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBucket {
    pub area: String,
    pub epics: Vec<EpicNode>,
}

/// Sub-feature with its epics grouped by area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFeatureNode {
    pub issue: Issue,
    /// Buckets in first-seen area order
    pub areas: Vec<AreaBucket>,
    /// Release recommended by the backward check
    #[serde(default)]
    pub marked_release: Option<String>,
}

impl SubFeatureNode {
    /// Group epics into area buckets, preserving first-seen area order.
    pub fn from_epics(issue: Issue, epics: Vec<EpicNode>) -> Self {
        let mut areas: Vec<AreaBucket> = Vec::new();
        for epic in epics {
            match areas.iter_mut().find(|b| b.area == epic.issue.area) {
                Some(bucket) => bucket.epics.push(epic),
                None => areas.push(AreaBucket {
                    area: epic.issue.area.clone(),
                    epics: vec![epic],
                }),
            }
        }
        Self {
            issue,
            areas,
            marked_release: None,
        }
    }

    /// Area keys in bucket order
    pub fn area_keys(&self) -> Vec<&str> {
        self.areas.iter().map(|b| b.area.as_str()).collect()
    }

    /// Epics of one area (empty when the area has no bucket)
    pub fn epics_in(&self, area: &str) -> &[EpicNode] {
        self.areas
            .iter()
            .find(|b| b.area == area)
            .map(|b| b.epics.as_slice())
            .unwrap_or(&[])
    }

    /// All epics across buckets
    pub fn epics(&self) -> impl Iterator<Item = &EpicNode> {
        self.areas.iter().flat_map(|b| b.epics.iter())
    }
}

/// Feature with its sub-features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureNode {
    pub issue: Issue,
    pub sub_features: Vec<SubFeatureNode>,
    /// Release recommended by the backward check
    #[serde(default)]
    pub marked_release: Option<String>,
}

/// Business initiative with its features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeNode {
    pub issue: Issue,
    pub features: Vec<FeatureNode>,
}

impl InitiativeNode {
    /// Distinct areas referenced by this initiative's epics, sorted
    pub fn areas(&self) -> Vec<String> {
        let areas: BTreeSet<&str> = self
            .features
            .iter()
            .flat_map(|f| f.sub_features.iter())
            .flat_map(|sf| sf.areas.iter().map(|b| b.area.as_str()))
            .collect();
        areas.into_iter().map(String::from).collect()
    }

    /// All epics below this initiative
    pub fn epics(&self) -> impl Iterator<Item = &EpicNode> {
        self.features
            .iter()
            .flat_map(|f| f.sub_features.iter())
            .flat_map(|sf| sf.epics())
    }

    pub fn sub_feature_count(&self) -> usize {
        self.features.iter().map(|f| f.sub_features.len()).sum()
    }
}

/// Assembled hierarchy for one analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub initiatives: Vec<InitiativeNode>,
    /// Release used for filtering (normal mode) or marking (backward check)
    pub release: String,
    /// JQL that selected the initiatives
    pub query: String,
    /// Initiative limit requested by the user
    pub limit: Option<usize>,
    /// Initiatives eligible before the limit: those with features for a
    /// normal build, every queried initiative for a backward check
    pub original_count: usize,
}

impl Hierarchy {
    /// True when the limit actually cut initiatives off
    pub fn is_limited(&self) -> bool {
        self.limit.is_some_and(|limit| self.original_count > limit)
    }

    /// Initiatives that have at least one feature
    pub fn initiatives_with_features(&self) -> impl Iterator<Item = &InitiativeNode> {
        self.initiatives.iter().filter(|i| !i.features.is_empty())
    }

    /// Distinct areas across the whole hierarchy, sorted
    pub fn all_areas(&self) -> Vec<String> {
        self.area_index().into_keys().map(String::from).collect()
    }

    /// Flat lookup table of epics by area
    pub fn area_index(&self) -> BTreeMap<&str, Vec<&EpicNode>> {
        let mut index: BTreeMap<&str, Vec<&EpicNode>> = BTreeMap::new();
        for initiative in &self.initiatives {
            for feature in &initiative.features {
                for sub_feature in &feature.sub_features {
                    for bucket in &sub_feature.areas {
                        index
                            .entry(bucket.area.as_str())
                            .or_default()
                            .extend(bucket.epics.iter());
                    }
                }
            }
        }
        index
    }

    pub fn feature_count(&self) -> usize {
        self.initiatives.iter().map(|i| i.features.len()).sum()
    }

    pub fn sub_feature_count(&self) -> usize {
        self.initiatives.iter().map(|i| i.sub_feature_count()).sum()
    }

    pub fn epic_count(&self) -> usize {
        self.initiatives.iter().map(|i| i.epics().count()).sum()
    }
}
