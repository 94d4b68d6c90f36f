//! Backward check analysis.
//!
//! Instead of trusting the release field, the backward check walks every open
//! Feature and Sub-Feature, looks for Epics whose stories or tasks sit in an
//! active sprint, and recommends tagging the owners with the target release.

use crate::config::WorkflowConfig;
use crate::domain::{EpicNode, FeatureNode, Hierarchy, InitiativeNode, Issue, IssueType, SubFeatureNode};
use crate::errors::ViewerError;
use crate::hierarchy::{apply_limit, sort_by_rank};
use crate::jira::{keys_jql, IssueSource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Aggregate counts of a backward check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackwardCheckSummary {
    pub total_features: usize,
    pub total_sub_features: usize,
    pub features_with_active_work: usize,
    pub sub_features_with_active_work: usize,
    pub epics_in_active_sprints: usize,
}

/// Outcome of a backward check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackwardCheckResult {
    /// Open features and sub-features with their epics
    pub hierarchy: Hierarchy,
    pub target_release: String,
    /// Feature keys to tag, in discovery order
    pub features_to_mark: Vec<String>,
    /// Sub-feature keys to tag, in discovery order
    pub sub_features_to_mark: Vec<String>,
    /// Distinct epics with stories or tasks in an active sprint
    pub epics_active: usize,
    pub summary: BackwardCheckSummary,
}

impl BackwardCheckResult {
    /// Feature keys followed by sub-feature keys, without duplicates
    pub fn combined_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.features_to_mark
            .iter()
            .chain(self.sub_features_to_mark.iter())
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect()
    }

    pub fn features_query(&self) -> Option<String> {
        keys_jql(&self.features_to_mark)
    }

    pub fn sub_features_query(&self) -> Option<String> {
        keys_jql(&self.sub_features_to_mark)
    }

    pub fn combined_query(&self) -> Option<String> {
        keys_jql(&self.combined_keys())
    }
}

/// Ordered set of keys
#[derive(Default)]
struct KeyList {
    keys: Vec<String>,
    seen: HashSet<String>,
}

impl KeyList {
    fn insert(&mut self, key: &str) {
        if self.seen.insert(key.to_string()) {
            self.keys.push(key.to_string());
        }
    }
}

/// Runs the backward check against an [`IssueSource`]
pub struct BackwardCheckAnalyzer<'a> {
    source: &'a dyn IssueSource,
    closed_statuses: Vec<String>,
    limit: Option<usize>,
}

impl<'a> BackwardCheckAnalyzer<'a> {
    pub fn new(source: &'a dyn IssueSource, workflow: &WorkflowConfig) -> Self {
        Self {
            source,
            closed_statuses: workflow.closed_statuses(),
            limit: None,
        }
    }

    /// Only analyse the first `limit` initiatives returned by the query.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Run `jql` to select initiatives, then analyse them.
    pub fn fetch(&self, jql: &str, target_release: &str) -> Result<BackwardCheckResult, ViewerError> {
        info!("Backward check for '{}': {}", target_release, jql);
        let initiatives = self.source.search(jql)?;
        let mut result = self.analyze(initiatives, target_release)?;
        result.hierarchy.query = jql.to_string();
        Ok(result)
    }

    pub fn analyze(
        &self,
        initiatives: Vec<Issue>,
        target_release: &str,
    ) -> Result<BackwardCheckResult, ViewerError> {
        let target = target_release.trim().to_string();
        let (initiatives, original_count) = apply_limit(initiatives, self.limit);

        let mut features_to_mark = KeyList::default();
        let mut sub_features_to_mark = KeyList::default();
        let mut active_epics: HashSet<String> = HashSet::new();
        let mut summary = BackwardCheckSummary::default();

        let mut nodes = Vec::with_capacity(initiatives.len());
        for initiative in initiatives {
            info!("Checking initiative {}", initiative.key);
            let mut features = Vec::new();

            for feature in self.open_children(&initiative.key, IssueType::Feature)? {
                summary.total_features += 1;
                let mut sub_features = Vec::new();
                let mut feature_active = false;

                for sub_feature in self.open_children(&feature.key, IssueType::SubFeature)? {
                    summary.total_sub_features += 1;
                    let epics = self.check_epics(&sub_feature.key)?;
                    let mut node = SubFeatureNode::from_epics(sub_feature, epics);

                    let active: Vec<&EpicNode> = node.epics().filter(|e| e.active_sprint).collect();
                    if !active.is_empty() {
                        active_epics.extend(active.iter().map(|e| e.issue.key.clone()));
                        feature_active = true;
                        if node.issue.has_release(&target) {
                            debug!("Sub-feature {} already has {}", node.issue.key, target);
                        } else {
                            sub_features_to_mark.insert(&node.issue.key);
                            node.marked_release = Some(target.clone());
                        }
                    }
                    sub_features.push(node);
                }

                let needs_release = feature_active && !feature.has_release(&target);
                if needs_release {
                    features_to_mark.insert(&feature.key);
                } else if feature_active {
                    debug!("Feature {} already has {}", feature.key, target);
                }
                features.push(FeatureNode {
                    marked_release: needs_release.then(|| target.clone()),
                    issue: feature,
                    sub_features,
                });
            }

            nodes.push(InitiativeNode {
                issue: initiative,
                features,
            });
        }

        summary.features_with_active_work = features_to_mark.keys.len();
        summary.sub_features_with_active_work = sub_features_to_mark.keys.len();
        summary.epics_in_active_sprints = active_epics.len();
        info!(
            "Backward check found {} features and {} sub-features with active work",
            summary.features_with_active_work, summary.sub_features_with_active_work
        );

        Ok(BackwardCheckResult {
            hierarchy: Hierarchy {
                initiatives: nodes,
                release: target.clone(),
                query: String::new(),
                limit: self.limit,
                original_count,
            },
            target_release: target,
            features_to_mark: features_to_mark.keys,
            sub_features_to_mark: sub_features_to_mark.keys,
            epics_active: active_epics.len(),
            summary,
        })
    }

    /// Children of one type that are not in a closed status, rank-sorted
    fn open_children(&self, key: &str, issue_type: IssueType) -> Result<Vec<Issue>, ViewerError> {
        let children: Vec<Issue> = self
            .source
            .get_children(key, Some(issue_type))?
            .into_iter()
            .filter(|issue| issue.issue_type == issue_type)
            .filter(|issue| {
                let closed = issue.status_in(&self.closed_statuses);
                if closed {
                    debug!("Skipping {} in closed status '{}'", issue.key, issue.status);
                }
                !closed
            })
            .collect();
        Ok(sort_by_rank(children))
    }

    /// Epics of a sub-feature, flagged when a story or task is in an active sprint
    fn check_epics(&self, sub_feature_key: &str) -> Result<Vec<EpicNode>, ViewerError> {
        let epics: Vec<Issue> = self
            .source
            .get_children(sub_feature_key, Some(IssueType::Epic))?
            .into_iter()
            .filter(|issue| issue.issue_type == IssueType::Epic)
            .collect();

        let mut nodes = Vec::new();
        for mut epic in sort_by_rank(epics) {
            let active = self
                .source
                .get_children(&epic.key, None)?
                .iter()
                .any(|child| child.issue_type.is_work_item() && child.in_active_sprint());

            if active {
                info!("Epic {} has work in an active sprint", epic.key);
                epic.risk = Some(1);
            }
            nodes.push(EpicNode {
                issue: epic,
                active_sprint: active,
            });
        }
        Ok(nodes)
    }
}
