//! Hierarchy builder.
//!
//! Resolves Business Initiative → Feature → Sub-Feature → Epic level by level
//! through an [`IssueSource`], filtering Features and Sub-Features by release.

use crate::domain::{
    rank_order, EpicNode, FeatureNode, Hierarchy, InitiativeNode, Issue, IssueType,
    SubFeatureNode,
};
use crate::errors::ViewerError;
use crate::jira::IssueSource;
use tracing::{debug, info};

/// Sort siblings into canonical rank order.
pub(crate) fn sort_by_rank(mut issues: Vec<Issue>) -> Vec<Issue> {
    issues.sort_by(rank_order);
    issues
}

/// Apply an initiative limit, returning the kept initiatives and the count
/// before the limit.
pub(crate) fn apply_limit<T>(mut initiatives: Vec<T>, limit: Option<usize>) -> (Vec<T>, usize) {
    let original_count = initiatives.len();
    if let Some(limit) = limit {
        if original_count > limit {
            info!(
                "Limiting analysis to the first {} of {} initiatives",
                limit, original_count
            );
            initiatives.truncate(limit);
        }
    }
    (initiatives, original_count)
}

/// Builds the initiative hierarchy for a release
pub struct HierarchyBuilder<'a> {
    source: &'a dyn IssueSource,
    limit: Option<usize>,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(source: &'a dyn IssueSource) -> Self {
        Self {
            source,
            limit: None,
        }
    }

    /// Only analyse the first `limit` initiatives returned by the query.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Run `jql` to select initiatives, then build their hierarchy.
    pub fn fetch(&self, jql: &str, release_filter: &str) -> Result<Hierarchy, ViewerError> {
        info!("Fetching initiatives: {}", jql);
        let initiatives = self.source.search(jql)?;
        let mut hierarchy = self.build(initiatives, release_filter)?;
        hierarchy.query = jql.to_string();
        Ok(hierarchy)
    }

    /// Build the hierarchy below the given initiatives.
    ///
    /// Features and Sub-Features are kept when the filter is empty or they
    /// carry the release. Epics are never filtered. Initiatives left without
    /// Features are dropped before the limit applies, so a limited hierarchy
    /// holds `limit` initiatives whenever that many have features. Any source
    /// error aborts the whole build.
    pub fn build(
        &self,
        initiatives: Vec<Issue>,
        release_filter: &str,
    ) -> Result<Hierarchy, ViewerError> {
        let release = release_filter.trim();
        let total = initiatives.len();

        let mut nodes = Vec::with_capacity(total);
        for (i, initiative) in initiatives.into_iter().enumerate() {
            info!("Processing initiative {}/{}: {}", i + 1, total, initiative.key);

            let features = self.build_features(&initiative.key, release)?;
            if features.is_empty() {
                info!(
                    "Dropping initiative {}: no features for release '{}'",
                    initiative.key, release
                );
                continue;
            }

            nodes.push(InitiativeNode {
                issue: initiative,
                features,
            });
        }

        let (nodes, original_count) = apply_limit(nodes, self.limit);
        info!("Built hierarchy with {} initiatives", nodes.len());
        Ok(Hierarchy {
            initiatives: nodes,
            release: release.to_string(),
            query: String::new(),
            limit: self.limit,
            original_count,
        })
    }

    fn build_features(&self, initiative_key: &str, release: &str) -> Result<Vec<FeatureNode>, ViewerError> {
        let features = self.children(initiative_key, IssueType::Feature, release)?;
        debug!("{}: {} features", initiative_key, features.len());

        let mut nodes = Vec::with_capacity(features.len());
        for feature in features {
            let sub_features = self
                .children(&feature.key, IssueType::SubFeature, release)?
                .into_iter()
                .map(|sub_feature| self.build_sub_feature(sub_feature))
                .collect::<Result<Vec<_>, _>>()?;
            debug!("{}: {} sub-features", feature.key, sub_features.len());

            nodes.push(FeatureNode {
                issue: feature,
                sub_features,
                marked_release: None,
            });
        }
        Ok(nodes)
    }

    fn build_sub_feature(&self, sub_feature: Issue) -> Result<SubFeatureNode, ViewerError> {
        let epics = self
            .source
            .get_children(&sub_feature.key, Some(IssueType::Epic))?
            .into_iter()
            .filter(|issue| issue.issue_type == IssueType::Epic);
        let epics: Vec<EpicNode> = sort_by_rank(epics.collect())
            .into_iter()
            .map(EpicNode::new)
            .collect();
        debug!("{}: {} epics", sub_feature.key, epics.len());

        Ok(SubFeatureNode::from_epics(sub_feature, epics))
    }

    /// Children of one type, release-filtered and rank-sorted
    fn children(
        &self,
        key: &str,
        issue_type: IssueType,
        release: &str,
    ) -> Result<Vec<Issue>, ViewerError> {
        let children = self
            .source
            .get_children(key, Some(issue_type))?
            .into_iter()
            .filter(|issue| issue.issue_type == issue_type)
            .filter(|issue| release.is_empty() || issue.has_release(release))
            .collect();
        Ok(sort_by_rank(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::{Failure, InMemoryIssueSource};

    fn fixture() -> InMemoryIssueSource {
        InMemoryIssueSource::new()
            .with_issue(Issue::new("I-1", "Payments", IssueType::Initiative))
            .with_issue(Issue::new("I-2", "Empty", IssueType::Initiative))
            .with_issue(
                Issue::new("F-1", "Checkout", IssueType::Feature)
                    .with_parent("I-1")
                    .with_fix_version("PI-1"),
            )
            .with_issue(
                Issue::new("F-2", "Other release", IssueType::Feature)
                    .with_parent("I-2")
                    .with_fix_version("PI-2"),
            )
            .with_issue(
                Issue::new("SF-1", "Cards", IssueType::SubFeature)
                    .with_parent("F-1")
                    .with_fix_version("PI-1"),
            )
            .with_issue(
                Issue::new("E-1", "Backend", IssueType::Epic)
                    .with_parent("SF-1")
                    .with_area("A"),
            )
            .with_issue(
                Issue::new("E-2", "Frontend", IssueType::Epic)
                    .with_parent("SF-1")
                    .with_area("B"),
            )
            .with_search("type = Initiative", &["I-1", "I-2"])
    }

    #[test]
    fn test_build_groups_epics_by_area() {
        let source = fixture();
        let hierarchy = HierarchyBuilder::new(&source)
            .fetch("type = Initiative", "PI-1")
            .unwrap();

        assert_eq!(hierarchy.initiatives.len(), 1);
        let sf = &hierarchy.initiatives[0].features[0].sub_features[0];
        assert_eq!(sf.area_keys(), vec!["A", "B"]);
        assert_eq!(sf.epics_in("A")[0].issue.key, "E-1");
        assert_eq!(sf.epics_in("B")[0].issue.key, "E-2");
        assert_eq!(hierarchy.query, "type = Initiative");
    }

    #[test]
    fn test_initiative_without_features_dropped() {
        let source = fixture();
        let hierarchy = HierarchyBuilder::new(&source)
            .fetch("type = Initiative", "PI-1")
            .unwrap();
        assert!(hierarchy.initiatives.iter().all(|i| i.issue.key != "I-2"));
    }

    #[test]
    fn test_empty_filter_keeps_all_releases() {
        let source = fixture();
        let hierarchy = HierarchyBuilder::new(&source)
            .fetch("type = Initiative", "")
            .unwrap();
        assert_eq!(hierarchy.initiatives.len(), 2);
    }

    #[test]
    fn test_limit_records_original_count() {
        let source = fixture();
        let hierarchy = HierarchyBuilder::new(&source)
            .with_limit(1)
            .fetch("type = Initiative", "")
            .unwrap();
        assert_eq!(hierarchy.initiatives.len(), 1);
        assert_eq!(hierarchy.original_count, 2);
        assert!(hierarchy.is_limited());
    }

    #[test]
    fn test_source_error_aborts_build() {
        let source = fixture().with_failure("SF-1", Failure::Transport("timeout".into()));
        let err = HierarchyBuilder::new(&source)
            .fetch("type = Initiative", "PI-1")
            .unwrap_err();
        assert!(matches!(err, ViewerError::RemoteTransport { target, .. } if target == "SF-1"));
    }

    #[test]
    fn test_children_sorted_by_rank() {
        let source = InMemoryIssueSource::new()
            .with_issue(Issue::new("I-1", "Init", IssueType::Initiative))
            .with_issue(Issue::new("F-3", "No rank", IssueType::Feature).with_parent("I-1"))
            .with_issue(
                Issue::new("F-2", "Second", IssueType::Feature)
                    .with_parent("I-1")
                    .with_rank("0|b"),
            )
            .with_issue(
                Issue::new("F-1", "First", IssueType::Feature)
                    .with_parent("I-1")
                    .with_rank("0|a"),
            );
        let initiatives = vec![Issue::new("I-1", "Init", IssueType::Initiative)];
        let hierarchy = HierarchyBuilder::new(&source).build(initiatives, "").unwrap();
        let keys: Vec<_> = hierarchy.initiatives[0]
            .features
            .iter()
            .map(|f| f.issue.key.as_str())
            .collect();
        assert_eq!(keys, vec!["F-1", "F-2", "F-3"]);
    }
}
