//! Report statistics derived from a hierarchy.

use crate::domain::{Hierarchy, InitiativeNode};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Per-initiative figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiativeStats {
    pub key: String,
    pub summary: String,
    pub features: usize,
    pub sub_features: usize,
    pub epics: usize,
    pub completed_epics: usize,
    /// Completed epics over total epics, 0 without epics
    pub completion_percent: f64,
    /// Mean of defined epic risks
    pub average_risk: Option<f64>,
}

impl InitiativeStats {
    fn compute(initiative: &InitiativeNode, completed_statuses: &[String]) -> Self {
        let epics: Vec<_> = initiative.epics().collect();
        let completed = epics
            .iter()
            .filter(|e| e.issue.status_in(completed_statuses))
            .count();
        let risks: Vec<f64> = epics
            .iter()
            .filter_map(|e| e.issue.risk)
            .map(f64::from)
            .collect();

        Self {
            key: initiative.issue.key.clone(),
            summary: initiative.issue.summary.clone(),
            features: initiative.features.len(),
            sub_features: initiative.sub_feature_count(),
            epics: epics.len(),
            completed_epics: completed,
            completion_percent: percent(completed, epics.len()),
            average_risk: (!risks.is_empty()).then(|| risks.iter().sum::<f64>() / risks.len() as f64),
        }
    }
}

/// Count and share of one epic status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: String,
    pub count: usize,
    pub percent: f64,
}

/// Aggregate statistics over a hierarchy, recomputed for each render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub initiatives: usize,
    pub features: usize,
    pub sub_features: usize,
    pub epics: usize,
    pub per_initiative: Vec<InitiativeStats>,
    /// Sorted by count descending, then status name
    pub status_distribution: Vec<StatusShare>,
    pub epics_per_area: BTreeMap<String, usize>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl StatisticsSnapshot {
    /// Compute statistics over the initiatives that have features.
    pub fn compute(hierarchy: &Hierarchy, completed_statuses: &[String]) -> Self {
        let initiatives: Vec<&InitiativeNode> = hierarchy.initiatives_with_features().collect();

        let per_initiative: Vec<InitiativeStats> = initiatives
            .iter()
            .map(|i| InitiativeStats::compute(i, completed_statuses))
            .collect();

        let mut by_status: HashMap<&str, usize> = HashMap::new();
        let mut epics_per_area: BTreeMap<String, usize> = BTreeMap::new();
        let mut epic_total = 0;
        for epic in initiatives.iter().flat_map(|i| i.epics()) {
            epic_total += 1;
            *by_status.entry(epic.issue.status.as_str()).or_default() += 1;
            *epics_per_area.entry(epic.issue.area.clone()).or_default() += 1;
        }

        let mut status_distribution: Vec<StatusShare> = by_status
            .into_iter()
            .map(|(status, count)| StatusShare {
                status: status.to_string(),
                count,
                percent: percent(count, epic_total),
            })
            .collect();
        status_distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));

        Self {
            initiatives: initiatives.len(),
            features: per_initiative.iter().map(|s| s.features).sum(),
            sub_features: per_initiative.iter().map(|s| s.sub_features).sum(),
            epics: epic_total,
            per_initiative,
            status_distribution,
            epics_per_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpicNode, FeatureNode, Issue, IssueType, SubFeatureNode};

    fn epic(key: &str, area: &str, status: &str, risk: Option<u8>) -> EpicNode {
        let mut issue = Issue::new(key, "Epic", IssueType::Epic)
            .with_area(area)
            .with_status(status);
        issue.risk = risk;
        EpicNode::new(issue)
    }

    fn initiative(key: &str, epics: Vec<EpicNode>) -> InitiativeNode {
        InitiativeNode {
            issue: Issue::new(key, "Init", IssueType::Initiative),
            features: vec![FeatureNode {
                issue: Issue::new(format!("F-{}", key), "Feature", IssueType::Feature),
                sub_features: vec![SubFeatureNode::from_epics(
                    Issue::new(format!("SF-{}", key), "Sub", IssueType::SubFeature),
                    epics,
                )],
                marked_release: None,
            }],
        }
    }

    fn hierarchy(initiatives: Vec<InitiativeNode>) -> Hierarchy {
        Hierarchy {
            initiatives,
            release: "PI-1".to_string(),
            query: String::new(),
            limit: None,
            original_count: 0,
        }
    }

    fn completed() -> Vec<String> {
        vec!["Done".to_string(), "Closed".to_string()]
    }

    #[test]
    fn test_completion_and_average_risk() {
        let h = hierarchy(vec![initiative(
            "I-1",
            vec![
                epic("E-1", "A", "done", Some(1)),
                epic("E-2", "A", "In Progress", Some(5)),
                epic("E-3", "B", "Open", None),
                epic("E-4", "B", "Closed", None),
            ],
        )]);

        let stats = StatisticsSnapshot::compute(&h, &completed());
        let i = &stats.per_initiative[0];
        assert_eq!(i.epics, 4);
        assert_eq!(i.completed_epics, 2);
        assert_eq!(i.completion_percent, 50.0);
        assert_eq!(i.average_risk, Some(3.0));
        assert_eq!(stats.epics_per_area.get("A"), Some(&2));
    }

    #[test]
    fn test_initiative_without_epics() {
        let h = hierarchy(vec![initiative("I-1", Vec::new())]);
        let stats = StatisticsSnapshot::compute(&h, &completed());
        assert_eq!(stats.per_initiative[0].completion_percent, 0.0);
        assert_eq!(stats.per_initiative[0].average_risk, None);
        assert!(stats.status_distribution.is_empty());
    }

    #[test]
    fn test_status_distribution_sorted_by_count_then_name() {
        let h = hierarchy(vec![initiative(
            "I-1",
            vec![
                epic("E-1", "A", "Open", None),
                epic("E-2", "A", "Done", None),
                epic("E-3", "A", "Open", None),
                epic("E-4", "A", "Blocked", None),
            ],
        )]);
        let stats = StatisticsSnapshot::compute(&h, &completed());
        let order: Vec<_> = stats
            .status_distribution
            .iter()
            .map(|s| (s.status.as_str(), s.count))
            .collect();
        assert_eq!(order, vec![("Open", 2), ("Blocked", 1), ("Done", 1)]);
        assert_eq!(stats.status_distribution[0].percent, 50.0);
    }

    #[test]
    fn test_initiatives_without_features_not_counted() {
        let mut empty = initiative("I-2", Vec::new());
        empty.features.clear();
        let h = hierarchy(vec![initiative("I-1", vec![epic("E-1", "A", "Open", None)]), empty]);
        let stats = StatisticsSnapshot::compute(&h, &completed());
        assert_eq!(stats.initiatives, 1);
        assert_eq!(stats.features, 1);
        assert_eq!(stats.epics, 1);
    }
}
