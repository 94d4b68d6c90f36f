//! Confluence-compatible HTML export.
//!
//! Produces a body fragment with inline styles and no scripts so it can be
//! pasted into a static page.

use super::table::{legend_entries, InitiativeTable, Truncation};
use crate::backward_check::BackwardCheckSummary;
use crate::domain::Hierarchy;
use crate::errors::ViewerError;
use crate::stats::StatisticsSnapshot;
use chrono::{DateTime, Utc};
use tera::{Context, Tera};

const CONFLUENCE_TEMPLATE: &str = include_str!("templates/confluence.html");

/// Tables of every initiative with features, full text, own areas as columns
pub fn initiative_tables(hierarchy: &Hierarchy, completed_statuses: &[String]) -> Vec<InitiativeTable> {
    hierarchy
        .initiatives_with_features()
        .map(|i| InitiativeTable::build(i, &i.areas(), &Truncation::NONE, completed_statuses))
        .collect()
}

/// "Limited to N of M initiatives" when the limit cut initiatives off
pub fn limit_note(hierarchy: &Hierarchy) -> Option<String> {
    match hierarchy.limit {
        Some(limit) if hierarchy.is_limited() => Some(format!(
            "Limited to {} of {} initiatives",
            limit, hierarchy.original_count
        )),
        _ => None,
    }
}

/// Render the Confluence export.
pub fn render_confluence(
    hierarchy: &Hierarchy,
    backward_check: Option<&BackwardCheckSummary>,
    completed_statuses: &[String],
    generated_at: DateTime<Utc>,
) -> Result<String, ViewerError> {
    let mut tera = Tera::default();
    tera.add_raw_template("confluence.html", CONFLUENCE_TEMPLATE)
        .map_err(|e| ViewerError::render("HTML export", format!("{:?}", e)))?;

    let stats = StatisticsSnapshot::compute(hierarchy, completed_statuses);
    let legend = legend_entries();

    let mut context = Context::new();
    context.insert("release", &hierarchy.release);
    context.insert(
        "generated_at",
        &generated_at.format("%B %d, %Y at %H:%M UTC").to_string(),
    );
    context.insert("query", &hierarchy.query);
    context.insert("initiatives_total", &hierarchy.initiatives.len());
    context.insert("limit_note", &limit_note(hierarchy));
    context.insert("areas_total", &hierarchy.all_areas().len());
    context.insert("stats", &stats);
    context.insert("backward_check", &backward_check);
    context.insert("legend", &legend);
    context.insert("tables", &initiative_tables(hierarchy, completed_statuses));

    tera.render("confluence.html", &context)
        .map_err(|e| ViewerError::render("HTML export", format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EpicNode, FeatureNode, InitiativeNode, Issue, IssueType, SubFeatureNode};
    use chrono::TimeZone;

    fn hierarchy() -> Hierarchy {
        let sf = SubFeatureNode::from_epics(
            Issue::new("SF-1", "Sub <script>", IssueType::SubFeature),
            vec![EpicNode::new(
                Issue::new("E-1", "Epic one", IssueType::Epic)
                    .with_area("PAY")
                    .with_risk(5),
            )],
        );
        Hierarchy {
            initiatives: vec![
                InitiativeNode {
                    issue: Issue::new("I-1", "Payments", IssueType::Initiative),
                    features: vec![FeatureNode {
                        issue: Issue::new("F-1", "Checkout", IssueType::Feature),
                        sub_features: vec![sf],
                        marked_release: None,
                    }],
                },
                InitiativeNode {
                    issue: Issue::new("I-2", "Hollow", IssueType::Initiative),
                    features: Vec::new(),
                },
            ],
            release: "PI-1".to_string(),
            query: "type = Initiative".to_string(),
            limit: Some(2),
            original_count: 5,
        }
    }

    fn render(h: &Hierarchy) -> String {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        render_confluence(h, None, &["Done".to_string()], at).unwrap()
    }

    #[test]
    fn test_render_contains_tree_and_metadata() {
        let html = render(&hierarchy());
        assert!(html.contains("PI-1"));
        assert!(html.contains("March 01, 2026 at 12:00 UTC"));
        assert!(html.contains("FEATURE: F-1"));
        assert!(html.contains("Sub: SF-1"));
        assert!(html.contains("E-1"));
        assert!(html.contains("#e63333"));
        assert!(html.contains("Limited to 2 of 5 initiatives"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_initiatives_without_features_excluded() {
        let html = render(&hierarchy());
        assert!(!html.contains("I-2: Hollow"));
        assert!(html.contains("I-1: Payments"));
    }

    #[test]
    fn test_no_limit_note_when_not_limited() {
        let mut h = hierarchy();
        h.original_count = 1;
        assert_eq!(limit_note(&h), None);
        assert!(!render(&h).contains("Limit Applied"));
    }
}
