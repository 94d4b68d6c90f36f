//! Table model shared by the report renderers.
//!
//! Each initiative renders as a table: first column Feature / Sub-Feature,
//! then one column per area holding epic cards. Renderers differ only in
//! truncation and how many cards fit in a cell.

use crate::domain::{EpicNode, InitiativeNode};
use serde::Serialize;
use std::ops::Range;

/// Ellipsis appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Character budgets for truncated text, `None` for full text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    pub feature: Option<usize>,
    pub sub_feature: Option<usize>,
    pub epic: Option<usize>,
}

impl Truncation {
    /// Budgets used on A4 pages
    pub const COMPACT: Truncation = Truncation {
        feature: Some(45),
        sub_feature: Some(30),
        epic: Some(30),
    };

    pub const NONE: Truncation = Truncation {
        feature: None,
        sub_feature: None,
        epic: None,
    };
}

/// Cut `text` to `budget` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, budget: Option<usize>) -> String {
    match budget {
        Some(max) if text.chars().count() > max => {
            let cut: String = text.chars().take(max).collect();
            format!("{}{}", cut, ELLIPSIS)
        }
        _ => text.to_string(),
    }
}

/// Background colour of an epic card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
    Risk(u8),
    NoRisk,
    Completed,
}

impl CardColor {
    /// Completed epics are highlighted regardless of risk.
    pub fn for_epic(risk: Option<u8>, completed: bool) -> Self {
        if completed {
            return CardColor::Completed;
        }
        match risk {
            Some(r @ 1..=5) => CardColor::Risk(r),
            _ => CardColor::NoRisk,
        }
    }

    /// RGB components in 0.0..=1.0
    pub fn rgb(&self) -> (f32, f32, f32) {
        match self {
            CardColor::Risk(1) => (0.2, 0.8, 0.2),
            CardColor::Risk(2) => (0.6, 0.9, 0.3),
            CardColor::Risk(3) => (1.0, 0.8, 0.0),
            CardColor::Risk(4) => (1.0, 0.5, 0.0),
            CardColor::Risk(_) => (0.9, 0.2, 0.2),
            CardColor::NoRisk => (0.9, 0.9, 0.9),
            CardColor::Completed => (0.2, 0.9, 0.4),
        }
    }

    /// CSS hex colour
    pub fn hex(&self) -> String {
        let (r, g, b) = self.rgb();
        let channel = |c: f32| (c * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardColor::Risk(1) => "1 - Low Risk",
            CardColor::Risk(2) => "2 - Low-Medium",
            CardColor::Risk(3) => "3 - Medium",
            CardColor::Risk(4) => "4 - Medium-High",
            CardColor::Risk(_) => "5 - High Risk",
            CardColor::NoRisk => "No Risk Data",
            CardColor::Completed => "Completed Epic",
        }
    }

    /// Legend entries in display order
    pub fn legend() -> Vec<CardColor> {
        vec![
            CardColor::Risk(1),
            CardColor::Risk(2),
            CardColor::Risk(3),
            CardColor::Risk(4),
            CardColor::Risk(5),
            CardColor::Completed,
            CardColor::NoRisk,
        ]
    }
}

/// One colour swatch of the legend, as handed to page templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub hex: String,
}

/// Legend swatches in display order
pub fn legend_entries() -> Vec<LegendEntry> {
    CardColor::legend()
        .into_iter()
        .map(|c| LegendEntry {
            label: c.label(),
            hex: c.hex(),
        })
        .collect()
}

/// One epic as shown in a cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpicCard {
    pub key: String,
    pub label: String,
    pub status: String,
    pub assignee: Option<String>,
    pub risk: Option<u8>,
    pub completed: bool,
    pub active_sprint: bool,
    pub color: CardColor,
    pub color_hex: String,
}

impl EpicCard {
    fn new(epic: &EpicNode, truncation: &Truncation, completed_statuses: &[String]) -> Self {
        let completed = epic.issue.status_in(completed_statuses);
        let color = CardColor::for_epic(epic.issue.risk, completed);
        Self {
            key: epic.issue.key.clone(),
            label: truncate(&epic.issue.summary, truncation.epic),
            status: epic.issue.status.clone(),
            assignee: epic.issue.assignee.clone(),
            risk: epic.issue.risk,
            completed,
            active_sprint: epic.active_sprint,
            color,
            color_hex: color.hex(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Feature,
    SubFeature,
}

/// A table row; feature rows have empty cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub kind: RowKind,
    pub key: String,
    pub text: String,
    pub status: String,
    pub marked_release: Option<String>,
    /// One cell per table area, each a list of cards
    pub cells: Vec<Vec<EpicCard>>,
}

/// Table of one initiative
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiativeTable {
    pub key: String,
    pub summary: String,
    pub areas: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl InitiativeTable {
    /// Build the table over `areas` (usually the initiative's own areas).
    pub fn build(
        initiative: &InitiativeNode,
        areas: &[String],
        truncation: &Truncation,
        completed_statuses: &[String],
    ) -> Self {
        let mut rows = Vec::new();
        for feature in &initiative.features {
            rows.push(TableRow {
                kind: RowKind::Feature,
                key: feature.issue.key.clone(),
                text: truncate(&feature.issue.summary, truncation.feature),
                status: feature.issue.status.clone(),
                marked_release: feature.marked_release.clone(),
                cells: vec![Vec::new(); areas.len()],
            });

            for sub_feature in &feature.sub_features {
                let cells = areas
                    .iter()
                    .map(|area| {
                        sub_feature
                            .epics_in(area)
                            .iter()
                            .map(|epic| EpicCard::new(epic, truncation, completed_statuses))
                            .collect()
                    })
                    .collect();

                rows.push(TableRow {
                    kind: RowKind::SubFeature,
                    key: sub_feature.issue.key.clone(),
                    text: truncate(&sub_feature.issue.summary, truncation.sub_feature),
                    status: sub_feature.issue.status.clone(),
                    marked_release: sub_feature.marked_release.clone(),
                    cells,
                });
            }
        }

        Self {
            key: initiative.issue.key.clone(),
            summary: initiative.issue.summary.clone(),
            areas: areas.to_vec(),
            rows,
        }
    }

    /// Same rows restricted to a contiguous range of area columns.
    pub fn select(&self, columns: Range<usize>) -> Self {
        Self {
            key: self.key.clone(),
            summary: self.summary.clone(),
            areas: self.areas[columns.clone()].to_vec(),
            rows: self
                .rows
                .iter()
                .map(|row| TableRow {
                    cells: row.cells[columns.clone()].to_vec(),
                    ..row.clone()
                })
                .collect(),
        }
    }

    /// Split into consecutive views of at most `max_areas` columns.
    ///
    /// A table with no areas yields a single view.
    pub fn split(&self, max_areas: usize) -> Vec<InitiativeTable> {
        let max_areas = max_areas.max(1);
        if self.areas.len() <= max_areas {
            return vec![self.clone()];
        }
        (0..self.areas.len())
            .step_by(max_areas)
            .map(|start| self.select(start..(start + max_areas).min(self.areas.len())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureNode, Issue, IssueType, SubFeatureNode};

    fn initiative() -> InitiativeNode {
        let epics = vec![
            EpicNode::new(
                Issue::new("E-1", "A very long epic summary that overflows", IssueType::Epic)
                    .with_area("A")
                    .with_risk(4),
            ),
            EpicNode::new(
                Issue::new("E-2", "Done epic", IssueType::Epic)
                    .with_area("B")
                    .with_status("Done")
                    .with_risk(5),
            ),
        ];
        InitiativeNode {
            issue: Issue::new("I-1", "Init", IssueType::Initiative),
            features: vec![FeatureNode {
                issue: Issue::new(
                    "F-1",
                    "Feature summary that is definitely longer than forty-five characters",
                    IssueType::Feature,
                ),
                sub_features: vec![SubFeatureNode::from_epics(
                    Issue::new("SF-1", "Sub", IssueType::SubFeature),
                    epics,
                )],
                marked_release: None,
            }],
        }
    }

    #[test]
    fn test_truncate_is_char_based() {
        assert_eq!(truncate("short", Some(10)), "short");
        assert_eq!(truncate("abcdef", Some(3)), "abc...");
        assert_eq!(truncate("äöüäöü", Some(2)), "äö...");
        assert_eq!(truncate("abcdef", None), "abcdef");
    }

    #[test]
    fn test_card_colors() {
        assert_eq!(CardColor::for_epic(Some(1), false).rgb(), (0.2, 0.8, 0.2));
        assert_eq!(CardColor::for_epic(Some(5), true), CardColor::Completed);
        assert_eq!(CardColor::for_epic(None, false), CardColor::NoRisk);
        assert_eq!(CardColor::NoRisk.hex(), "#e6e6e6");
    }

    #[test]
    fn test_legend_entries_follow_card_colors() {
        let entries = legend_entries();
        assert_eq!(entries.len(), CardColor::legend().len());
        assert_eq!(entries[0].label, "1 - Low Risk");
        assert_eq!(entries[0].hex, CardColor::Risk(1).hex());
        assert_eq!(entries[5].label, "Completed Epic");
        assert!(entries.iter().all(|e| e.hex.starts_with('#') && e.hex.len() == 7));
    }

    #[test]
    fn test_build_applies_truncation_and_colors() {
        let areas = vec!["A".to_string(), "B".to_string()];
        let table = InitiativeTable::build(
            &initiative(),
            &areas,
            &Truncation::COMPACT,
            &["Done".to_string()],
        );

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].kind, RowKind::Feature);
        assert_eq!(table.rows[0].text.chars().count(), 45 + ELLIPSIS.len());
        let sub = &table.rows[1];
        assert_eq!(sub.cells[0][0].label, "A very long epic summary that ...");
        assert_eq!(sub.cells[0][0].color, CardColor::Risk(4));
        assert!(sub.cells[1][0].completed);
        assert_eq!(sub.cells[1][0].color, CardColor::Completed);
    }

    #[test]
    fn test_split_is_lossless_partition() {
        let areas: Vec<String> = (1..=7).map(|i| format!("P{}", i)).collect();
        let table = InitiativeTable::build(&initiative(), &areas, &Truncation::NONE, &[]);
        let views = table.split(5);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].areas.len(), 5);
        assert_eq!(views[1].areas.len(), 2);
        let joined: Vec<String> = views.iter().flat_map(|v| v.areas.clone()).collect();
        assert_eq!(joined, areas);
        for view in &views {
            let texts: Vec<_> = view.rows.iter().map(|r| &r.text).collect();
            let original: Vec<_> = table.rows.iter().map(|r| &r.text).collect();
            assert_eq!(texts, original);
        }
    }
}
