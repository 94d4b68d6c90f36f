//! PDF page layout.
//!
//! Decides page size, which areas each table view shows, column widths,
//! truncation and how many epic cards fit in a cell. Nothing here touches
//! the PDF library, so every layout rule is testable on plain data.

use crate::domain::Hierarchy;
use crate::report::html::limit_note;
use crate::report::table::{EpicCard, InitiativeTable, RowKind, Truncation};
use crate::stats::StatisticsSnapshot;

/// Areas at or below which the wide export fits an A3 page
pub const A3_MAX_AREAS: usize = 8;

const MM_PER_INCH: f32 = 25.4;

/// Page format of a PDF export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    /// A4 landscape with split views and truncated text
    A4,
    /// A3 landscape, single view
    A3,
    /// 20 inch wide page, single view
    Wide,
}

impl PageFormat {
    /// Format of the wide export for a report with `area_count` areas.
    pub fn for_wide_export(area_count: usize) -> Self {
        if area_count <= A3_MAX_AREAS {
            PageFormat::A3
        } else {
            PageFormat::Wide
        }
    }

    /// Width and height in millimetres
    pub fn size_mm(&self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (297.0, 210.0),
            PageFormat::A3 => (420.0, 297.0),
            PageFormat::Wide => (20.0 * MM_PER_INCH, 11.69 * MM_PER_INCH),
        }
    }

    /// Table width available after margins, in inches
    pub fn usable_width_in(&self) -> f32 {
        match self {
            PageFormat::A4 => 10.5,
            PageFormat::A3 => 16.0,
            PageFormat::Wide => 19.5,
        }
    }

    pub fn feature_column_in(&self) -> f32 {
        match self {
            PageFormat::A4 => 2.2,
            PageFormat::A3 | PageFormat::Wide => 2.5,
        }
    }

    pub fn truncation(&self) -> Truncation {
        match self {
            PageFormat::A4 => Truncation::COMPACT,
            PageFormat::A3 | PageFormat::Wide => Truncation::NONE,
        }
    }

    pub fn max_cards_per_cell(&self) -> usize {
        match self {
            PageFormat::A4 => 6,
            PageFormat::A3 | PageFormat::Wide => 8,
        }
    }

    /// Whether an initiative's table is split into views
    pub fn splits_views(&self) -> bool {
        matches!(self, PageFormat::A4)
    }

    /// Name used in export file names
    pub fn label(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
            PageFormat::A3 => "A3",
            PageFormat::Wide => "Wide",
        }
    }
}

/// Epic cards of one cell, capped for the page format
#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout {
    pub cards: Vec<EpicCard>,
    /// Cards left out of the cell
    pub more: usize,
}

impl CellLayout {
    fn new(mut cards: Vec<EpicCard>, max: usize) -> Self {
        let more = cards.len().saturating_sub(max);
        cards.truncate(max);
        Self { cards, more }
    }

    pub fn more_label(&self) -> Option<String> {
        (self.more > 0).then(|| format!("... and {} more epic(s)", self.more))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub kind: RowKind,
    pub key: String,
    pub text: String,
    pub marked_release: Option<String>,
    pub cells: Vec<CellLayout>,
}

/// One table of an initiative page
#[derive(Debug, Clone, PartialEq)]
pub struct ViewLayout {
    /// "View i of N: Areas ..." when the table is split
    pub label: Option<String>,
    pub areas: Vec<String>,
    /// Feature column first, then one width per area, in inches
    pub column_widths_in: Vec<f32>,
    pub rows: Vec<RowLayout>,
}

impl ViewLayout {
    fn new(table: &InitiativeTable, label: Option<String>, format: PageFormat) -> Self {
        let usable = format.usable_width_in();
        let feature = format.feature_column_in();
        let mut column_widths_in = Vec::with_capacity(table.areas.len() + 1);
        if table.areas.is_empty() {
            column_widths_in.push(usable);
        } else {
            column_widths_in.push(feature);
            let area_width = (usable - feature) / table.areas.len() as f32;
            column_widths_in.extend(std::iter::repeat(area_width).take(table.areas.len()));
        }

        let max_cards = format.max_cards_per_cell();
        let rows = table
            .rows
            .iter()
            .map(|row| RowLayout {
                kind: row.kind,
                key: row.key.clone(),
                text: row.text.clone(),
                marked_release: row.marked_release.clone(),
                cells: row
                    .cells
                    .iter()
                    .map(|cards| CellLayout::new(cards.clone(), max_cards))
                    .collect(),
            })
            .collect();

        Self {
            label,
            areas: table.areas.clone(),
            column_widths_in,
            rows,
        }
    }
}

/// Page (or run of pages) of one initiative
#[derive(Debug, Clone, PartialEq)]
pub struct InitiativePage {
    pub title: String,
    pub views: Vec<ViewLayout>,
}

/// Everything the drawing stage needs
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub format: PageFormat,
    pub title: String,
    pub release: String,
    /// Label/value rows of the title page
    pub metadata: Vec<(String, String)>,
    pub pages: Vec<InitiativePage>,
    pub stats: StatisticsSnapshot,
}

/// Layout inputs besides the hierarchy
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub max_areas_per_view: usize,
    pub completed_statuses: Vec<String>,
    /// Preformatted generation time for the title page
    pub generated_at: String,
}

/// Lay out a report for `format`.
///
/// A4 tables use the areas referenced by each initiative and split into
/// views beyond `max_areas_per_view`. Wide formats use every area of the
/// report in a single view. Initiatives without features get no page.
pub fn layout_report(hierarchy: &Hierarchy, format: PageFormat, options: &LayoutOptions) -> ReportLayout {
    let all_areas = hierarchy.all_areas();
    let truncation = format.truncation();

    let pages = hierarchy
        .initiatives_with_features()
        .map(|initiative| {
            let areas = if format.splits_views() {
                initiative.areas()
            } else {
                all_areas.clone()
            };
            let table =
                InitiativeTable::build(initiative, &areas, &truncation, &options.completed_statuses);

            let views = if format.splits_views() {
                table.split(options.max_areas_per_view)
            } else {
                vec![table]
            };
            let total = views.len();
            let views = views
                .iter()
                .enumerate()
                .map(|(i, view)| {
                    let label = (total > 1).then(|| {
                        format!("View {} of {}: Areas {}", i + 1, total, view.areas.join(", "))
                    });
                    ViewLayout::new(view, label, format)
                })
                .collect();

            InitiativePage {
                title: format!("{}: {}", initiative.issue.key, initiative.issue.summary),
                views,
            }
        })
        .collect::<Vec<_>>();

    let stats = StatisticsSnapshot::compute(hierarchy, &options.completed_statuses);

    let mut metadata = vec![
        (
            "Program Increment / Fix Version:".to_string(),
            hierarchy.release.clone(),
        ),
        ("Generated Date:".to_string(), options.generated_at.clone()),
        (
            "Total Initiatives Found:".to_string(),
            hierarchy.initiatives.len().to_string(),
        ),
    ];
    if let Some(note) = limit_note(hierarchy) {
        metadata.push(("Initiatives Limit Applied:".to_string(), note));
    }
    metadata.push((
        "Initiatives with Features:".to_string(),
        pages.len().to_string(),
    ));
    metadata.push(("Total Features:".to_string(), stats.features.to_string()));
    metadata.push(("Total Sub-Features:".to_string(), stats.sub_features.to_string()));
    metadata.push(("Total Epics:".to_string(), stats.epics.to_string()));
    metadata.push((
        "Total Areas/Projects:".to_string(),
        all_areas.len().to_string(),
    ));
    if !hierarchy.query.is_empty() {
        metadata.push(("JQL Query:".to_string(), hierarchy.query.clone()));
    }

    ReportLayout {
        format,
        title: "Initiative Hierarchy Report".to_string(),
        release: hierarchy.release.clone(),
        metadata,
        pages,
        stats,
    }
}
