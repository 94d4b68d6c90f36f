//! Plain-text key export for backward check results.

use crate::backward_check::BackwardCheckResult;
use chrono::{DateTime, Utc};
use std::fmt::{self, Write};

const NONE: &str = "(none)";

fn heading(out: &mut impl Write, title: &str) -> fmt::Result {
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

fn key_list(out: &mut impl Write, title: &str, keys: &[String]) -> fmt::Result {
    heading(out, &format!("{} ({})", title, keys.len()))?;
    if keys.is_empty() {
        writeln!(out, "{}", NONE)?;
    }
    for key in keys {
        writeln!(out, "{}", key)?;
    }
    writeln!(out)
}

/// Key export of one result at a fixed time
struct KeysReport<'a> {
    result: &'a BackwardCheckResult,
    generated_at: DateTime<Utc>,
}

impl fmt::Display for KeysReport<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let summary = &result.summary;

        writeln!(out, "Backward Check Results")?;
        writeln!(out, "======================")?;
        writeln!(out, "Target release: {}", result.target_release)?;
        writeln!(out, "Query: {}", result.hierarchy.query)?;
        writeln!(
            out,
            "Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out)?;

        heading(out, "Summary")?;
        writeln!(out, "Features analysed: {}", summary.total_features)?;
        writeln!(out, "Sub-Features analysed: {}", summary.total_sub_features)?;
        writeln!(out, "Features with active work: {}", summary.features_with_active_work)?;
        writeln!(
            out,
            "Sub-Features with active work: {}",
            summary.sub_features_with_active_work
        )?;
        writeln!(out, "Epics in active sprints: {}", summary.epics_in_active_sprints)?;
        writeln!(out)?;

        key_list(out, "Features", &result.features_to_mark)?;
        key_list(out, "Sub-Features", &result.sub_features_to_mark)?;
        key_list(out, "Combined", &result.combined_keys())?;

        heading(out, "Bulk update queries")?;
        let queries = [
            ("Features", result.features_query()),
            ("Sub-Features", result.sub_features_query()),
            ("Combined", result.combined_query()),
        ];
        for (label, query) in queries {
            writeln!(out, "{}: {}", label, query.as_deref().unwrap_or(NONE))?;
        }
        Ok(())
    }
}

/// Render the summary, the key lists and the bulk-update queries.
///
/// Output depends only on the result and the timestamp.
pub fn render_keys(result: &BackwardCheckResult, generated_at: DateTime<Utc>) -> String {
    KeysReport {
        result,
        generated_at,
    }
    .to_string()
}
