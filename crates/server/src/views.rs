//! HTML pages rendered with Tera

use crate::form::AnalyzeForm;
use anyhow::{Context as _, Result};
use initiative::backward_check::BackwardCheckSummary;
use initiative::report::html::{initiative_tables, limit_note};
use initiative::report::table::legend_entries;
use initiative::{AnalysisResult, StatisticsSnapshot, ViewerError};
use serde::Serialize;
use tera::{Context, Tera};

const BASE: &str = include_str!("templates/base.html");
const FORM: &str = include_str!("templates/form.html");
const HIERARCHY: &str = include_str!("templates/hierarchy.html");

#[derive(Debug, Serialize)]
struct ErrorView<'a> {
    headline: &'a str,
    causes: &'a [String],
    remediation: &'a [String],
}

#[derive(Debug, Serialize)]
struct BackwardView<'a> {
    summary: &'a BackwardCheckSummary,
    combined_query: Option<String>,
}

/// An analysis result about to be shown
pub struct ResultPage<'a> {
    /// Cache id for export links, `None` when caching failed
    pub id: Option<&'a str>,
    pub result: &'a AnalysisResult,
    /// Age in seconds when served from the cache
    pub cached_age: Option<i64>,
    pub completed_statuses: &'a [String],
}

/// Compiled page templates
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", BASE),
            ("form.html", FORM),
            ("hierarchy.html", HIERARCHY),
        ])
        .context("Failed to compile page templates")?;
        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .with_context(|| format!("Failed to render {}", name))
    }

    /// The analysis form, refilled from `form` and showing `error` if any.
    ///
    /// The token is never echoed back.
    pub fn form_page(
        &self,
        form: &AnalyzeForm,
        error: Option<&ViewerError>,
        always_cached: bool,
    ) -> Result<String> {
        let form = AnalyzeForm {
            token: String::new(),
            ..form.clone()
        };
        let actionable = error.map(ViewerError::actionable);
        let error = actionable.as_ref().map(|a| ErrorView {
            headline: a.headline(),
            causes: a.causes(),
            remediation: a.remediation(),
        });

        let mut context = Context::new();
        context.insert("form", &form);
        context.insert("error", &error);
        context.insert("always_cached", &always_cached);
        self.render("form.html", &context)
    }

    pub fn result_page(&self, page: &ResultPage<'_>) -> Result<String> {
        let hierarchy = page.result.hierarchy();
        let legend = legend_entries();
        let backward = page.result.backward_check().map(|r| BackwardView {
            summary: &r.summary,
            combined_query: r.combined_query(),
        });

        let mut context = Context::new();
        context.insert("release", &hierarchy.release);
        context.insert("query", &hierarchy.query);
        context.insert("cache_id", &page.id);
        context.insert("cache_age", &page.cached_age.map(|secs| secs / 60));
        context.insert("limit_note", &limit_note(hierarchy));
        context.insert(
            "stats",
            &StatisticsSnapshot::compute(hierarchy, page.completed_statuses),
        );
        context.insert("legend", &legend);
        context.insert("backward", &backward);
        context.insert(
            "tables",
            &initiative_tables(hierarchy, page.completed_statuses),
        );
        self.render("hierarchy.html", &context)
    }
}
