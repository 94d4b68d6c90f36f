//! Analysis form input and validation

use initiative::cache::AnalysisMode;
use initiative::ViewerError;
use serde::{Deserialize, Serialize};

/// Raw form fields as posted by the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub jql: String,
    #[serde(default)]
    pub release: String,
    /// "normal" or "backward_check"
    #[serde(default)]
    pub mode: String,
    /// Checkbox, present when ticked
    #[serde(default)]
    pub use_cache: Option<String>,
    #[serde(default)]
    pub limit: String,
}

/// Validated analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub url: String,
    pub token: String,
    pub jql: String,
    pub release: String,
    pub mode: AnalysisMode,
    pub use_cache: bool,
    pub limit: Option<usize>,
}

impl AnalyzeForm {
    pub fn mode(&self) -> AnalysisMode {
        match self.mode.trim() {
            "backward_check" | "backward" => AnalysisMode::BackwardCheck,
            _ => AnalysisMode::Normal,
        }
    }

    pub fn validate(&self) -> Result<AnalysisRequest, ViewerError> {
        let url = self.url.trim();
        let token = self.token.trim();
        let jql = self.jql.trim();
        let release = self.release.trim();

        if url.is_empty() || token.is_empty() || jql.is_empty() {
            return Err(ViewerError::input(
                "form",
                "server URL, access token and JQL query are required",
            ));
        }
        if !url.starts_with("http") {
            return Err(ViewerError::input(
                "server URL",
                "must start with http:// or https://",
            ));
        }
        if jql.to_lowercase().contains(" and order by") {
            return Err(ViewerError::input(
                "JQL query",
                "remove the 'AND ORDER BY' clause, results are ordered by rank",
            ));
        }

        let mode = self.mode();
        if mode == AnalysisMode::BackwardCheck && release.is_empty() {
            return Err(ViewerError::input(
                "release",
                "a target release is required for the backward check",
            ));
        }

        let limit = match self.limit.trim() {
            "" => None,
            raw => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(ViewerError::input(
                        "initiative limit",
                        format!("'{}' is not a positive whole number", raw),
                    ))
                }
            },
        };

        Ok(AnalysisRequest {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            jql: jql.to_string(),
            release: release.to_string(),
            mode,
            use_cache: self.use_cache.is_some(),
            limit,
        })
    }
}
