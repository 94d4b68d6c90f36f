//! Error types and actionable error formatting.
//!
//! [`ViewerError`] is the error type of every fallible viewer operation.
//! [`ActionableError`] turns it into a message with:
//! - Clear error description
//! - Possible causes (diagnostics)
//! - Remediation steps (actionable fixes)

use std::fmt;
use thiserror::Error;

/// Failure of a viewer operation.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Missing or malformed form input
    #[error("invalid {field}: {reason}")]
    Input { field: String, reason: String },

    /// Jira rejected the token (HTTP 401)
    #[error("authentication failed for {target}")]
    RemoteAuth { target: String },

    /// Token lacks access to a project or issue (HTTP 403)
    #[error("permission denied for {target}")]
    RemotePermission { target: String },

    /// Jira rejected the JQL (HTTP 400)
    #[error("query rejected: {query}: {message}")]
    RemoteQuery { query: String, message: String },

    /// Network failure or unexpected HTTP status
    #[error("request failed for {target}: {message}")]
    RemoteTransport { target: String, message: String },

    /// Report generation failed
    #[error("failed to render {context}: {reason}")]
    Render { context: String, reason: String },

    /// Cache backend failure
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ViewerError {
    pub fn input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ViewerError::Input {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn render(context: impl Into<String>, reason: impl fmt::Display) -> Self {
        ViewerError::Render {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors raised while talking to Jira
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ViewerError::RemoteAuth { .. }
                | ViewerError::RemotePermission { .. }
                | ViewerError::RemoteQuery { .. }
                | ViewerError::RemoteTransport { .. }
        )
    }

    /// Attach diagnostics and remediation for display to the user.
    pub fn actionable(&self) -> ActionableError {
        match self {
            ViewerError::Input { field, reason } => {
                ActionableError::new(format!("Invalid {}: {}", field, reason))
                    .with_remedy(format!("Correct the {} field and submit again", field))
            }
            ViewerError::RemoteAuth { target } => {
                ActionableError::new(format!("Jira authentication failed ({})", target))
                    .with_cause("The access token is invalid or has expired")
                    .with_remedy("Check your access token and generate a new one if needed")
            }
            ViewerError::RemotePermission { target } => {
                ActionableError::new(format!("Jira denied access ({})", target))
                    .with_cause("The token's user cannot browse one of the projects involved")
                    .with_remedy("Check project permissions for the token's user")
            }
            ViewerError::RemoteQuery { query, message } => {
                ActionableError::new(format!("Jira rejected the query: {}", query))
                    .with_cause(message.clone())
                    .with_remedy("Check the JQL syntax in Jira's issue search first")
            }
            ViewerError::RemoteTransport { target, message } => {
                ActionableError::new(format!("Request to Jira failed ({})", target))
                    .with_cause(message.clone())
                    .with_cause("The server may be unreachable or temporarily overloaded")
                    .with_remedy("Verify the server URL")
                    .with_remedy("This is usually transient, retry in a moment")
            }
            ViewerError::Render { context, reason } => {
                ActionableError::new(format!("Could not generate {}", context))
                    .with_cause(reason.clone())
                    .with_remedy("Run the analysis again and retry the export")
            }
            ViewerError::Storage(e) => ActionableError::new(format!("Cache error: {:#}", e))
                .with_cause("The cache directory may not be writable")
                .with_remedy("Check permissions on the cache directory or disable the cache"),
        }
    }
}

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use initiative::errors::ActionableError;
///
/// let error = ActionableError::new("Jira authentication failed")
///     .with_cause("The access token has expired")
///     .with_remedy("Generate a new personal access token");
///
/// eprintln!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    /// The main error message
    error: String,
    /// Possible causes (diagnostic hints)
    causes: Vec<String>,
    /// Remediation steps (how to fix)
    remediation: Vec<String>,
}

impl ActionableError {
    /// Create a new actionable error with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step (actionable fix).
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    /// The main error message without causes or remediation
    pub fn headline(&self) -> &str {
        &self.error
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn remediation(&self) -> &[String] {
        &self.remediation
    }

    /// Convert to a formatted error message suitable for display.
    pub fn to_error_message(&self) -> String {
        let mut msg = format!("Error: {}\n", self.error);

        if !self.causes.is_empty() {
            msg.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str("\nTo fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}
