//! Error Handling
//!
//! Error type definitions used in gh-org-sync

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gh-org-sync
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {}", describe_api_error(.0))]
    GitHubApi(#[from] octocrab::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("Label validation error: {0}")]
    LabelValidation(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("No label '{name}' found in {repo}")]
    LabelNotFound { repo: String, name: String },

    #[error("git {command} failed for {repo} (exit code {code:?})")]
    Git {
        repo: String,
        command: String,
        code: Option<i32>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid repository format: {0} (expected 'repo' or 'owner/repo')")]
    InvalidRepositoryFormat(String),

    #[error("Invalid label color: {0} (expected 6-digit hex)")]
    InvalidLabelColor(String),
}

impl Error {
    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(message: S) -> Self {
        Error::ConfigValidation(message.into())
    }

    /// Create a new label validation error
    pub fn label_validation<S: Into<String>>(message: S) -> Self {
        Error::LabelValidation(message.into())
    }

    /// Whether this error is a 404 from the GitHub API
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::RepositoryNotFound(_) | Error::LabelNotFound { .. } => true,
            Error::GitHubApi(e) => is_not_found_error(e),
            _ => false,
        }
    }
}

/// Check if an octocrab error is a 404 Not Found
pub(crate) fn is_not_found_error(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404)
}

/// API message and status for GitHub errors; octocrab's own display drops both
fn describe_api_error(err: &octocrab::Error) -> String {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            format!("{} ({})", source.message, source.status_code)
        }
        other => other.to_string(),
    }
}
