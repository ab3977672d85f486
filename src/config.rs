//! Configuration Management
//!
//! Client settings and the standard label set

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default GitHub REST API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Owner used when a repository is named without one
pub const DEFAULT_OWNER: &str = "sot";

/// Color given to labels created without an explicit color
pub const DEFAULT_LABEL_COLOR: &str = "808080";

/// Environment variable holding the access token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Older environment variable consulted when [`TOKEN_ENV_VAR`] is unset
pub const LEGACY_TOKEN_ENV_VAR: &str = "GITHUB_SOT_OAUTH";

/// Convention-based standard label files searched in order
pub const CONVENTION_CONFIG_FILES: &[&str] = &[
    ".gh-org-sync.json",
    ".gh-org-sync.yaml",
    ".gh-org-sync.yml",
    ".github/standard-labels.json",
    ".github/standard-labels.yaml",
    ".github/standard-labels.yml",
];

/// Standard Label
///
/// A canonical label name and the color every repository should use for it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandardLabel {
    /// Label name (exact casing is enforced)
    pub name: String,

    /// Label color (6-digit hex, `#` prefix optional in files)
    pub color: String,
}

impl StandardLabel {
    /// Create a new standard label with a normalized color
    ///
    /// # Errors
    /// Returns an error if the name is empty or the color is not 6-digit hex
    pub fn new(name: impl Into<String>, color: impl AsRef<str>) -> Result<Self> {
        let label = Self {
            name: name.into(),
            color: normalize_color(color.as_ref()),
        };

        label.validate()?;
        Ok(label)
    }

    /// Validate the label definition
    ///
    /// # Errors
    /// - If the name is empty
    /// - If the color is not 6-digit hex
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::label_validation("Label name cannot be empty"));
        }

        if !is_valid_hex_color(&normalize_color(&self.color)) {
            return Err(Error::InvalidLabelColor(self.color.clone()));
        }

        Ok(())
    }
}

/// Normalize color (remove # and convert to lowercase)
pub fn normalize_color(color: &str) -> String {
    color.trim().trim_start_matches('#').to_lowercase()
}

/// Standard Label Set
///
/// Ordered, read-only mapping from label name to canonical color.
/// Names are unique; colors are stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StandardLabel>", into = "Vec<StandardLabel>")]
pub struct StandardLabels {
    labels: Vec<StandardLabel>,
}

impl StandardLabels {
    /// Build a standard set from label definitions
    ///
    /// # Errors
    /// Returns an error if any label is invalid or a name appears twice
    pub fn new(labels: Vec<StandardLabel>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(labels.len());

        for label in labels {
            label.validate()?;
            if !seen.insert(label.name.clone()) {
                return Err(Error::label_validation(format!(
                    "Duplicate standard label: {}",
                    label.name
                )));
            }
            normalized.push(StandardLabel {
                color: normalize_color(&label.color),
                name: label.name,
            });
        }

        Ok(Self { labels: normalized })
    }

    /// Canonical color for `name`, if it is a standard label
    pub fn color_of(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.color.as_str())
    }

    /// Whether `name` is exactly a standard label name
    pub fn contains(&self, name: &str) -> bool {
        self.color_of(name).is_some()
    }

    /// Iterate over the labels in definition order
    pub fn iter(&self) -> impl Iterator<Item = &StandardLabel> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl TryFrom<Vec<StandardLabel>> for StandardLabels {
    type Error = Error;

    fn try_from(labels: Vec<StandardLabel>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<StandardLabels> for Vec<StandardLabel> {
    fn from(set: StandardLabels) -> Self {
        set.labels
    }
}

impl Default for StandardLabels {
    fn default() -> Self {
        default_standard_labels()
    }
}

/// Generate the built-in standard label set
pub fn default_standard_labels() -> StandardLabels {
    let labels = [
        ("bug", "fc2929"),
        ("duplicate", "cccccc"),
        ("enhancement", "84b6eb"),
        ("invalid", "e6e6e6"),
        ("help wanted", "159818"),
        ("question", "cc317c"),
        ("wontfix", "ffffff"),
        ("Priority-Low", "fee8c8"),
        ("Priority-Medium", "fdbb84"),
        ("Priority-High", "e34a33"),
        ("Ready for Final Review", "fee8c8"),
    ]
    .into_iter()
    .map(|(name, color)| StandardLabel {
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect();

    StandardLabels { labels }
}

/// Client Configuration
///
/// Everything needed to talk to the GitHub API, built once per process
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GitHub access token
    pub access_token: String,

    /// REST API base URL
    pub api_url: String,

    /// Owner (user or organization) used for bare repository names
    pub owner: String,
}

impl ClientConfig {
    /// Create a configuration against the public GitHub API
    pub fn new(access_token: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            owner: owner.into(),
        }
    }

    /// Override the API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Validate configuration
    ///
    /// # Errors
    /// - If the access token is empty
    /// - If the owner is empty
    /// - If the API URL is empty
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::config_validation("Access token is required"));
        }

        if self.owner.trim().is_empty() {
            return Err(Error::config_validation("Owner is required"));
        }

        if self.api_url.trim().is_empty() {
            return Err(Error::config_validation("API URL cannot be empty"));
        }

        Ok(())
    }
}

/// Resolve the access token from an explicit value or the environment
///
/// Order: the explicit value, then [`TOKEN_ENV_VAR`], then
/// [`LEGACY_TOKEN_ENV_VAR`]. Blank values are skipped.
///
/// # Errors
/// Returns an error if none is set
pub fn resolve_access_token(arg_token: Option<String>) -> Result<String> {
    let non_blank = |token: &String| !token.trim().is_empty();
    arg_token
        .filter(non_blank)
        .or_else(|| std::env::var(TOKEN_ENV_VAR).ok().filter(non_blank))
        .or_else(|| std::env::var(LEGACY_TOKEN_ENV_VAR).ok().filter(non_blank))
        .ok_or_else(|| {
            Error::config_validation(format!(
                "GitHub access token is required. Set via --access-token or the {} env var",
                TOKEN_ENV_VAR
            ))
        })
}

/// Split a repository argument into owner and name
///
/// Accepts `repo` (owned by `default_owner`) or `owner/repo`.
///
/// # Errors
/// Returns an error if the format is invalid
pub fn parse_repository(repo: &str, default_owner: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = repo.split('/').collect();
    match parts.as_slice() {
        [name] if !name.is_empty() => Ok((default_owner.to_string(), name.to_string())),
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(Error::InvalidRepositoryFormat(repo.to_string())),
    }
}

/// Load a standard label set from JSON file
///
/// # Errors
/// If file reading, parsing or validation fails
pub fn load_labels_from_json<P: AsRef<Path>>(path: P) -> Result<StandardLabels> {
    let content = std::fs::read_to_string(path)?;
    let labels: Vec<StandardLabel> = serde_json::from_str(&content)?;
    StandardLabels::new(labels)
}

/// Load a standard label set from YAML file
///
/// # Errors
/// If file reading, parsing or validation fails
pub fn load_labels_from_yaml<P: AsRef<Path>>(path: P) -> Result<StandardLabels> {
    let content = std::fs::read_to_string(path)?;
    let labels: Vec<StandardLabel> = serde_yaml::from_str(&content)?;
    StandardLabels::new(labels)
}

/// Load a standard label set from a file, detecting format by extension
///
/// # Errors
/// If file reading, parsing, or validation fails, or if the extension is unsupported
pub fn load_labels_from_file<P: AsRef<Path>>(path: P) -> Result<StandardLabels> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Standard label file not found: {}", path.display()),
        )
        .into());
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_labels_from_json(path),
        Some("yaml") | Some("yml") => load_labels_from_yaml(path),
        _ => Err(Error::config_validation(
            "Standard label file must be .json, .yaml, or .yml",
        )),
    }
}

/// Search for a convention-based standard label file in the given directory
///
/// Searches [`CONVENTION_CONFIG_FILES`] in order and returns the first match.
pub fn find_convention_config_in(dir: &Path) -> Option<PathBuf> {
    CONVENTION_CONFIG_FILES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
}

/// Resolve the standard label set to enforce
///
/// An explicit file wins, then a convention file in `dir`, then the built-in set.
pub fn resolve_standard_labels(explicit: Option<&Path>, dir: &Path) -> Result<StandardLabels> {
    if let Some(path) = explicit {
        return load_labels_from_file(path);
    }

    match find_convention_config_in(dir) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Using convention standard label file");
            load_labels_from_file(path)
        }
        None => Ok(default_standard_labels()),
    }
}

/// Validate hex color code
///
/// # Arguments
/// - `color`: Color code (6-digit hex without #)
fn is_valid_hex_color(color: &str) -> bool {
    color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit())
}
