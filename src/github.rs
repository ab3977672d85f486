//! GitHub API Client
//!
//! Module for managing interactions with the GitHub API: the paged fetcher
//! and the repository, issue and label endpoints built on top of it.

use std::collections::BTreeMap;
use std::fmt;

use octocrab::{Octocrab, Page};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{is_not_found_error, Error, Result};

/// Items requested per page on paginated endpoints
pub const PER_PAGE: u32 = 100;

/// Encode a string for use in URL path segments (RFC 3986 with UTF-8 support)
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, ., _, ~) are left unencoded.
fn encode_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            // RFC 3986 unreserved characters
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => c.to_string(),
            // Everything else gets percent-encoded as UTF-8 bytes
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect::<String>(),
        })
        .collect()
}

/// Account reference embedded in repository objects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerRef {
    pub login: String,
}

/// Repository as accepted by every repo-scoped operation
///
/// Either a bare name or a JSON object carrying at least `name`
/// (for instance an item returned by the repository listing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RepoRef {
    /// Bare repository name
    Name(String),

    /// Repository object
    Object {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<OwnerRef>,
        #[serde(flatten)]
        extra: serde_json::Map<String, Value>,
    },
}

impl RepoRef {
    /// Repository under an explicit owner
    pub fn qualified(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoRef::Object {
            name: name.into(),
            owner: Some(OwnerRef {
                login: owner.into(),
            }),
            extra: serde_json::Map::new(),
        }
    }

    /// Canonical repository name
    pub fn name(&self) -> &str {
        match self {
            RepoRef::Name(name) => name,
            RepoRef::Object { name, .. } => name,
        }
    }

    /// Owner carried by the reference, if any
    pub fn owner(&self) -> Option<&str> {
        match self {
            RepoRef::Name(_) => None,
            RepoRef::Object { owner, .. } => owner.as_ref().map(|o| o.login.as_str()),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for RepoRef {
    fn from(name: &str) -> Self {
        RepoRef::Name(name.to_string())
    }
}

impl From<String> for RepoRef {
    fn from(name: String) -> Self {
        RepoRef::Name(name)
    }
}

impl From<&Repository> for RepoRef {
    fn from(repo: &Repository) -> Self {
        match &repo.owner {
            Some(owner) => RepoRef::qualified(owner.login.clone(), repo.name.clone()),
            None => RepoRef::Name(repo.name.clone()),
        }
    }
}

/// GitHub Repository Information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub name: String,

    #[serde(default)]
    pub owner: Option<OwnerRef>,

    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub ssh_url: Option<String>,

    #[serde(default)]
    pub clone_url: Option<String>,
}

/// GitHub Issue Information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub number: u64,

    pub title: String,

    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub html_url: Option<String>,
}

/// GitHub Label Information
///
/// Represents label information retrieved from the GitHub API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubLabel {
    /// Label ID
    #[serde(default)]
    pub id: u64,

    /// Label name
    pub name: String,

    /// Label color (6-digit hexadecimal, without #)
    pub color: String,

    /// Label description
    #[serde(default)]
    pub description: Option<String>,

    /// Whether this is a default label
    #[serde(default)]
    pub default: bool,

    /// Label URL
    #[serde(default)]
    pub url: String,
}

/// Outcome of a label update request
#[derive(Debug, Clone, PartialEq)]
pub enum LabelEdit {
    /// Nothing was requested; the current label is reported
    Unchanged(GitHubLabel),

    /// The label was patched
    Patched {
        previous: GitHubLabel,
        current: GitHubLabel,
    },
}

#[derive(Serialize)]
struct LabelBody<'a> {
    name: &'a str,
    color: &'a str,
}

/// GitHub API Client
///
/// Holds the credential, API base URL and default owner for the process
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or client initialization fails
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let octocrab = Octocrab::builder()
            .personal_token(config.access_token.clone())
            .base_uri(config.api_url.as_str())
            .map_err(|e| Error::config_validation(format!("Invalid API URL: {}", e)))?
            .build()
            .map_err(|e| Error::config_validation(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self {
            octocrab,
            owner: config.owner.clone(),
        })
    }

    /// Default owner for bare repository names
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Fetch every page of a list endpoint
    ///
    /// Pages are requested from 1 with `per_page=100` until the response
    /// carries no `next` link. Items are returned in server order.
    ///
    /// # Arguments
    /// - `path`: Resource path relative to the API base URL
    /// - `params`: Extra query parameters sent with every page
    ///
    /// # Errors
    /// Returns an error on transport failure, non-2xx status or an undecodable body
    pub async fn fetch_all(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut query: BTreeMap<&str, String> = params
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect();
        query.insert("per_page", PER_PAGE.to_string());

        let mut results = Vec::new();
        let mut page = 1u32;

        loop {
            query.insert("page", page.to_string());
            tracing::debug!(path, page, "Fetching page");

            let response: Page<Value> = self.octocrab.get(path, Some(&query)).await?;
            let has_next = response.next.is_some();
            results.extend(response.items);

            if !has_next {
                break;
            }
            page += 1;
        }

        Ok(results)
    }

    /// Fetch every page of a list endpoint, decoding each item as `T`
    ///
    /// # Errors
    /// Same as [`GitHubClient::fetch_all`], plus item decoding failures
    pub async fn fetch_all_as<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        self.fetch_all(path, params)
            .await?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Error::from))
            .collect()
    }

    /// List repositories of `username`, or of the token owner when `None`
    pub async fn list_user_repos(&self, username: Option<&str>) -> Result<Vec<Repository>> {
        let path = match username {
            Some(user) => format!("/users/{}/repos", encode_path_segment(user)),
            None => "/user/repos".to_string(),
        };
        self.fetch_all_as(&path, &[]).await
    }

    /// List repositories of organization `org`
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>> {
        let path = format!("/orgs/{}/repos", encode_path_segment(org));
        self.fetch_all_as(&path, &[]).await
    }

    /// List repositories of `owner`, trying it as an organization first and
    /// falling back to the user listing when the organization does not exist
    pub async fn list_owner_repos(&self, owner: &str) -> Result<Vec<Repository>> {
        match self.list_org_repos(owner).await {
            Err(e) if e.is_not_found() => {
                tracing::debug!(owner, "No such organization, listing user repositories");
                self.list_user_repos(Some(owner)).await
            }
            other => other,
        }
    }

    /// List open issues of a repository
    pub async fn list_repo_issues(&self, repo: &RepoRef) -> Result<Vec<Issue>> {
        let path = self.repo_path(repo, "issues");
        self.fetch_all_as(&path, &[])
            .await
            .map_err(|e| self.classify(e, repo))
    }

    /// Get all labels from the repository
    ///
    /// # Errors
    /// Returns an error if GitHub API fails or repository is not found
    pub async fn list_labels(&self, repo: &RepoRef) -> Result<Vec<GitHubLabel>> {
        let path = self.repo_path(repo, "labels");
        self.fetch_all_as(&path, &[])
            .await
            .map_err(|e| self.classify(e, repo))
    }

    /// Find a label by exact name
    ///
    /// # Errors
    /// Returns [`Error::LabelNotFound`] if no label has that name
    pub async fn get_label(&self, repo: &RepoRef, name: &str) -> Result<GitHubLabel> {
        self.list_labels(repo)
            .await?
            .into_iter()
            .find(|label| label.name == name)
            .ok_or_else(|| Error::LabelNotFound {
                repo: self.full_name(repo),
                name: name.to_string(),
            })
    }

    /// Rename and/or recolor an existing label
    ///
    /// The label is looked up first. With neither `new_name` nor `new_color`
    /// nothing is written and the current label is reported back; a field
    /// left out of the patch keeps its current value.
    ///
    /// # Errors
    /// Returns an error if the label does not exist or the update fails
    pub async fn update_label(
        &self,
        repo: &RepoRef,
        name: &str,
        new_name: Option<&str>,
        new_color: Option<&str>,
    ) -> Result<LabelEdit> {
        let label = self.get_label(repo, name).await?;

        if new_name.is_none() && new_color.is_none() {
            return Ok(LabelEdit::Unchanged(label));
        }

        let current = self
            .patch_label(
                repo,
                &label.name,
                new_name.unwrap_or(&label.name),
                new_color.unwrap_or(&label.color),
            )
            .await?;

        Ok(LabelEdit::Patched {
            previous: label,
            current,
        })
    }

    /// PATCH a label without looking it up first
    ///
    /// # Errors
    /// Returns an error if GitHub API fails
    pub async fn patch_label(
        &self,
        repo: &RepoRef,
        current_name: &str,
        new_name: &str,
        new_color: &str,
    ) -> Result<GitHubLabel> {
        let path = self.repo_path(
            repo,
            &format!("labels/{}", encode_path_segment(current_name)),
        );
        tracing::info!(
            repo = %self.full_name(repo),
            from = current_name,
            to = new_name,
            color = new_color,
            "Updating label"
        );

        self.octocrab
            .patch(
                path,
                Some(&LabelBody {
                    name: new_name,
                    color: new_color,
                }),
            )
            .await
            .map_err(|e| match e {
                e if is_not_found_error(&e) => Error::LabelNotFound {
                    repo: self.full_name(repo),
                    name: current_name.to_string(),
                },
                e => e.into(),
            })
    }

    /// Create a new label
    ///
    /// # Returns
    /// Information about the created label
    ///
    /// # Errors
    /// Returns an error if GitHub API fails or label creation fails
    pub async fn create_label(
        &self,
        repo: &RepoRef,
        name: &str,
        color: &str,
    ) -> Result<GitHubLabel> {
        let path = self.repo_path(repo, "labels");
        tracing::info!(repo = %self.full_name(repo), name, color, "Creating label");

        self.octocrab
            .post(path, Some(&LabelBody { name, color }))
            .await
            .map_err(Error::from)
    }

    /// `owner/name` for a repository reference
    pub fn full_name(&self, repo: &RepoRef) -> String {
        format!("{}/{}", self.repo_owner(repo), repo.name())
    }

    fn repo_owner<'a>(&'a self, repo: &'a RepoRef) -> &'a str {
        repo.owner().unwrap_or(&self.owner)
    }

    fn repo_path(&self, repo: &RepoRef, tail: &str) -> String {
        format!(
            "/repos/{}/{}/{}",
            encode_path_segment(self.repo_owner(repo)),
            encode_path_segment(repo.name()),
            tail
        )
    }

    /// A 404 on a repository-scoped read means the repository is missing
    fn classify(&self, error: Error, repo: &RepoRef) -> Error {
        match error {
            Error::GitHubApi(ref e) if is_not_found_error(e) => {
                Error::RepositoryNotFound(self.full_name(repo))
            }
            other => other,
        }
    }
}
