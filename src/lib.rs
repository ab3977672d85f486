//! # gh-org-sync
//!
//! Keep an organization's GitHub repositories in order
//!
//! ## Features
//! - Paged listing of repositories, issues and labels
//! - Standard label enforcement (legacy renames, missing label creation)
//! - Non-standard label reporting
//! - Open issue counts across an organization
//! - Local mirrors of GitHub and bare repositories via `git`

pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod issues;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, StandardLabel, StandardLabels};
pub use error::{Error, Result};
pub use github::{GitHubClient, GitHubLabel, RepoRef, Repository};
pub use sync::{LabelSyncer, SyncResult};

/// Enforce the standard label set on a list of repositories
///
/// Repositories are processed in order and the first failure stops the batch.
///
/// # Examples
///
/// ```rust,no_run
/// use gh_org_sync::{config::default_standard_labels, ClientConfig, RepoRef};
///
/// #[tokio::main]
/// async fn main() -> gh_org_sync::Result<()> {
///     let config = ClientConfig::new("your_github_token", "sot");
///     let repos = vec![RepoRef::from("chandra_aca"), RepoRef::from("kadi")];
///
///     let results =
///         gh_org_sync::standardize_repo_labels(&config, &repos, &default_standard_labels(), false)
///             .await?;
///     for result in results {
///         println!("{}: {} renamed, {} created", result.repository, result.renamed, result.created);
///     }
///     Ok(())
/// }
/// ```
pub async fn standardize_repo_labels(
    config: &ClientConfig,
    repos: &[RepoRef],
    standard: &StandardLabels,
    dry_run: bool,
) -> Result<Vec<SyncResult>> {
    let client = GitHubClient::new(config)?;
    let batch = LabelSyncer::new(&client, standard)
        .dry_run(dry_run)
        .synchronize_many(repos, false)
        .await?;
    Ok(batch.results)
}
