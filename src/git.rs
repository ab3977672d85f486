//! Repository Mirror
//!
//! Clones or updates working copies with the `git` CLI. Each repository
//! lives in a directory named after it under a common working directory.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::github::{GitHubClient, Repository};

/// What happened to a working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoUpdate {
    Cloned,
    Pulled,
}

/// Clone `url` into `workdir/name`, or pull if that directory exists
///
/// # Errors
/// Returns [`Error::Git`] if git exits with a nonzero status
pub async fn update_repo(name: &str, url: &str, workdir: &Path) -> Result<RepoUpdate> {
    let target = workdir.join(name);

    if target.exists() {
        tracing::info!(repo = name, "Updating");
        run_git(name, &["pull", "origin"], &target).await?;
        Ok(RepoUpdate::Pulled)
    } else {
        tracing::info!(repo = name, url, "Cloning");
        run_git(name, &["clone", url], workdir).await?;
        Ok(RepoUpdate::Cloned)
    }
}

async fn run_git(repo: &str, args: &[&str], dir: &Path) -> Result<()> {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .await?;

    if !status.success() {
        return Err(Error::Git {
            repo: repo.to_string(),
            command: args.join(" "),
            code: status.code(),
        });
    }

    Ok(())
}

/// Which URL to clone GitHub repositories from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneProtocol {
    #[default]
    Ssh,
    Https,
}

/// Clone URL of a listed repository for the requested protocol
pub fn clone_url(repo: &Repository, protocol: CloneProtocol) -> Option<&str> {
    match protocol {
        CloneProtocol::Ssh => repo.ssh_url.as_deref(),
        CloneProtocol::Https => repo.clone_url.as_deref(),
    }
}

/// Repositories kept by the `private` filter (`None` keeps everything)
pub fn filter_private(repos: Vec<Repository>, private: Option<bool>) -> Vec<Repository> {
    repos
        .into_iter()
        .filter(|repo| private.map_or(true, |wanted| repo.private == wanted))
        .collect()
}

/// Mirror the repositories of `username` (or of the token owner)
///
/// # Errors
/// Stops at the first listing or git failure
pub async fn update_github_repos(
    client: &GitHubClient,
    username: Option<&str>,
    private: Option<bool>,
    protocol: CloneProtocol,
    workdir: &Path,
) -> Result<Vec<(String, RepoUpdate)>> {
    let repos = filter_private(client.list_user_repos(username).await?, private);

    let mut updated = Vec::with_capacity(repos.len());
    for repo in &repos {
        let url = clone_url(repo, protocol).ok_or_else(|| {
            Error::config_validation(format!("Repository {} has no clone URL", repo.name))
        })?;
        let outcome = update_repo(&repo.name, url, workdir).await?;
        updated.push((repo.name.clone(), outcome));
    }

    Ok(updated)
}

/// Bare repositories matching `pattern`, as `(name, path)` pairs
///
/// The name is the file name with its `.git` suffix removed.
///
/// # Errors
/// Returns an error if the pattern is invalid
pub fn local_bare_repos(pattern: &str) -> Result<Vec<(String, PathBuf)>> {
    let mut repos = Vec::new();

    for entry in glob::glob(pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable path");
                continue;
            }
        };

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name = file_name.strip_suffix(".git").unwrap_or(file_name).to_string();
        repos.push((name, path));
    }

    Ok(repos)
}

/// Mirror every bare repository matching `pattern`
///
/// # Errors
/// Stops at the first git failure
pub async fn update_local_repos(pattern: &str, workdir: &Path) -> Result<Vec<(String, RepoUpdate)>> {
    let mut updated = Vec::new();

    for (name, path) in local_bare_repos(pattern)? {
        let url = path.to_string_lossy();
        let outcome = update_repo(&name, &url, workdir).await?;
        updated.push((name, outcome));
    }

    Ok(updated)
}
