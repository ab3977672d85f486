//! Issue Aggregation
//!
//! Collects open issues across the repositories of an organization

use crate::error::Result;
use crate::github::{GitHubClient, Issue, RepoRef};

/// Open issue count for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCount {
    pub repository: String,
    pub count: usize,
}

/// Per-repository issue counts plus their total
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueSummary {
    pub counts: Vec<IssueCount>,
    pub total: usize,
}

/// Resolve the repositories to scan: the given ones or every repo of `org`
async fn org_repos(
    client: &GitHubClient,
    org: &str,
    repos: Option<Vec<RepoRef>>,
) -> Result<Vec<RepoRef>> {
    match repos {
        Some(repos) => Ok(repos),
        None => Ok(client
            .list_org_repos(org)
            .await?
            .iter()
            .map(|repo| RepoRef::qualified(org, repo.name.clone()))
            .collect()),
    }
}

/// All open issues of `repos` (or every repository of `org`), in repo order
///
/// # Errors
/// Returns the first listing failure
pub async fn org_issues(
    client: &GitHubClient,
    org: &str,
    repos: Option<Vec<RepoRef>>,
) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    for repo in org_repos(client, org, repos).await? {
        issues.extend(client.list_repo_issues(&repo).await?);
    }
    Ok(issues)
}

/// Count open issues of `repos` (or every repository of `org`)
///
/// # Errors
/// Returns the first listing failure
pub async fn count_org_issues(
    client: &GitHubClient,
    org: &str,
    repos: Option<Vec<RepoRef>>,
) -> Result<IssueSummary> {
    let mut summary = IssueSummary::default();

    for repo in org_repos(client, org, repos).await? {
        let count = client.list_repo_issues(&repo).await?.len();
        tracing::debug!(repo = %repo, count, "Counted issues");
        summary.total += count;
        summary.counts.push(IssueCount {
            repository: repo.name().to_string(),
            count,
        });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issue(number: u64) -> serde_json::Value {
        json!({"number": number, "title": format!("Issue {}", number), "state": "open"})
    }

    #[tokio::test]
    async fn test_count_org_issues_over_all_repos() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orgs/sot/repos"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"name": "kadi"}, {"name": "xija"}])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/sot/kadi/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(1), issue(2)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/sot/xija/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(7)])))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let summary = count_org_issues(&client, "sot", None).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.counts,
            vec![
                IssueCount {
                    repository: "kadi".to_string(),
                    count: 2
                },
                IssueCount {
                    repository: "xija".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_org_issues_follows_pages_for_given_repos() {
        let server = MockServer::start().await;
        let route = "/repos/sot/kadi/issues";

        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([issue(1)]))
                    .insert_header(
                        "link",
                        format!("<{}{}?page=2>; rel=\"next\"", server.uri(), route).as_str(),
                    ),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(2)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/sot/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let issues = org_issues(&client, "sot", Some(vec![RepoRef::from("kadi")]))
            .await
            .unwrap();
        let numbers: Vec<u64> = issues.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
