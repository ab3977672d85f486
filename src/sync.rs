//! Label Synchronization Functionality
//!
//! Brings repository labels in line with the standard label set. Runs in two
//! phases: legacy labels whose lower-cased name is standard are renamed and
//! recolored, then the label list is read again and missing standard labels
//! are created. Labels with no case-insensitive standard match are left alone.

use std::collections::HashSet;

use crate::config::StandardLabels;
use crate::error::{Error, Result};
use crate::github::{GitHubClient, GitHubLabel, RepoRef};

/// Types of label synchronization operations
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation {
    /// Rename a legacy label to its standard casing and color
    Rename {
        current_name: String,
        new_name: String,
        color: String,
    },

    /// Create a missing standard label
    Create { name: String, color: String },
}

/// Synchronization result for a single repository
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Repository in `owner/name` form
    pub repository: String,

    /// Operations performed (or planned, in dry-run mode)
    pub operations: Vec<SyncOperation>,

    /// Number of labels renamed
    pub renamed: u32,

    /// Number of labels created
    pub created: u32,

    /// Whether this is a dry run
    pub dry_run: bool,
}

impl SyncResult {
    /// Create a new empty synchronization result
    pub fn new(repository: impl Into<String>, dry_run: bool) -> Self {
        Self {
            repository: repository.into(),
            operations: Vec::new(),
            renamed: 0,
            created: 0,
            dry_run,
        }
    }

    /// Add an operation and update statistics
    pub fn add_operation(&mut self, operation: SyncOperation) {
        match &operation {
            SyncOperation::Rename { .. } => self.renamed += 1,
            SyncOperation::Create { .. } => self.created += 1,
        }
        self.operations.push(operation);
    }

    /// Whether changes will occur
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }
}

/// Outcome of synchronizing several repositories
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Repositories that were synchronized, in order
    pub results: Vec<SyncResult>,

    /// Repositories that failed, with their error
    pub failures: Vec<(String, Error)>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Non-standard labels found on one repository
#[derive(Debug, Clone, PartialEq)]
pub struct NonStandardReport {
    pub repository: String,
    pub labels: Vec<GitHubLabel>,
}

/// Label Synchronization Engine
pub struct LabelSyncer<'a> {
    client: &'a GitHubClient,
    standard: &'a StandardLabels,
    dry_run: bool,
}

impl<'a> LabelSyncer<'a> {
    /// Create a new label synchronization engine
    pub fn new(client: &'a GitHubClient, standard: &'a StandardLabels) -> Self {
        Self {
            client,
            standard,
            dry_run: false,
        }
    }

    /// Plan without writing anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Synchronize the labels of one repository
    ///
    /// # Errors
    /// Returns the first read or write failure; writes already issued stay applied
    pub async fn synchronize(&self, repo: &RepoRef) -> Result<SyncResult> {
        let mut result = SyncResult::new(self.client.full_name(repo), self.dry_run);

        // Phase 1: downcase and recolor legacy labels such as "Bug"
        let labels = self.client.list_labels(repo).await?;
        let renames = self.plan_renames(&labels);
        for operation in renames {
            self.execute_operation(repo, &operation).await?;
            result.add_operation(operation);
        }

        // Phase 2: create whatever standard labels are still missing
        let labels = self.client.list_labels(repo).await?;
        let mut present: HashSet<String> = labels.into_iter().map(|label| label.name).collect();
        if self.dry_run {
            // Nothing was renamed on the server, so apply the plan locally.
            for operation in &result.operations {
                if let SyncOperation::Rename { new_name, .. } = operation {
                    present.insert(new_name.clone());
                }
            }
        }

        for operation in self.plan_creations(&present) {
            self.execute_operation(repo, &operation).await?;
            result.add_operation(operation);
        }

        Ok(result)
    }

    /// Synchronize several repositories in order
    ///
    /// Without `keep_going` the first failure is returned and the remaining
    /// repositories are not touched. With it, failures are collected.
    ///
    /// # Errors
    /// Returns the first failure unless `keep_going` is set
    pub async fn synchronize_many(&self, repos: &[RepoRef], keep_going: bool) -> Result<BatchResult> {
        let mut batch = BatchResult::default();

        for repo in repos {
            tracing::info!(repo = %self.client.full_name(repo), "Synchronizing labels");
            match self.synchronize(repo).await {
                Ok(result) => batch.results.push(result),
                Err(e) if keep_going => {
                    tracing::warn!(repo = %self.client.full_name(repo), error = %e, "Label synchronization failed");
                    batch.failures.push((self.client.full_name(repo), e));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(batch)
    }

    /// Report labels that are not standard, repositories sorted by name
    ///
    /// # Errors
    /// Returns an error if any label listing fails
    pub async fn nonstandard_labels(&self, repos: &[RepoRef]) -> Result<Vec<NonStandardReport>> {
        let mut sorted: Vec<&RepoRef> = repos.iter().collect();
        sorted.sort_by(|a, b| a.name().cmp(b.name()));

        let mut reports = Vec::with_capacity(sorted.len());
        for repo in sorted {
            let labels = self
                .client
                .list_labels(repo)
                .await?
                .into_iter()
                .filter(|label| !self.standard.contains(&label.name))
                .collect();

            reports.push(NonStandardReport {
                repository: self.client.full_name(repo),
                labels,
            });
        }

        Ok(reports)
    }

    /// Legacy labels whose lower-cased name is a standard label
    fn plan_renames(&self, labels: &[GitHubLabel]) -> Vec<SyncOperation> {
        labels
            .iter()
            .filter(|label| !self.standard.contains(&label.name))
            .filter_map(|label| {
                let lowered = label.name.to_lowercase();
                self.standard
                    .color_of(&lowered)
                    .map(|color| SyncOperation::Rename {
                        current_name: label.name.clone(),
                        new_name: lowered,
                        color: color.to_string(),
                    })
            })
            .collect()
    }

    /// Standard labels absent from `present`, in standard-set order
    fn plan_creations(&self, present: &HashSet<String>) -> Vec<SyncOperation> {
        self.standard
            .iter()
            .filter(|label| !present.contains(&label.name))
            .map(|label| SyncOperation::Create {
                name: label.name.clone(),
                color: label.color.clone(),
            })
            .collect()
    }

    async fn execute_operation(&self, repo: &RepoRef, operation: &SyncOperation) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        match operation {
            SyncOperation::Rename {
                current_name,
                new_name,
                color,
            } => {
                self.client
                    .patch_label(repo, current_name, new_name, color)
                    .await?;
            }
            SyncOperation::Create { name, color } => {
                self.client.create_label(repo, name, color).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_standard_labels, StandardLabel};
    use crate::testing::{label_json, mock_client};
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn standard(pairs: &[(&str, &str)]) -> StandardLabels {
        StandardLabels::new(
            pairs
                .iter()
                .map(|(name, color)| StandardLabel::new(*name, *color).unwrap())
                .collect(),
        )
        .unwrap()
    }

    async fn mount_labels(server: &MockServer, repo: &str, labels: Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/repos/sot/{}/labels", repo)))
            .respond_with(ResponseTemplate::new(200).set_body_json(labels));
        match times {
            Some(n) => mock.up_to_n_times(n).mount(server).await,
            None => mock.mount(server).await,
        }
    }

    async fn forbid_writes(server: &MockServer) {
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(server)
            .await;
    }

    #[test]
    fn test_sync_result_operations() {
        let mut result = SyncResult::new("sot/kadi", false);
        assert!(!result.has_changes());

        result.add_operation(SyncOperation::Create {
            name: "bug".to_string(),
            color: "fc2929".to_string(),
        });
        result.add_operation(SyncOperation::Rename {
            current_name: "Question".to_string(),
            new_name: "question".to_string(),
            color: "cc317c".to_string(),
        });

        assert_eq!(result.created, 1);
        assert_eq!(result.renamed, 1);
        assert!(result.has_changes());
    }

    #[tokio::test]
    async fn test_conformant_repository_needs_no_writes() {
        let server = MockServer::start().await;
        let standard = default_standard_labels();
        let labels: Vec<Value> = standard
            .iter()
            .map(|label| label_json(&label.name, &label.color))
            .collect();

        Mock::given(method("GET"))
            .and(path("/repos/sot/kadi/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(labels)))
            .expect(2)
            .mount(&server)
            .await;
        forbid_writes(&server).await;

        let client = mock_client(&server);
        let result = LabelSyncer::new(&client, &standard)
            .synchronize(&RepoRef::from("kadi"))
            .await
            .unwrap();
        assert!(!result.has_changes());
    }

    #[tokio::test]
    async fn test_legacy_label_is_renamed_not_recreated() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929")]);

        mount_labels(&server, "kadi", json!([label_json("Bug", "ff0000")]), Some(1)).await;
        mount_labels(&server, "kadi", json!([label_json("bug", "fc2929")]), None).await;

        Mock::given(method("PATCH"))
            .and(path("/repos/sot/kadi/labels/Bug"))
            .and(body_json(json!({"name": "bug", "color": "fc2929"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(label_json("bug", "fc2929")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let result = LabelSyncer::new(&client, &standard)
            .synchronize(&RepoRef::from("kadi"))
            .await
            .unwrap();

        assert_eq!(result.renamed, 1);
        assert_eq!(result.created, 0);
        assert_eq!(
            result.operations,
            vec![SyncOperation::Rename {
                current_name: "Bug".to_string(),
                new_name: "bug".to_string(),
                color: "fc2929".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_labels_are_created_in_order() {
        let server = MockServer::start().await;
        let standard = default_standard_labels();

        mount_labels(&server, "kadi", json!([]), None).await;
        Mock::given(method("POST"))
            .and(path("/repos/sot/kadi/labels"))
            .respond_with(ResponseTemplate::new(201).set_body_json(label_json("x", "000000")))
            .expect(standard.len() as u64)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let result = LabelSyncer::new(&client, &standard)
            .synchronize(&RepoRef::from("kadi"))
            .await
            .unwrap();

        assert_eq!(result.created as usize, standard.len());
        let created: Vec<&str> = result
            .operations
            .iter()
            .map(|op| match op {
                SyncOperation::Create { name, .. } => name.as_str(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        let expected: Vec<&str> = standard.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(created, expected);
    }

    #[tokio::test]
    async fn test_nonstandard_labels_are_preserved_and_reported() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929")]);

        mount_labels(
            &server,
            "kadi",
            json!([label_json("custom-tag", "123456"), label_json("bug", "fc2929")]),
            None,
        )
        .await;
        forbid_writes(&server).await;

        let client = mock_client(&server);
        let syncer = LabelSyncer::new(&client, &standard);
        let result = syncer.synchronize(&RepoRef::from("kadi")).await.unwrap();
        assert!(!result.has_changes());

        let reports = syncer
            .nonstandard_labels(&[RepoRef::from("kadi")])
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].repository, "sot/kadi");
        let names: Vec<&str> = reports[0].labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["custom-tag"]);
    }

    #[tokio::test]
    async fn test_nonstandard_report_sorted_by_repository() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929")]);

        mount_labels(&server, "zeta", json!([label_json("z", "000000")]), None).await;
        mount_labels(&server, "alpha", json!([label_json("Bug", "ff0000")]), None).await;

        let client = mock_client(&server);
        let reports = LabelSyncer::new(&client, &standard)
            .nonstandard_labels(&[RepoRef::from("zeta"), RepoRef::from("alpha")])
            .await
            .unwrap();

        assert_eq!(reports[0].repository, "sot/alpha");
        assert_eq!(reports[0].labels[0].name, "Bug");
        assert_eq!(reports[1].repository, "sot/zeta");
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_writing() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929"), ("question", "cc317c")]);

        mount_labels(&server, "kadi", json!([label_json("Bug", "ff0000")]), None).await;
        forbid_writes(&server).await;

        let client = mock_client(&server);
        let result = LabelSyncer::new(&client, &standard)
            .dry_run(true)
            .synchronize(&RepoRef::from("kadi"))
            .await
            .unwrap();

        assert!(result.dry_run);
        assert_eq!(result.renamed, 1);
        assert_eq!(
            result.operations[1],
            SyncOperation::Create {
                name: "question".to_string(),
                color: "cc317c".to_string(),
            }
        );
        assert_eq!(result.created, 1);
    }

    #[tokio::test]
    async fn test_failed_write_halts_phase() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929"), ("question", "cc317c")]);

        Mock::given(method("GET"))
            .and(path("/repos/sot/kadi/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                label_json("Bug", "ff0000"),
                label_json("Question", "ff0000")
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let result = LabelSyncer::new(&client, &standard)
            .synchronize(&RepoRef::from("kadi"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_batch_halts_on_first_failure_by_default() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929")]);

        Mock::given(method("GET"))
            .and(path("/repos/sot/broken/labels"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/sot/kadi/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([label_json("bug", "fc2929")])))
            .expect(0)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let repos = [RepoRef::from("broken"), RepoRef::from("kadi")];
        let err = LabelSyncer::new(&client, &standard)
            .synchronize_many(&repos, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RepositoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_keep_going_collects_failures() {
        let server = MockServer::start().await;
        let standard = standard(&[("bug", "fc2929")]);

        Mock::given(method("GET"))
            .and(path("/repos/sot/broken/labels"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;
        mount_labels(&server, "kadi", json!([label_json("bug", "fc2929")]), None).await;
        forbid_writes(&server).await;

        let client = mock_client(&server);
        let repos = [RepoRef::from("broken"), RepoRef::from("kadi")];
        let batch = LabelSyncer::new(&client, &standard)
            .synchronize_many(&repos, true)
            .await
            .unwrap();

        assert!(!batch.is_success());
        assert_eq!(batch.failures[0].0, "sot/broken");
        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].repository, "sot/kadi");
    }
}
