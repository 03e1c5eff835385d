//! Group scan orchestrator
//!
//! [`GroupScanner`] walks a group and builds the aggregate result:
//!
//! ```text
//! ScanRequest
//!     │
//!     ├── validate inputs, compile name filter      (fatal)
//!     ▼
//! ProjectEnumerator ── all pages, archived dropped  (fatal)
//!     │
//!     ├── name filter on "Namespace / Project"      (skip, debug log)
//!     ▼
//! per project, `concurrency` at a time, results kept in listing order
//!     ├── JobArtifactRetriever → ArtifactUnpacker → Report
//!     ├── IgnoreListFetcher
//!     └── ProjectScanResult (counter)               (recoverable errors)
//!     │
//!     ▼
//! inclusion rule → AggregateResult
//! ```
//!
//! Fatal errors abort before any per-project call is made. Recoverable
//! errors are logged with project context, counted by kind, and kept on the
//! project's result.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use futures::stream::{self, StreamExt};
use regex::Regex;
use tracing::{debug, info, warn};

use groupscan_core::metrics as m;

use crate::config::ScannerConfig;
use crate::enumerator::ProjectEnumerator;
use crate::error::AggregatorError;
use crate::gitlab::GitLabApi;
use crate::ignore::IgnoreListFetcher;
use crate::result::{AggregateResult, ProjectScanResult};
use crate::retriever::JobArtifactRetriever;
use crate::types::Project;
use crate::unpacker::ArtifactUnpacker;

/// What to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Group id or full path
    pub group_id: String,
    /// CI job producing the report artifact
    pub job_name: String,
    /// Report entry name inside the artifact archive
    pub artifact_file: String,
    /// Regex matched against the namespaced project name
    pub name_filter: Option<String>,
}

impl ScanRequest {
    pub fn new(
        group_id: impl Into<String>,
        job_name: impl Into<String>,
        artifact_file: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            job_name: job_name.into(),
            artifact_file: artifact_file.into(),
            name_filter: None,
        }
    }

    /// Sets the name filter; an empty pattern means no filter.
    pub fn with_name_filter(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.name_filter = (!pattern.is_empty()).then_some(pattern);
        self
    }

    pub fn from_core(core: &groupscan_core::config::ScanConfig) -> Self {
        Self::new(&core.group_id, &core.job_name, &core.artifact_file)
            .with_name_filter(core.name_filter.clone())
    }

    fn validate(&self) -> Result<(), AggregatorError> {
        if self.group_id.trim().is_empty() {
            return Err(AggregatorError::InvalidInput(
                "group id must not be empty".to_owned(),
            ));
        }
        if self.job_name.trim().is_empty() {
            return Err(AggregatorError::InvalidInput(
                "job name must not be empty".to_owned(),
            ));
        }
        if self.artifact_file.trim().is_empty() {
            return Err(AggregatorError::InvalidInput(
                "artifact file name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn compile_filter(pattern: Option<&str>) -> Result<Option<Regex>, AggregatorError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| AggregatorError::PatternCompile {
                pattern: p.to_owned(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Aggregates vulnerability reports across a GitLab group.
///
/// The client is captured once at construction and shared read-only by
/// every scan.
pub struct GroupScanner<C: GitLabApi> {
    client: Arc<C>,
    config: ScannerConfig,
    enumerator: ProjectEnumerator,
    ignore_fetcher: IgnoreListFetcher,
}

impl<C: GitLabApi> GroupScanner<C> {
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Scans every matching project of the group.
    ///
    /// # Errors
    ///
    /// Only fatal errors are returned: `InvalidInput`, `PatternCompile`,
    /// `RemoteList`. No partial aggregate is produced in that case.
    pub async fn scan_group(&self, request: &ScanRequest) -> Result<AggregateResult, AggregatorError> {
        let started_at = SystemTime::now();
        let timer = Instant::now();

        request.validate()?;
        let filter = compile_filter(request.name_filter.as_deref())?;

        let projects = self
            .enumerator
            .list_projects(self.client.as_ref(), &request.group_id)
            .await?;
        let projects_enumerated = projects.len();
        metrics::counter!(m::PROJECTS_ENUMERATED_TOTAL).increment(projects_enumerated as u64);

        let matched: Vec<Project> = projects
            .into_iter()
            .filter(|project| match &filter {
                Some(re) if !re.is_match(&project.name_with_namespace) => {
                    debug!(project = %project.name_with_namespace, "name filter did not match, skipping");
                    false
                }
                _ => true,
            })
            .collect();
        let projects_matched = matched.len();

        info!(
            group = %request.group_id,
            enumerated = projects_enumerated,
            matched = projects_matched,
            concurrency = self.config.concurrency,
            "scanning projects"
        );

        let retriever = JobArtifactRetriever::new(
            request.job_name.clone(),
            request.artifact_file.clone(),
            self.config.job_page_size,
            ArtifactUnpacker::new(self.config.max_artifact_size),
        );

        let scanned: Vec<ProjectScanResult> = stream::iter(matched.iter())
            .map(|project| self.scan_project(&retriever, project))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let results: Vec<ProjectScanResult> = scanned
            .into_iter()
            .filter(ProjectScanResult::is_included)
            .collect();

        metrics::counter!(m::PROJECTS_FLAGGED_TOTAL).increment(results.len() as u64);
        metrics::histogram!(m::SCAN_DURATION_SECONDS).record(timer.elapsed().as_secs_f64());

        info!(
            group = %request.group_id,
            flagged = results.len(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "group scan completed"
        );

        Ok(AggregateResult {
            scan_id: uuid::Uuid::new_v4().to_string(),
            group_id: request.group_id.clone(),
            projects_enumerated,
            projects_matched,
            results,
            started_at,
            finished_at: SystemTime::now(),
        })
    }

    async fn scan_project(&self, retriever: &JobArtifactRetriever, project: &Project) -> ProjectScanResult {
        metrics::counter!(m::PROJECTS_SCANNED_TOTAL).increment(1);
        info!(project = %project.name_with_namespace, "scanning project");

        let Some(git_ref) = project.default_branch.as_deref().filter(|b| !b.is_empty()) else {
            let err = AggregatorError::NoDefaultBranch;
            record_error(project, "report", &err);
            return ProjectScanResult::unavailable(project, err);
        };

        let client = self.client.as_ref();
        let lookup = retriever.fetch(client, project.id, git_ref).await;
        let ignore = self.ignore_fetcher.fetch(client, project.id, git_ref).await;
        let result = ProjectScanResult::new(project, lookup, ignore);

        if let Some(err) = result.status_error() {
            record_error(project, "status", err);
        }
        if let Some(err) = result.report_error() {
            record_error(project, "report", err);
        }
        if let Some(err) = result.ignore_error() {
            record_error(project, "ignore", err);
        }

        debug!(
            project = %project.name_with_namespace,
            status = %result.job_status(),
            vulnerabilities = result.vulnerability_count(),
            included = result.is_included(),
            "project scanned"
        );
        result
    }
}

fn record_error(project: &Project, stage: &str, err: &AggregatorError) {
    metrics::counter!(m::PROJECT_ERRORS_TOTAL, m::LABEL_KIND => err.kind()).increment(1);
    warn!(
        project = %project.name_with_namespace,
        project_id = project.id,
        stage,
        error = %err,
        "recoverable project error"
    );
}

/// Builder for [`GroupScanner`].
pub struct GroupScannerBuilder<C: GitLabApi> {
    client: Arc<C>,
    config: ScannerConfig,
}

impl<C: GitLabApi> GroupScannerBuilder<C> {
    pub fn new(client: C) -> Self {
        Self::with_shared_client(Arc::new(client))
    }

    /// Starts from a client that is already shared elsewhere.
    pub fn with_shared_client(client: Arc<C>) -> Self {
        Self {
            client,
            config: ScannerConfig::default(),
        }
    }

    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the config and builds the scanner.
    pub fn build(self) -> Result<GroupScanner<C>, AggregatorError> {
        self.config.validate()?;
        Ok(GroupScanner {
            enumerator: ProjectEnumerator::new(self.config.per_page),
            ignore_fetcher: IgnoreListFetcher::new(self.config.ignore_file.clone()),
            client: self.client,
            config: self.config,
        })
    }
}
