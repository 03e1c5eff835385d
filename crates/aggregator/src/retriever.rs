//! Job/artifact retriever
//!
//! Looks up the status of a named CI job and downloads, unpacks and parses
//! its report artifact. The status and the report come from two separate
//! calls, so a failure on one side never hides the other.

use tracing::{debug, warn};

use crate::error::AggregatorError;
use crate::gitlab::GitLabApi;
use crate::report::Report;
use crate::types::{Job, JobStatus};
use crate::unpacker::ArtifactUnpacker;

/// Outcome of a job lookup for one project.
#[derive(Debug, Clone)]
pub struct JobLookup {
    /// Status of the first matching job, empty when none matched
    pub status: JobStatus,
    /// Set when the job listing itself failed
    pub status_error: Option<AggregatorError>,
    /// Parsed report, or the recoverable reason it is absent
    pub report: Result<Report, AggregatorError>,
}

/// Status of the first job named `job_name`, in listing order.
pub fn find_job_status(jobs: &[Job], job_name: &str) -> JobStatus {
    jobs.iter()
        .find(|job| job.name == job_name)
        .map(|job| JobStatus::new(job.status.clone()))
        .unwrap_or_default()
}

/// Fetches job status and report artifact for a project.
#[derive(Debug, Clone)]
pub struct JobArtifactRetriever {
    job_name: String,
    artifact_file: String,
    job_page_size: u32,
    unpacker: ArtifactUnpacker,
}

impl JobArtifactRetriever {
    pub fn new(
        job_name: impl Into<String>,
        artifact_file: impl Into<String>,
        job_page_size: u32,
        unpacker: ArtifactUnpacker,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            artifact_file: artifact_file.into(),
            job_page_size,
            unpacker,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn artifact_file(&self) -> &str {
        &self.artifact_file
    }

    /// Looks up the job status and the report on `git_ref`.
    ///
    /// Never fails as a whole: every error is recoverable and recorded in
    /// the returned [`JobLookup`].
    pub async fn fetch<C: GitLabApi>(&self, client: &C, project_id: u64, git_ref: &str) -> JobLookup {
        let (status, status_error) = match client
            .list_project_jobs(project_id, self.job_page_size)
            .await
        {
            Ok(jobs) => (find_job_status(&jobs, &self.job_name), None),
            Err(e) => {
                warn!(
                    project_id,
                    job = %self.job_name,
                    error = %e,
                    "failed to list jobs, continuing without status"
                );
                (JobStatus::default(), Some(AggregatorError::RemoteFetch(e)))
            }
        };

        let report = self.fetch_report(client, project_id, git_ref).await;

        JobLookup {
            status,
            status_error,
            report,
        }
    }

    async fn fetch_report<C: GitLabApi>(
        &self,
        client: &C,
        project_id: u64,
        git_ref: &str,
    ) -> Result<Report, AggregatorError> {
        let archive = client
            .download_job_artifacts(project_id, git_ref, &self.job_name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AggregatorError::NoJobArtifact {
                        job: self.job_name.clone(),
                    }
                } else {
                    AggregatorError::RemoteFetch(e)
                }
            })?;

        debug!(project_id, bytes = archive.len(), "downloaded artifact archive");

        let entry = self.unpacker.extract(&archive, &self.artifact_file)?;
        Report::from_slice(&entry).map_err(|e| AggregatorError::MalformedReport {
            entry: self.artifact_file.clone(),
            reason: e.to_string(),
        })
    }
}
