//! Result model and vulnerability counter
//!
//! [`ProjectScanResult`] is built once per scanned project and is not
//! mutated afterwards; the vulnerability count is computed in the
//! constructor. [`AggregateResult`] collects the results that pass
//! [`ProjectScanResult::is_included`].

use std::time::SystemTime;

use serde::{Serialize, Serializer};

use crate::error::AggregatorError;
use crate::report::Report;
use crate::retriever::JobLookup;
use crate::types::{JobStatus, Project};

/// Total number of vulnerability records across every package result.
///
/// An absent or empty report yields 0.
pub fn count_vulnerabilities(report: Option<&Report>) -> usize {
    report.map_or(0, |r| {
        r.results().iter().map(|p| p.vulnerabilities.len()).sum()
    })
}

fn error_as_string<S: Serializer>(
    err: &Option<AggregatorError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Outcome of scanning one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectScanResult {
    project_id: u64,
    project_name: String,
    full_name: String,
    web_url: Option<String>,
    job_status: JobStatus,
    vulnerability_count: usize,
    ignore_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<Report>,
    #[serde(serialize_with = "error_as_string")]
    status_error: Option<AggregatorError>,
    #[serde(serialize_with = "error_as_string")]
    report_error: Option<AggregatorError>,
    #[serde(serialize_with = "error_as_string")]
    ignore_error: Option<AggregatorError>,
}

impl ProjectScanResult {
    /// Assembles the result from the job lookup and the ignore-list fetch,
    /// then runs the counter.
    pub fn new(
        project: &Project,
        lookup: JobLookup,
        ignore: Result<Vec<String>, AggregatorError>,
    ) -> Self {
        let (report, report_error) = match lookup.report {
            Ok(report) => (Some(report), None),
            Err(e) => (None, Some(e)),
        };
        let (ignore_list, ignore_error) = match ignore {
            Ok(list) => (Some(list), None),
            Err(e) => (None, Some(e)),
        };
        let vulnerability_count = count_vulnerabilities(report.as_ref());

        Self {
            project_id: project.id,
            project_name: project.name.clone(),
            full_name: project.name_with_namespace.clone(),
            web_url: project.web_url.clone(),
            job_status: lookup.status,
            vulnerability_count,
            ignore_list,
            report,
            status_error: lookup.status_error,
            report_error,
            ignore_error,
        }
    }

    /// Result for a project that could not be looked up at all.
    pub fn unavailable(project: &Project, err: AggregatorError) -> Self {
        Self::new(
            project,
            JobLookup {
                status: JobStatus::default(),
                status_error: None,
                report: Err(err.clone()),
            },
            Err(err),
        )
    }

    /// Inclusion rule: a non-empty ignore list, or a report with at least
    /// one finding.
    pub fn is_included(&self) -> bool {
        let has_ignores = self.ignore_list.as_ref().is_some_and(|l| !l.is_empty());
        let has_findings = self.report.is_some() && self.vulnerability_count > 0;
        has_ignores || has_findings
    }

    pub fn project_id(&self) -> u64 {
        self.project_id
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Namespaced display name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn web_url(&self) -> Option<&str> {
        self.web_url.as_deref()
    }

    pub fn job_status(&self) -> &JobStatus {
        &self.job_status
    }

    pub fn vulnerability_count(&self) -> usize {
        self.vulnerability_count
    }

    pub fn ignore_list(&self) -> Option<&[String]> {
        self.ignore_list.as_deref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn status_error(&self) -> Option<&AggregatorError> {
        self.status_error.as_ref()
    }

    pub fn report_error(&self) -> Option<&AggregatorError> {
        self.report_error.as_ref()
    }

    pub fn ignore_error(&self) -> Option<&AggregatorError> {
        self.ignore_error.as_ref()
    }
}

/// Output of a whole group scan.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    /// Unique id of this scan run
    pub scan_id: String,
    /// Scanned group
    pub group_id: String,
    /// Projects returned by the listing (archived ones excluded)
    pub projects_enumerated: usize,
    /// Projects that passed the name filter
    pub projects_matched: usize,
    /// Included project results, in enumeration order
    pub results: Vec<ProjectScanResult>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Sum of vulnerability counts over the included projects.
    pub fn total_vulnerabilities(&self) -> usize {
        self.results.iter().map(|r| r.vulnerability_count()).sum()
    }

    /// Whether any included project has at least one finding.
    pub fn has_findings(&self) -> bool {
        self.results.iter().any(|r| r.vulnerability_count() > 0)
    }
}
