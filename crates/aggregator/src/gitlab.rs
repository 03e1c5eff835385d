//! GitLab REST API abstraction for testability.
//!
//! The [`GitLabApi`] trait covers the four read-only calls the aggregator
//! makes. Production code uses [`HttpGitLabClient`]; unit tests use
//! `MockGitLabClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ GroupScanner │
//! └──────┬───────┘
//!        │
//!        ▼
//!  ┌───────────┐
//!  │ GitLabApi │ (trait)
//!  └───────────┘
//!     │      │
//!     ▼      ▼
//!  ┌──────┐ ┌──────┐
//!  │ Http │ │ Mock │
//!  └──┬───┘ └──────┘
//!     │
//!     ▼
//!  GitLab /api/v4
//! ```
//!
//! # Encoding
//!
//! Every caller-supplied value (group path, ref, file path) is pushed as a
//! single percent-encoded path segment, so `platform/billing` becomes
//! `platform%2Fbilling` as the API requires.
//!
//! # Examples
//!
//! ```ignore
//! use groupscan_aggregator::{GitLabApi, HttpGitLabClient};
//!
//! let client = HttpGitLabClient::new(&config.gitlab)?;
//! let page = client.list_group_projects("platform", 1, 100).await?;
//! # Ok::<(), groupscan_aggregator::GitLabError>(())
//! ```

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use groupscan_core::config::GitLabConfig;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::GitLabError;
use crate::types::{Job, Project, ProjectPage};

/// Longest response-body excerpt kept in [`GitLabError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Read-only GitLab operations used by the aggregator.
///
/// # Implementations
///
/// - [`HttpGitLabClient`]: REST client over `reqwest`
/// - `MockGitLabClient`: canned responses with call counters (tests only)
pub trait GitLabApi: Send + Sync + 'static {
    /// Lists one page of non-archived projects in the group, subgroups included.
    fn list_group_projects(
        &self,
        group_id: &str,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<ProjectPage, GitLabError>> + Send;

    /// Lists the project's jobs, retried runs excluded, newest first.
    fn list_project_jobs(
        &self,
        project_id: u64,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<Job>, GitLabError>> + Send;

    /// Downloads the artifact archive of the latest successful `job_name`
    /// run on `git_ref`.
    ///
    /// # Errors
    ///
    /// [`GitLabError::NotFound`] when the job or its artifact does not exist.
    fn download_job_artifacts(
        &self,
        project_id: u64,
        git_ref: &str,
        job_name: &str,
    ) -> impl Future<Output = Result<Bytes, GitLabError>> + Send;

    /// Fetches a raw repository file at `git_ref`.
    ///
    /// # Errors
    ///
    /// [`GitLabError::NotFound`] when the file does not exist on that ref.
    fn get_raw_file(
        &self,
        project_id: u64,
        file_path: &str,
        git_ref: &str,
    ) -> impl Future<Output = Result<Bytes, GitLabError>> + Send;
}

/// Reads the pagination headers of a listing response.
///
/// Returns `(current_page, total_pages)`. GitLab omits `X-Total-Pages` on
/// very large collections; `X-Next-Page` is used then, and a response
/// without any pagination header is treated as the last page.
pub fn parse_page_info(headers: &HeaderMap, requested_page: u32) -> (u32, u32) {
    let header_u32 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok())
    };

    let current = header_u32("x-page").unwrap_or(requested_page);
    let total = match header_u32("x-total-pages") {
        Some(total) => total,
        None => match header_u32("x-next-page") {
            Some(next) if next > current => next,
            _ => current,
        },
    };
    (current, total)
}

/// GitLab REST client.
///
/// Holds one `reqwest::Client` (connection pool) and the resolved
/// `/api/v4` base URL. Authenticates with `Authorization: Bearer <token>`
/// when a token is configured.
pub struct HttpGitLabClient {
    http: reqwest::Client,
    api_base: Url,
    token: String,
}

impl HttpGitLabClient {
    /// Builds a client from the `[gitlab]` config section.
    ///
    /// # Errors
    ///
    /// - [`GitLabError::InvalidUrl`] if `host` is not an absolute http(s) URL
    /// - [`GitLabError::Transport`] if the HTTP client cannot be built
    pub fn new(config: &GitLabConfig) -> Result<Self, GitLabError> {
        let mut api_base = Url::parse(&config.host)
            .map_err(|e| GitLabError::InvalidUrl(format!("{}: {e}", config.host)))?;
        api_base
            .path_segments_mut()
            .map_err(|()| GitLabError::InvalidUrl(format!("{}: cannot be a base", config.host)))?
            .pop_if_empty()
            .extend(["api", "v4"]);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GitLabError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            api_base,
            token: config.token.clone(),
        })
    }

    /// Resolved API base, e.g. `https://gitlab.com/api/v4`.
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GitLabError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| GitLabError::InvalidUrl(self.api_base.to_string()))?
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, GitLabError> {
        debug!(url = %url, "GET");

        let mut request = self.http.get(url.clone());
        if !self.token.is_empty() {
            // reqwest drops Authorization on cross-host redirects (artifact
            // downloads may redirect to object storage)
            request = request.bearer_auth(&self.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GitLabError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GitLabError::NotFound(url.path().to_owned()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitLabError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        Ok(response)
    }

    async fn get_bytes(&self, url: Url) -> Result<(HeaderMap, Bytes), GitLabError> {
        let response = self.get(url).await?;
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| GitLabError::Transport(e.to_string()))?;
        Ok((headers, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<(HeaderMap, T), GitLabError> {
        let (headers, body) = self.get_bytes(url).await?;
        let value = serde_json::from_slice(&body).map_err(|e| GitLabError::Decode(e.to_string()))?;
        Ok((headers, value))
    }
}

impl GitLabApi for HttpGitLabClient {
    async fn list_group_projects(
        &self,
        group_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ProjectPage, GitLabError> {
        let mut url = self.endpoint(&["groups", group_id, "projects"])?;
        url.query_pairs_mut()
            .append_pair("archived", "false")
            .append_pair("include_subgroups", "true")
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        let (headers, projects): (_, Vec<Project>) = self.get_json(url).await?;
        let (current_page, total_pages) = parse_page_info(&headers, page);
        Ok(ProjectPage {
            projects,
            current_page,
            total_pages,
        })
    }

    async fn list_project_jobs(&self, project_id: u64, per_page: u32) -> Result<Vec<Job>, GitLabError> {
        let mut url = self.endpoint(&["projects", &project_id.to_string(), "jobs"])?;
        url.query_pairs_mut()
            .append_pair("include_retried", "false")
            .append_pair("per_page", &per_page.to_string());

        let (_, jobs) = self.get_json(url).await?;
        Ok(jobs)
    }

    async fn download_job_artifacts(
        &self,
        project_id: u64,
        git_ref: &str,
        job_name: &str,
    ) -> Result<Bytes, GitLabError> {
        let mut url = self.endpoint(&[
            "projects",
            &project_id.to_string(),
            "jobs",
            "artifacts",
            git_ref,
            "download",
        ])?;
        url.query_pairs_mut().append_pair("job", job_name);

        let (_, body) = self.get_bytes(url).await?;
        Ok(body)
    }

    async fn get_raw_file(
        &self,
        project_id: u64,
        file_path: &str,
        git_ref: &str,
    ) -> Result<Bytes, GitLabError> {
        let mut url = self.endpoint(&[
            "projects",
            &project_id.to_string(),
            "repository",
            "files",
            file_path,
            "raw",
        ])?;
        url.query_pairs_mut().append_pair("ref", git_ref);

        let (_, body) = self.get_bytes(url).await?;
        Ok(body)
    }
}

/// Canned GitLab responses for unit tests.
///
/// Projects are served from `pages` (1-based page numbers); missing
/// artifacts and raw files answer [`GitLabError::NotFound`]. Every call is
/// counted so tests can assert which remote calls were (not) made.
#[cfg(test)]
#[derive(Default)]
pub struct MockGitLabClient {
    pub pages: Vec<Vec<Project>>,
    pub list_error: Option<GitLabError>,
    pub fail_on_page: Option<u32>,
    pub jobs: std::collections::HashMap<u64, Vec<Job>>,
    pub jobs_error: Option<GitLabError>,
    pub artifacts: std::collections::HashMap<u64, Result<Bytes, GitLabError>>,
    pub raw_files: std::collections::HashMap<u64, Result<Bytes, GitLabError>>,
    pub list_calls: std::sync::atomic::AtomicUsize,
    pub job_calls: std::sync::atomic::AtomicUsize,
    pub artifact_calls: std::sync::atomic::AtomicUsize,
    pub raw_file_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockGitLabClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves the given projects as consecutive pages.
    pub fn with_pages(mut self, pages: Vec<Vec<Project>>) -> Self {
        self.pages = pages;
        self
    }

    /// Fails every project listing call.
    pub fn with_list_error(mut self, err: GitLabError) -> Self {
        self.list_error = Some(err);
        self
    }

    /// Fails the listing when the given page is requested.
    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub fn with_jobs(mut self, project_id: u64, jobs: Vec<Job>) -> Self {
        self.jobs.insert(project_id, jobs);
        self
    }

    pub fn with_jobs_error(mut self, err: GitLabError) -> Self {
        self.jobs_error = Some(err);
        self
    }

    pub fn with_artifact(mut self, project_id: u64, archive: Result<Bytes, GitLabError>) -> Self {
        self.artifacts.insert(project_id, archive);
        self
    }

    pub fn with_raw_file(mut self, project_id: u64, content: Result<Bytes, GitLabError>) -> Self {
        self.raw_files.insert(project_id, content);
        self
    }

    /// Number of per-project calls (jobs, artifacts, raw files).
    pub fn project_calls(&self) -> usize {
        use std::sync::atomic::Ordering;
        self.job_calls.load(Ordering::SeqCst)
            + self.artifact_calls.load(Ordering::SeqCst)
            + self.raw_file_calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl GitLabApi for MockGitLabClient {
    async fn list_group_projects(
        &self,
        _group_id: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<ProjectPage, GitLabError> {
        self.list_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        if self.fail_on_page == Some(page) {
            return Err(GitLabError::Status {
                status: 502,
                url: format!("mock://groups/projects?page={page}"),
                message: "bad gateway".to_owned(),
            });
        }
        let total_pages = u32::try_from(self.pages.len()).unwrap_or(u32::MAX).max(1);
        let projects = usize::try_from(page)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|idx| self.pages.get(idx))
            .cloned()
            .unwrap_or_default();
        Ok(ProjectPage {
            projects,
            current_page: page,
            total_pages,
        })
    }

    async fn list_project_jobs(&self, project_id: u64, _per_page: u32) -> Result<Vec<Job>, GitLabError> {
        self.job_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(err) = &self.jobs_error {
            return Err(err.clone());
        }
        Ok(self.jobs.get(&project_id).cloned().unwrap_or_default())
    }

    async fn download_job_artifacts(
        &self,
        project_id: u64,
        _git_ref: &str,
        _job_name: &str,
    ) -> Result<Bytes, GitLabError> {
        self.artifact_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.artifacts
            .get(&project_id)
            .cloned()
            .unwrap_or_else(|| Err(GitLabError::NotFound(format!("projects/{project_id}/jobs/artifacts"))))
    }

    async fn get_raw_file(
        &self,
        project_id: u64,
        file_path: &str,
        _git_ref: &str,
    ) -> Result<Bytes, GitLabError> {
        self.raw_file_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.raw_files
            .get(&project_id)
            .cloned()
            .unwrap_or_else(|| Err(GitLabError::NotFound(format!("projects/{project_id}/repository/files/{file_path}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn gitlab_config(host: &str) -> GitLabConfig {
        GitLabConfig {
            host: host.to_owned(),
            ..GitLabConfig::default()
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn page_info_from_total_pages() {
        let h = headers(&[("x-page", "2"), ("x-total-pages", "3")]);
        assert_eq!(parse_page_info(&h, 2), (2, 3));
    }

    #[test]
    fn page_info_falls_back_to_next_page() {
        let h = headers(&[("x-page", "4"), ("x-next-page", "5")]);
        assert_eq!(parse_page_info(&h, 4), (4, 5));

        let h = headers(&[("x-page", "5"), ("x-next-page", "")]);
        assert_eq!(parse_page_info(&h, 5), (5, 5));
    }

    #[test]
    fn page_info_without_headers_is_last_page() {
        assert_eq!(parse_page_info(&HeaderMap::new(), 1), (1, 1));
    }

    #[test]
    fn api_base_appends_v4() {
        let client = HttpGitLabClient::new(&gitlab_config("https://gitlab.com")).unwrap();
        assert_eq!(client.api_base().as_str(), "https://gitlab.com/api/v4");

        let client = HttpGitLabClient::new(&gitlab_config("https://example.com/gitlab/")).unwrap();
        assert_eq!(client.api_base().as_str(), "https://example.com/gitlab/api/v4");
    }

    #[test]
    fn invalid_host_is_rejected() {
        let err = HttpGitLabClient::new(&gitlab_config("not a url"))
            .err()
            .unwrap();
        assert!(matches!(err, GitLabError::InvalidUrl(_)));
    }

    #[test]
    fn endpoint_encodes_nested_values_as_one_segment() {
        let client = HttpGitLabClient::new(&gitlab_config("https://gitlab.com")).unwrap();
        let url = client
            .endpoint(&["groups", "platform/billing", "projects"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/groups/platform%2Fbilling/projects"
        );

        let url = client
            .endpoint(&["projects", "7", "repository", "files", "ci/.trivyignore", "raw"])
            .unwrap();
        assert!(url.path().ends_with("/files/ci%2F.trivyignore/raw"));
    }

    #[tokio::test]
    async fn mock_serves_pages_and_counts_calls() {
        let mock = MockGitLabClient::new().with_pages(vec![
            vec![Project::new(1, "g / a")],
            vec![Project::new(2, "g / b")],
        ]);
        let page = mock.list_group_projects("g", 2, 100).await.unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.projects[0].id, 2);
        assert_eq!(
            mock.list_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn mock_missing_artifact_is_not_found() {
        let mock = MockGitLabClient::new();
        let err = mock.download_job_artifacts(1, "main", "trivy").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.project_calls(), 1);
    }

    #[test]
    fn gitlab_api_impls_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<HttpGitLabClient>();
        assert_send_sync::<MockGitLabClient>();
    }
}
