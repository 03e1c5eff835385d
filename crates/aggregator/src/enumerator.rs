//! Project enumerator
//!
//! Walks every page of a group's project listing. Archived projects are
//! requested out server-side and dropped again client-side in case the
//! server ignores the filter.

use tracing::debug;

use crate::error::AggregatorError;
use crate::gitlab::GitLabApi;
use crate::types::Project;

/// Default listing page size (GitLab's maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Pages through a group's projects.
#[derive(Debug, Clone)]
pub struct ProjectEnumerator {
    per_page: u32,
}

impl Default for ProjectEnumerator {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl ProjectEnumerator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Lists all non-archived projects of `group_id`, subgroups included,
    /// in listing order.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `group_id` is empty
    /// - `RemoteList` when any page request fails; no retry is attempted
    pub async fn list_projects<C: GitLabApi>(
        &self,
        client: &C,
        group_id: &str,
    ) -> Result<Vec<Project>, AggregatorError> {
        if group_id.trim().is_empty() {
            return Err(AggregatorError::InvalidInput(
                "group id must not be empty".to_owned(),
            ));
        }

        let mut projects = Vec::new();
        let mut page = 1u32;
        loop {
            let listing = client
                .list_group_projects(group_id, page, self.per_page)
                .await
                .map_err(|source| AggregatorError::RemoteList {
                    group: group_id.to_owned(),
                    source,
                })?;

            debug!(
                group = group_id,
                page = listing.current_page,
                total_pages = listing.total_pages,
                count = listing.projects.len(),
                "fetched project page"
            );

            projects.extend(listing.projects.into_iter().filter(|p| !p.archived));

            if listing.current_page >= listing.total_pages {
                break;
            }
            // Follow the server's page counter, never re-request the same page.
            page = listing.current_page.max(page) + 1;
        }

        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::error::GitLabError;
    use crate::gitlab::MockGitLabClient;

    fn ids(projects: &[Project]) -> Vec<u64> {
        projects.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn empty_group_id_is_invalid_input() {
        let client = MockGitLabClient::new();
        let err = ProjectEnumerator::default()
            .list_projects(&client, "")
            .await
            .unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidInput(_)));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn three_pages_are_requested_and_concatenated() {
        let client = MockGitLabClient::new().with_pages(vec![
            vec![Project::new(1, "g / a"), Project::new(2, "g / b")],
            vec![Project::new(3, "g / c")],
            vec![Project::new(4, "g / d")],
        ]);
        let projects = ProjectEnumerator::new(2)
            .list_projects(&client, "g")
            .await
            .unwrap();
        assert_eq!(ids(&projects), vec![1, 2, 3, 4]);
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_group_makes_a_single_request() {
        let client = MockGitLabClient::new();
        let projects = ProjectEnumerator::default()
            .list_projects(&client, "g")
            .await
            .unwrap();
        assert!(projects.is_empty());
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn archived_projects_are_dropped() {
        let mut archived = Project::new(2, "g / old");
        archived.archived = true;
        let client = MockGitLabClient::new().with_pages(vec![vec![Project::new(1, "g / a"), archived]]);
        let projects = ProjectEnumerator::default()
            .list_projects(&client, "g")
            .await
            .unwrap();
        assert_eq!(ids(&projects), vec![1]);
    }

    #[tokio::test]
    async fn page_failure_is_remote_list() {
        let client = MockGitLabClient::new()
            .with_pages(vec![vec![Project::new(1, "g / a")], vec![Project::new(2, "g / b")]])
            .failing_on_page(2);
        let err = ProjectEnumerator::default()
            .list_projects(&client, "g")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, AggregatorError::RemoteList { ref group, .. } if group == "g"));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn listing_error_is_not_retried() {
        let client = MockGitLabClient::new().with_list_error(GitLabError::Transport("reset".to_owned()));
        let err = ProjectEnumerator::default()
            .list_projects(&client, "g")
            .await
            .unwrap_err();
        assert!(matches!(err, AggregatorError::RemoteList { .. }));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);
    }
}
