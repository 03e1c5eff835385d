//! Ignore-list fetcher
//!
//! Reads the per-project ignore file (one token per line, `#` starts a
//! comment line). Only whole comment lines are dropped; blank lines and
//! trailing text are kept verbatim, in file order.

use crate::error::AggregatorError;
use crate::gitlab::GitLabApi;

/// Comment marker at the start of an ignore-file line.
const COMMENT_MARKER: char = '#';

/// Splits ignore-file content into tokens.
///
/// `"# comment\nfoo\n\nbar\n"` yields `["foo", "", "bar"]`.
pub fn parse_ignore_list(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .map(str::to_owned)
        .collect()
}

/// Fetches a project's ignore list from the repository.
#[derive(Debug, Clone)]
pub struct IgnoreListFetcher {
    file_path: String,
}

impl IgnoreListFetcher {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Fetches and parses the ignore file on `git_ref`.
    ///
    /// A 404 becomes `NoIgnoreFile`; anything else is `RemoteFetch`. Both
    /// are recoverable. Invalid UTF-8 is replaced rather than rejected.
    pub async fn fetch<C: GitLabApi>(
        &self,
        client: &C,
        project_id: u64,
        git_ref: &str,
    ) -> Result<Vec<String>, AggregatorError> {
        let content = client
            .get_raw_file(project_id, &self.file_path, git_ref)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AggregatorError::NoIgnoreFile {
                        path: self.file_path.clone(),
                    }
                } else {
                    AggregatorError::RemoteFetch(e)
                }
            })?;

        Ok(parse_ignore_list(&String::from_utf8_lossy(&content)))
    }
}
