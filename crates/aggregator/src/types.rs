//! Remote entity views
//!
//! Read-only projections of the GitLab objects the aggregator touches.
//! Unknown fields are ignored so new server versions keep deserializing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A project as returned by the group listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Numeric project id
    pub id: u64,
    /// Short name
    #[serde(default)]
    pub name: String,
    /// Namespaced display name, e.g. `Platform / Billing / billing-api`
    #[serde(default)]
    pub name_with_namespace: String,
    /// Default branch; absent for empty repositories
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Archived flag
    #[serde(default)]
    pub archived: bool,
    /// Browser URL
    #[serde(default)]
    pub web_url: Option<String>,
}

impl Project {
    /// Builds a minimal project, mostly useful in tests and fixtures.
    pub fn new(id: u64, name_with_namespace: impl Into<String>) -> Self {
        let name_with_namespace = name_with_namespace.into();
        let name = name_with_namespace
            .rsplit(" / ")
            .next()
            .unwrap_or_default()
            .to_owned();
        Self {
            id,
            name,
            name_with_namespace,
            default_branch: Some("main".to_owned()),
            archived: false,
            web_url: None,
        }
    }
}

/// One page of a paginated project listing.
#[derive(Debug, Clone, Default)]
pub struct ProjectPage {
    /// Projects on this page
    pub projects: Vec<Project>,
    /// Page number reported by the server (1-based)
    pub current_page: u32,
    /// Total page count reported by the server
    pub total_pages: u32,
}

/// A CI job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job id
    pub id: u64,
    /// Job name as declared in the pipeline definition
    pub name: String,
    /// Status string reported by the CI system
    #[serde(default)]
    pub status: String,
    /// Ref the job ran on
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
}

/// CI job status.
///
/// The set of values is owned by the CI system (`success`, `failed`,
/// `running`, `manual`, ...). An empty status means no matching job was
/// found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobStatus(String);

impl JobStatus {
    /// Wraps a status string as reported by the CI system.
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no matching job was found.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
