//! Aggregator error types
//!
//! [`GitLabError`] describes what went wrong on the wire. The components
//! translate it into an [`AggregatorError`], whose variants carry the
//! fatal/recoverable split the orchestrator acts on.
//!
//! # Fatal (abort the whole group scan)
//!
//! - `InvalidInput`, `PatternCompile`, `RemoteList`
//!
//! # Recoverable (logged, the project continues without that piece)
//!
//! - report side: `NoJobArtifact`, `MalformedReport`, `ArchiveOpen`,
//!   `EntryNotFound`, `ArtifactTooLarge`, `RemoteFetch`, `NoDefaultBranch`
//! - ignore side: `NoIgnoreFile`, `RemoteFetch`

use groupscan_core::error::{GroupScanError, ScanError};

/// Errors returned by a [`GitLabApi`](crate::gitlab::GitLabApi) implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GitLabError {
    /// HTTP 404
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("http {status} from {url}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL (without credentials)
        url: String,
        /// Response body excerpt
        message: String,
    },

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("response decode error: {0}")]
    Decode(String),

    /// URL could not be built from the configured host
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl GitLabError {
    /// Whether the remote answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Aggregator domain error
#[derive(Debug, Clone, thiserror::Error)]
pub enum AggregatorError {
    /// A required identifier is missing
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The project name filter is not a valid regex
    #[error("invalid name filter '{pattern}': {reason}")]
    PatternCompile {
        /// Pattern as configured
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Listing the group's projects failed
    #[error("failed to list projects of group {group}: {source}")]
    RemoteList {
        /// Group id or path
        group: String,
        /// Transport error
        source: GitLabError,
    },

    /// The job has no artifact for this ref
    #[error("no {job} job artifact")]
    NoJobArtifact {
        /// Job name
        job: String,
    },

    /// The report entry is not a valid vulnerability report
    #[error("malformed report in {entry}: {reason}")]
    MalformedReport {
        /// Archive entry name
        entry: String,
        /// Parser message
        reason: String,
    },

    /// The downloaded artifact is not a readable archive
    #[error("cannot open artifact archive: {0}")]
    ArchiveOpen(String),

    /// The archive has no entry with the configured name
    #[error("didn't find {entry} in artifact archive")]
    EntryNotFound {
        /// Requested entry name
        entry: String,
    },

    /// The report entry is larger than the configured limit
    #[error("artifact entry too large: {entry}: {size} bytes (max: {max})")]
    ArtifactTooLarge {
        /// Entry name
        entry: String,
        /// Declared uncompressed size
        size: u64,
        /// Configured limit
        max: usize,
    },

    /// Any other remote failure while fetching jobs, artifacts or files
    #[error("remote fetch failed: {0}")]
    RemoteFetch(GitLabError),

    /// The project has no ignore file on the ref
    #[error("no {path} file found")]
    NoIgnoreFile {
        /// Repository path of the ignore file
        path: String,
    },

    /// The project has no default branch (empty repository)
    #[error("project has no default branch")]
    NoDefaultBranch,
}

impl AggregatorError {
    /// Whether this error aborts the whole group scan.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::PatternCompile { .. } | Self::RemoteList { .. }
        )
    }

    /// Short, stable identifier used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::PatternCompile { .. } => "pattern_compile",
            Self::RemoteList { .. } => "remote_list",
            Self::NoJobArtifact { .. } => "no_job_artifact",
            Self::MalformedReport { .. } => "malformed_report",
            Self::ArchiveOpen(_) => "archive_open",
            Self::EntryNotFound { .. } => "entry_not_found",
            Self::ArtifactTooLarge { .. } => "artifact_too_large",
            Self::RemoteFetch(_) => "remote_fetch",
            Self::NoIgnoreFile { .. } => "no_ignore_file",
            Self::NoDefaultBranch => "no_default_branch",
        }
    }
}

impl From<AggregatorError> for GroupScanError {
    fn from(err: AggregatorError) -> Self {
        match err {
            AggregatorError::InvalidInput(msg) => {
                GroupScanError::Scan(ScanError::InvalidInput(msg))
            }
            err @ AggregatorError::PatternCompile { .. } => {
                GroupScanError::Scan(ScanError::Pattern(err.to_string()))
            }
            err @ AggregatorError::RemoteList { .. } => {
                GroupScanError::Scan(ScanError::RemoteList(err.to_string()))
            }
            other => GroupScanError::Scan(ScanError::Failed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds() {
        assert!(AggregatorError::InvalidInput("group".to_owned()).is_fatal());
        assert!(
            AggregatorError::PatternCompile {
                pattern: "(".to_owned(),
                reason: "unclosed group".to_owned(),
            }
            .is_fatal()
        );
        assert!(
            AggregatorError::RemoteList {
                group: "42".to_owned(),
                source: GitLabError::Transport("reset".to_owned()),
            }
            .is_fatal()
        );
    }

    #[test]
    fn recoverable_kinds() {
        let recoverable = [
            AggregatorError::NoJobArtifact {
                job: "trivy".to_owned(),
            },
            AggregatorError::MalformedReport {
                entry: "r.json".to_owned(),
                reason: "eof".to_owned(),
            },
            AggregatorError::ArchiveOpen("bad magic".to_owned()),
            AggregatorError::EntryNotFound {
                entry: "r.json".to_owned(),
            },
            AggregatorError::RemoteFetch(GitLabError::Status {
                status: 500,
                url: "https://gitlab.com/api/v4/projects/1/jobs".to_owned(),
                message: "oops".to_owned(),
            }),
            AggregatorError::NoIgnoreFile {
                path: ".trivyignore".to_owned(),
            },
            AggregatorError::NoDefaultBranch,
        ];
        for err in recoverable {
            assert!(!err.is_fatal(), "{err} should be recoverable");
        }
    }

    #[test]
    fn no_job_artifact_names_job() {
        let err = AggregatorError::NoJobArtifact {
            job: "container_scanning".to_owned(),
        };
        assert_eq!(err.to_string(), "no container_scanning job artifact");
    }

    #[test]
    fn entry_not_found_names_entry() {
        let err = AggregatorError::EntryNotFound {
            entry: "c.json".to_owned(),
        };
        assert!(err.to_string().contains("c.json"));
    }

    #[test]
    fn remote_list_keeps_source() {
        use std::error::Error as _;
        let err = AggregatorError::RemoteList {
            group: "platform".to_owned(),
            source: GitLabError::NotFound("/groups/platform/projects".to_owned()),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn converts_to_group_scan_error() {
        let err: GroupScanError = AggregatorError::InvalidInput("no group id set".to_owned()).into();
        assert!(matches!(
            err,
            GroupScanError::Scan(ScanError::InvalidInput(_))
        ));

        let err: GroupScanError = AggregatorError::RemoteList {
            group: "1".to_owned(),
            source: GitLabError::Transport("timeout".to_owned()),
        }
        .into();
        assert!(matches!(err, GroupScanError::Scan(ScanError::RemoteList(_))));
    }

    #[test]
    fn kinds_are_distinct() {
        let a = AggregatorError::NoIgnoreFile {
            path: ".trivyignore".to_owned(),
        };
        let b = AggregatorError::NoJobArtifact {
            job: "trivy".to_owned(),
        };
        assert_ne!(a.kind(), b.kind());
    }

    #[test]
    fn gitlab_not_found_detection() {
        assert!(GitLabError::NotFound("x".to_owned()).is_not_found());
        assert!(!GitLabError::Transport("x".to_owned()).is_not_found());
    }
}
