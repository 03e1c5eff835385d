//! CLI error types and exit code mapping

use groupscan_aggregator::AggregatorError;
use groupscan_core::error::GroupScanError;

/// CLI-specific error type.
///
/// `exit_code()` maps each variant to a process exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped error from groupscan-core.
    #[error("{0}")]
    Core(#[from] GroupScanError),

    /// The scan completed and flagged projects with vulnerabilities.
    #[error("scan found vulnerabilities: {0}")]
    Findings(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success, nothing flagged with findings   |
    /// | 1    | General / scan failure                   |
    /// | 2    | Configuration error                      |
    /// | 4    | Scan found projects with vulnerabilities |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(GroupScanError::Config(_)) => 2,
            Self::Findings(_) => 4,
            Self::Io(_) | Self::Core(GroupScanError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(GroupScanError::Scan(_)) => 1,
        }
    }
}

impl From<AggregatorError> for CliError {
    fn from(e: AggregatorError) -> Self {
        match e {
            AggregatorError::InvalidInput(_) | AggregatorError::PatternCompile { .. } => {
                Self::Config(e.to_string())
            }
            other => Self::Core(other.into()),
        }
    }
}
