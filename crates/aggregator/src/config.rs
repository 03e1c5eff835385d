//! Aggregator tuning
//!
//! [`ScannerConfig`] carries the knobs of the `[scan]` section that shape
//! how a group is walked (page sizes, artifact limit, fan-out). What to
//! scan (group, job, entry, filter) travels separately in a
//! [`ScanRequest`](crate::scanner::ScanRequest).
//!
//! ```
//! use groupscan_aggregator::ScannerConfigBuilder;
//!
//! let config = ScannerConfigBuilder::new()
//!     .concurrency(4)
//!     .ignore_file(".trivyignore")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.concurrency, 4);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AggregatorError;
use crate::unpacker::DEFAULT_MAX_ENTRY_SIZE;

const MAX_PAGE_SIZE: u32 = 100;
const MAX_CONCURRENCY: usize = 32;

/// Aggregator settings derived from the core `[scan]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Repository path of the per-project ignore file
    pub ignore_file: String,
    /// Project listing page size
    pub per_page: u32,
    /// Job listing page size (only the first page is read)
    pub job_page_size: u32,
    /// Largest accepted report entry, in bytes
    pub max_artifact_size: usize,
    /// Projects scanned at the same time; 1 is fully sequential
    pub concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ignore_file: ".trivyignore".to_owned(),
            per_page: MAX_PAGE_SIZE,
            job_page_size: MAX_PAGE_SIZE,
            max_artifact_size: DEFAULT_MAX_ENTRY_SIZE,
            concurrency: 1,
        }
    }
}

impl ScannerConfig {
    pub fn from_core(core: &groupscan_core::config::ScanConfig) -> Self {
        Self {
            ignore_file: core.ignore_file.clone(),
            per_page: core.per_page,
            job_page_size: core.job_page_size,
            max_artifact_size: core.max_artifact_size,
            concurrency: core.concurrency,
        }
    }

    /// # Validation rules
    ///
    /// - `ignore_file`: not empty
    /// - `per_page`, `job_page_size`: 1-100
    /// - `max_artifact_size`: greater than 0
    /// - `concurrency`: 1-32
    pub fn validate(&self) -> Result<(), AggregatorError> {
        let invalid = |field: &str, reason: String| {
            Err(AggregatorError::InvalidInput(format!("{field}: {reason}")))
        };

        if self.ignore_file.trim().is_empty() {
            return invalid("ignore_file", "must not be empty".to_owned());
        }
        if self.per_page == 0 || self.per_page > MAX_PAGE_SIZE {
            return invalid("per_page", format!("must be 1-{MAX_PAGE_SIZE}"));
        }
        if self.job_page_size == 0 || self.job_page_size > MAX_PAGE_SIZE {
            return invalid("job_page_size", format!("must be 1-{MAX_PAGE_SIZE}"));
        }
        if self.max_artifact_size == 0 {
            return invalid("max_artifact_size", "must be greater than 0".to_owned());
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return invalid("concurrency", format!("must be 1-{MAX_CONCURRENCY}"));
        }
        Ok(())
    }
}

/// Builder for [`ScannerConfig`]; validates on [`build`](Self::build).
#[derive(Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_file(mut self, path: impl Into<String>) -> Self {
        self.config.ignore_file = path.into();
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.config.per_page = per_page;
        self
    }

    pub fn job_page_size(mut self, size: u32) -> Self {
        self.config.job_page_size = size;
        self
    }

    pub fn max_artifact_size(mut self, bytes: usize) -> Self {
        self.config.max_artifact_size = bytes;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn build(self) -> Result<ScannerConfig, AggregatorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_and_sequential() {
        let config = ScannerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn from_core_copies_scan_section() {
        let core = groupscan_core::config::ScanConfig {
            ignore_file: "security/.trivyignore".to_owned(),
            per_page: 50,
            concurrency: 8,
            ..Default::default()
        };
        let config = ScannerConfig::from_core(&core);
        assert_eq!(config.ignore_file, "security/.trivyignore");
        assert_eq!(config.per_page, 50);
        assert_eq!(config.concurrency, 8);
    }

    #[test]
    fn builder_rejects_out_of_range_values() {
        assert!(ScannerConfigBuilder::new().concurrency(0).build().is_err());
        assert!(ScannerConfigBuilder::new().concurrency(33).build().is_err());
        assert!(ScannerConfigBuilder::new().per_page(101).build().is_err());
        assert!(ScannerConfigBuilder::new().job_page_size(0).build().is_err());
        assert!(ScannerConfigBuilder::new().max_artifact_size(0).build().is_err());
        assert!(ScannerConfigBuilder::new().ignore_file(" ").build().is_err());
    }

    #[test]
    fn validation_error_names_field() {
        let err = ScannerConfigBuilder::new().concurrency(0).build().unwrap_err();
        assert!(err.to_string().contains("concurrency"));
        assert!(err.is_fatal());
    }
}
