#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain and transport errors (`AggregatorError`, `GitLabError`)
//! - [`config`]: Scanner tuning (`ScannerConfig`, builder)
//! - [`types`]: Remote entity views (`Project`, `Job`, `JobStatus`)
//! - [`gitlab`]: Remote API trait and REST client (`GitLabApi`, `HttpGitLabClient`)
//! - [`enumerator`]: Paged project listing (`ProjectEnumerator`)
//! - [`unpacker`]: Zip entry extraction (`ArtifactUnpacker`)
//! - [`report`]: Vulnerability report model (`Report`)
//! - [`retriever`]: Job status and report artifact (`JobArtifactRetriever`)
//! - [`ignore`]: Ignore-file fetch and parsing (`IgnoreListFetcher`)
//! - [`result`]: Result model and counter (`ProjectScanResult`, `AggregateResult`)
//! - [`scanner`]: Orchestrator (`GroupScanner`, `GroupScannerBuilder`)

pub mod config;
pub mod enumerator;
pub mod error;
pub mod gitlab;
pub mod ignore;
pub mod report;
pub mod result;
pub mod retriever;
pub mod scanner;
pub mod types;
pub mod unpacker;

// --- Public API Re-exports ---

// Orchestrator
pub use scanner::{GroupScanner, GroupScannerBuilder, ScanRequest};

// Configuration
pub use config::{ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::{AggregatorError, GitLabError};

// Remote API
pub use gitlab::{GitLabApi, HttpGitLabClient, parse_page_info};
pub use types::{Job, JobStatus, Project, ProjectPage};

// Components
pub use enumerator::ProjectEnumerator;
pub use ignore::{IgnoreListFetcher, parse_ignore_list};
pub use retriever::{JobArtifactRetriever, JobLookup, find_job_status};
pub use unpacker::ArtifactUnpacker;

// Results
pub use report::{DetectedVulnerability, PackageResult, Report, SeverityCounts};
pub use result::{AggregateResult, ProjectScanResult, count_vulnerabilities};
