#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

// --- 재export ---

pub use config::{GeneralConfig, GitLabConfig, GroupScanConfig, ScanConfig};
pub use error::{ConfigError, GroupScanError, ScanError};
