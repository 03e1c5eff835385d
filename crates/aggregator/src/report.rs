//! Vulnerability report model
//!
//! The aggregator only needs the per-package vulnerability lists, so the
//! model is intentionally shallow. Two document shapes are accepted:
//!
//! - a bare array of results: `[ { "Target": ..., "Vulnerabilities": [...] } ]`
//! - a full report object: `{ "SchemaVersion": 2, "Results": [ ... ] }`
//!
//! Objects need a `Results` or `SchemaVersion` key. A `null` or missing
//! `Vulnerabilities` list counts as empty.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Parsed vulnerability report: an ordered list of per-package results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    results: Vec<PackageResult>,
}

/// Findings for one scanned target (image layer, lockfile, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageResult {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, rename = "Type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub vulnerabilities: Vec<DetectedVulnerability>,
}

/// A single finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedVulnerability {
    #[serde(default, rename = "VulnerabilityID")]
    pub vulnerability_id: String,
    #[serde(default)]
    pub pkg_name: String,
    #[serde(default)]
    pub installed_version: String,
    #[serde(default)]
    pub fixed_version: Option<String>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Finding counts grouped by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.unknown
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Report {
    pub fn new(results: Vec<PackageResult>) -> Self {
        Self { results }
    }

    /// Parses a report document in either accepted shape.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        match value {
            serde_json::Value::Array(_) => serde_json::from_value(value),
            serde_json::Value::Object(mut map) => match map.remove("Results") {
                Some(serde_json::Value::Null) => Ok(Self::default()),
                Some(results) => serde_json::from_value(results),
                // a clean scan omits Results but still carries the schema version
                None if map.contains_key("SchemaVersion") => Ok(Self::default()),
                None => Err(serde_json::Error::custom(
                    "object has neither Results nor SchemaVersion",
                )),
            },
            other => Err(serde_json::Error::custom(format!(
                "expected a result array or a report object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn results(&self) -> &[PackageResult] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Counts findings by severity across all results.
    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for vuln in self.results.iter().flat_map(|r| r.vulnerabilities.iter()) {
            match vuln.severity.to_ascii_uppercase().as_str() {
                "CRITICAL" => counts.critical += 1,
                "HIGH" => counts.high += 1,
                "MEDIUM" => counts.medium += 1,
                "LOW" => counts.low += 1,
                _ => counts.unknown += 1,
            }
        }
        counts
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_OBJECT: &str = r#"{
        "SchemaVersion": 2,
        "ArtifactName": "registry.example.com/billing-api:latest",
        "Results": [
            {
                "Target": "registry.example.com/billing-api (alpine 3.19)",
                "Class": "os-pkgs",
                "Type": "alpine",
                "Vulnerabilities": [
                    {"VulnerabilityID": "CVE-2024-0001", "PkgName": "openssl", "InstalledVersion": "3.1.0", "FixedVersion": "3.1.5", "Severity": "CRITICAL"},
                    {"VulnerabilityID": "CVE-2024-0002", "PkgName": "zlib", "InstalledVersion": "1.2.13", "Severity": "LOW"}
                ]
            },
            {
                "Target": "app/Cargo.lock",
                "Class": "lang-pkgs",
                "Type": "cargo",
                "Vulnerabilities": null
            }
        ]
    }"#;

    #[test]
    fn parses_report_object() {
        let report = Report::from_slice(REPORT_OBJECT.as_bytes()).unwrap();
        assert_eq!(report.results().len(), 2);
        assert_eq!(report.results()[0].vulnerabilities.len(), 2);
        assert!(report.results()[1].vulnerabilities.is_empty());
        assert_eq!(report.results()[0].kind.as_deref(), Some("alpine"));
    }

    #[test]
    fn parses_bare_result_array() {
        let json = r#"[{"Target": "go.sum", "Vulnerabilities": [{"VulnerabilityID": "GHSA-1", "Severity": "HIGH"}]}]"#;
        let report = Report::from_slice(json.as_bytes()).unwrap();
        assert_eq!(report.results().len(), 1);
        assert_eq!(
            report.results()[0].vulnerabilities[0].vulnerability_id,
            "GHSA-1"
        );
    }

    #[test]
    fn missing_vulnerabilities_field_is_empty() {
        let json = r#"[{"Target": "package-lock.json"}]"#;
        let report = Report::from_slice(json.as_bytes()).unwrap();
        assert!(report.results()[0].vulnerabilities.is_empty());
    }

    #[test]
    fn object_without_results_is_empty_report() {
        let report = Report::from_slice(br#"{"SchemaVersion": 2}"#).unwrap();
        assert!(report.is_empty());
        let report = Report::from_slice(br#"{"Results": null}"#).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn rejects_scalars_and_garbage() {
        assert!(Report::from_slice(b"42").is_err());
        assert!(Report::from_slice(b"\"text\"").is_err());
        assert!(Report::from_slice(b"{not json").is_err());
        assert!(Report::from_slice(b"").is_err());
    }

    #[test]
    fn rejects_wrongly_typed_results() {
        assert!(Report::from_slice(br#"{"Results": "nope"}"#).is_err());
        assert!(Report::from_slice(br#"[{"Vulnerabilities": 3}]"#).is_err());
    }

    #[test]
    fn rejects_unrelated_objects() {
        assert!(Report::from_slice(br#"{"foo": 1}"#).is_err());
        assert!(Report::from_slice(b"{}").is_err());
        // GitLab's own container-scanning format is not a Trivy report
        assert!(Report::from_slice(br#"{"vulnerabilities": [], "version": "15.0.0"}"#).is_err());
    }

    #[test]
    fn severity_counts_group_case_insensitively() {
        let report = Report::from_slice(REPORT_OBJECT.as_bytes()).unwrap();
        let counts = report.severity_counts();
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 2);

        let json = r#"[{"Vulnerabilities": [{"Severity": "high"}, {"Severity": "UNKNOWN"}, {}]}]"#;
        let counts = Report::from_slice(json.as_bytes()).unwrap().severity_counts();
        assert_eq!(counts.high, 1);
        assert_eq!(counts.unknown, 2);
    }
}
