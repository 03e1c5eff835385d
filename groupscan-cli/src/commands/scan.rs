//! `groupscan scan` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use groupscan_aggregator::{
    AggregateResult, GroupScannerBuilder, HttpGitLabClient, ProjectScanResult, ScanRequest,
    ScannerConfig,
};
use groupscan_core::config::{GroupScanConfig, ScanConfig};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// Renders the aggregate, then returns `CliError::Findings` (exit code 4)
/// when at least one included project has vulnerabilities.
pub async fn execute(args: ScanArgs, config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let mut config = GroupScanConfig::load_or_default(config_path).await?;
    apply_scan_args(&mut config.scan, &args);
    config.validate()?;

    if config.gitlab.token.is_empty() {
        return Err(CliError::Config(
            "gitlab token is not set (GITLAB_TOKEN or [gitlab] token)".to_owned(),
        ));
    }

    let client = HttpGitLabClient::new(&config.gitlab)
        .map_err(|e| CliError::Config(format!("gitlab.host: {e}")))?;
    let scanner = GroupScannerBuilder::new(client)
        .config(ScannerConfig::from_core(&config.scan))
        .build()?;
    let request = ScanRequest::from_core(&config.scan);

    info!(
        host = %config.gitlab.host,
        group = %request.group_id,
        job = %request.job_name,
        artifact = %request.artifact_file,
        "starting group scan"
    );

    let aggregate = scanner.scan_group(&request).await?;
    let report = ScanReport(aggregate);
    writer.render(&report)?;

    if report.0.has_findings() {
        let flagged = report
            .0
            .results
            .iter()
            .filter(|r| r.vulnerability_count() > 0)
            .count();
        return Err(CliError::Findings(format!(
            "{flagged} project(s), {} vulnerabilities",
            report.0.total_vulnerabilities()
        )));
    }

    Ok(())
}

/// Command-line flags win over file and environment values.
fn apply_scan_args(scan: &mut ScanConfig, args: &ScanArgs) {
    if let Some(group) = &args.group {
        scan.group_id = group.clone();
    }
    if let Some(job) = &args.job {
        scan.job_name = job.clone();
    }
    if let Some(artifact) = &args.artifact {
        scan.artifact_file = artifact.clone();
    }
    if let Some(filter) = &args.filter {
        scan.name_filter = filter.clone();
    }
    if let Some(concurrency) = args.concurrency {
        scan.concurrency = concurrency;
    }
}

/// Aggregate result as printed by `scan`; JSON output is the aggregate itself.
#[derive(Serialize)]
#[serde(transparent)]
pub struct ScanReport(pub AggregateResult);

fn project_note(result: &ProjectScanResult) -> String {
    result
        .report_error()
        .or(result.status_error())
        .map(|e| e.to_string())
        .unwrap_or_else(|| "-".to_owned())
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let aggregate = &self.0;
        writeln!(w, "Group: {}", aggregate.group_id.bold())?;
        writeln!(
            w,
            "Projects: {} enumerated, {} matched, {} listed",
            aggregate.projects_enumerated,
            aggregate.projects_matched,
            aggregate.results.len()
        )?;
        writeln!(w)?;

        if aggregate.is_empty() {
            writeln!(w, "{}", "No projects with findings or ignore lists.".green())?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<45} {:<10} {:>6} {:>8}  Note",
            "Project", "Status", "Vulns", "Ignored"
        )?;
        writeln!(w, "{}", "-".repeat(90))?;

        for result in &aggregate.results {
            let status = if result.job_status().is_empty() {
                "-"
            } else {
                result.job_status().as_str()
            };
            let vulns = format!("{:>6}", result.vulnerability_count());
            let vulns = if result.vulnerability_count() > 0 {
                vulns.red().bold()
            } else {
                vulns.green()
            };
            let ignored_count = result.ignore_list().map_or(0, <[String]>::len);
            let ignored = format!("{ignored_count:>8}");
            let ignored = if ignored_count > 0 {
                ignored.yellow()
            } else {
                ignored.normal()
            };

            writeln!(
                w,
                "{:<45} {:<10} {} {}  {}",
                result.full_name(),
                status,
                vulns,
                ignored,
                project_note(result)
            )?;
        }

        writeln!(w)?;
        let total = aggregate.total_vulnerabilities();
        let total_str = total.to_string();
        if total > 0 {
            writeln!(w, "Total vulnerabilities: {}", total_str.red().bold())?;
        } else {
            writeln!(w, "Total vulnerabilities: {}", total_str.green().bold())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use groupscan_aggregator::{AggregatorError, JobLookup, JobStatus, Project, Report};

    use super::*;

    fn result(name: &str, report: Option<&str>, ignore: Option<Vec<&str>>) -> ProjectScanResult {
        let report = match report {
            Some(json) => Report::from_slice(json.as_bytes()).map_err(|e| AggregatorError::MalformedReport {
                entry: "trivy-results.json".to_owned(),
                reason: e.to_string(),
            }),
            None => Err(AggregatorError::NoJobArtifact {
                job: "trivy".to_owned(),
            }),
        };
        let ignore = ignore
            .map(|l| l.into_iter().map(str::to_owned).collect())
            .ok_or(AggregatorError::NoIgnoreFile {
                path: ".trivyignore".to_owned(),
            });
        ProjectScanResult::new(
            &Project::new(1, name),
            JobLookup {
                status: JobStatus::new("success"),
                status_error: None,
                report,
            },
            ignore,
        )
    }

    fn aggregate(results: Vec<ProjectScanResult>) -> AggregateResult {
        AggregateResult {
            scan_id: "00000000-0000-4000-8000-000000000000".to_owned(),
            group_id: "platform".to_owned(),
            projects_enumerated: 5,
            projects_matched: 4,
            results,
            started_at: SystemTime::now(),
            finished_at: SystemTime::now(),
        }
    }

    fn render(report: &ScanReport) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        String::from_utf8(buffer).expect("utf-8")
    }

    #[test]
    fn scan_args_override_config() {
        let mut scan = ScanConfig::default();
        let args = ScanArgs {
            group: Some("platform/backend".to_owned()),
            filter: Some("^billing-".to_owned()),
            concurrency: Some(4),
            ..Default::default()
        };
        apply_scan_args(&mut scan, &args);
        assert_eq!(scan.group_id, "platform/backend");
        assert_eq!(scan.name_filter, "^billing-");
        assert_eq!(scan.concurrency, 4);
        // untouched
        assert_eq!(scan.job_name, "trivy");
        assert_eq!(scan.artifact_file, "trivy-results.json");
    }

    #[test]
    fn empty_aggregate_renders_message() {
        let output = render(&ScanReport(aggregate(Vec::new())));
        assert!(output.contains("Group: platform"));
        assert!(output.contains("5 enumerated, 4 matched, 0 listed"));
        assert!(output.contains("No projects with findings"));
    }

    #[test]
    fn table_lists_projects_and_notes() {
        let report = ScanReport(aggregate(vec![
            result(
                "platform / billing-api",
                Some(r#"[{"Target": "app", "Vulnerabilities": [{"VulnerabilityID": "CVE-1"}, {"VulnerabilityID": "CVE-2"}]}]"#),
                None,
            ),
            result("platform / legacy", None, Some(vec!["CVE-2023-1", "CVE-2023-2"])),
        ]));
        let output = render(&report);

        assert!(output.contains("platform / billing-api"));
        assert!(output.contains("platform / legacy"));
        assert!(output.contains("no trivy job artifact"));
        assert!(output.contains("Total vulnerabilities: 2"));
    }

    #[test]
    fn json_is_the_aggregate() {
        let report = ScanReport(aggregate(vec![result(
            "platform / api",
            Some(r#"[{"Target": "app", "Vulnerabilities": [{"VulnerabilityID": "CVE-1"}]}]"#),
            None,
        )]));
        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!(json["group_id"], "platform");
        assert_eq!(json["results"][0]["vulnerability_count"], 1);
        assert_eq!(json["results"][0]["job_status"], "success");
    }
}
