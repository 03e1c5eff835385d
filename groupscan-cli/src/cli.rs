//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// groupscan -- which projects of a GitLab group still have open findings.
///
/// Use `groupscan <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "groupscan", version, about, long_about = None)]
pub struct Cli {
    /// Path to the groupscan.toml configuration file.
    #[arg(short, long, default_value = "groupscan.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan every project of a group and list the ones needing attention.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Flags override the `[scan]` section of the config file.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Group id or full path (e.g. `platform/backend`).
    #[arg(short, long)]
    pub group: Option<String>,

    /// CI job that produces the report artifact.
    #[arg(short, long)]
    pub job: Option<String>,

    /// Report file name inside the artifact archive.
    #[arg(short, long)]
    pub artifact: Option<String>,

    /// Regex on "Namespace / Project"; only matching projects are scanned.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Number of projects scanned at the same time.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, gitlab, scan).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_scan_defaults() {
        let cli = Cli::try_parse_from(["groupscan", "scan"]).expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("groupscan.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Scan(args) => {
                assert!(args.group.is_none());
                assert!(args.filter.is_none());
                assert!(args.concurrency.is_none());
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn parse_scan_with_overrides() {
        let cli = Cli::try_parse_from([
            "groupscan",
            "-c",
            "/etc/groupscan.toml",
            "scan",
            "--group",
            "platform/backend",
            "--job",
            "container_scanning",
            "--artifact",
            "gl-report.json",
            "--filter",
            "^billing-",
            "--concurrency",
            "4",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/groupscan.toml"));
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.group.as_deref(), Some("platform/backend"));
                assert_eq!(args.job.as_deref(), Some("container_scanning"));
                assert_eq!(args.artifact.as_deref(), Some("gl-report.json"));
                assert_eq!(args.filter.as_deref(), Some("^billing-"));
                assert_eq!(args.concurrency, Some(4));
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["groupscan", "scan", "--output", "json", "--log-level", "debug"])
            .expect("parse succeeded");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn parse_config_show_section() {
        let cli = Cli::try_parse_from(["groupscan", "config", "show", "--section", "gitlab"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("gitlab")),
            _ => panic!("expected Config Show command"),
        }
    }

    #[test]
    fn rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["groupscan", "--output", "yaml", "scan"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_concurrency() {
        assert!(Cli::try_parse_from(["groupscan", "scan", "--concurrency", "many"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["groupscan"]).is_err());
    }
}
