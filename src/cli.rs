use crate::source::{
    DEFAULT_BRANCH, DEFAULT_OWNER, DEFAULT_REPO, DEFAULT_SUBTREE, RemoteSource,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Parser, Debug)]
#[command(
    name = "at-toolkit",
    version,
    about = "Checks for new releases of the AT Unified Toolkit extension, updates a local copy of it, and downloads batches of URLs."
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Show informational logs")]
    pub verbose: bool,
    #[arg(
        long,
        global = true,
        env = "AT_TOOLKIT_STATE",
        help = "State file, defaults to <config dir>/at-toolkit/state.json"
    )]
    pub state_file: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "AT_TOOLKIT_INSTALL_DIR",
        help = "Installed extension folder, used for the local version and as the default sync target"
    )]
    pub install_dir: Option<PathBuf>,
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    #[arg(long, global = true, env = "AT_TOOLKIT_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: String,
    #[arg(long, global = true, env = "AT_TOOLKIT_REPO", default_value = DEFAULT_REPO)]
    pub repo: String,
    #[arg(long, global = true, env = "AT_TOOLKIT_BRANCH", default_value = DEFAULT_BRANCH)]
    pub branch: String,
    #[arg(long, global = true, env = "AT_TOOLKIT_SUBTREE", default_value = DEFAULT_SUBTREE)]
    pub subtree: String,
}

impl SourceArgs {
    pub fn remote_source(&self) -> RemoteSource {
        RemoteSource {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            subtree: self.subtree.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check once for a newer version
    Check,
    /// Check at startup and then periodically until interrupted
    Watch {
        #[arg(
            long,
            default_value_t = 60,
            value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES),
            help = "Minutes between checks, at most one week"
        )]
        interval_minutes: u64,
    },
    /// Show the result of the last check without fetching
    Status,
    /// Hide the update notice for the currently known remote version
    Dismiss,
    /// Replace the files of a local extension folder with the latest release
    Sync {
        #[arg(long, help = "Extension folder to update, asked interactively when omitted")]
        folder: Option<PathBuf>,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Download a list of URLs with a bounded number in flight
    Download {
        #[arg(help = "URLs to download")]
        urls: Vec<String>,
        #[arg(long, help = "File with one URL per line")]
        file: Option<PathBuf>,
        #[arg(short, long, help = "Maximum simultaneous downloads, remembered for next time")]
        concurrency: Option<usize>,
        #[arg(long, default_value = ".", help = "Destination folder")]
        dest: PathBuf,
        #[command(flatten)]
        report: ReportArgs,
    },
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    #[arg(long, help = "Write per-item results to <REPORT>.json or <REPORT>.csv")]
    pub report: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, help = "Report format (json or csv)")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn download_arguments() {
        let args = Args::try_parse_from([
            "at-toolkit",
            "download",
            "https://a.example/1",
            "https://a.example/2",
            "-c",
            "5",
            "--report",
            "dl",
            "--format",
            "csv",
        ])
        .unwrap();
        match args.command {
            Command::Download { urls, concurrency, report, .. } => {
                assert_eq!(urls.len(), 2);
                assert_eq!(concurrency, Some(5));
                assert_eq!(report.report.as_deref(), Some("dl"));
                assert!(matches!(report.format, OutputFormat::Csv));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn source_defaults() {
        let args = Args::try_parse_from(["at-toolkit", "check", "--branch", "dev"]).unwrap();
        let source = args.source.remote_source();
        assert_eq!(source.owner, DEFAULT_OWNER);
        assert_eq!(source.branch, "dev");
    }

    #[test]
    fn watch_interval_is_bounded() {
        let parse = |value: &str| {
            Args::try_parse_from(["at-toolkit", "watch", "--interval-minutes", value])
        };
        match parse("90").unwrap().command {
            Command::Watch { interval_minutes } => assert_eq!(interval_minutes, 90),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(parse("0").is_err());
        assert!(parse("10081").is_err());
        assert!(parse("18446744073709551615").is_err());
    }
}
