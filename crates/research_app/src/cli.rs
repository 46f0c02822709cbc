//! Command line surface and the client configuration derived from it.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use research_core::DEFAULT_OUTPUT_FILENAME;
use research_engine::{ApiSettings, DEFAULT_API_BASE, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use research_logging::{LogDestination, LogSettings, DEFAULT_LOG_FILE};

#[derive(Parser, Debug)]
#[command(
    name = "research",
    version,
    about = "Submit research topics to the research agent service and follow the generated paper"
)]
pub struct Cli {
    /// Base URL of the research service (defaults to http://127.0.0.1:5000)
    #[arg(long, env = "RESEARCH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Seconds between automatic status polls
    #[arg(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..=60),
        global = true
    )]
    pub poll_interval: u64,

    /// Directory holding the local job history
    #[arg(long, env = "RESEARCH_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Where log records go
    #[arg(long, value_enum, default_value_t = LogTarget::File, global = true)]
    pub log: LogTarget,

    /// Log file used by `--log file` and `--log both`
    #[arg(long, default_value = DEFAULT_LOG_FILE, global = true)]
    pub log_file: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a topic and follow the job until the paper is ready
    Start {
        /// Research topic
        topic: String,

        /// Name the service should give the generated file
        #[arg(long, default_value = DEFAULT_OUTPUT_FILENAME)]
        filename: String,

        /// Print the job id and exit instead of following progress
        #[arg(long)]
        no_watch: bool,

        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Follow an existing job (the most recently started one by default)
    Watch {
        job_id: Option<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Fetch a generated file
    Download {
        filename: String,

        /// Directory to save into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Run the service's arXiv test search
    Search {
        query: String,

        #[arg(
            long,
            default_value_t = DEFAULT_SEARCH_LIMIT,
            value_parser = clap::value_parser!(u32).range(1..=(MAX_SEARCH_LIMIT as i64))
        )]
        limit: u32,
    },
    /// Check that the service is up
    Health,
    /// List jobs started from this machine
    Jobs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Start with automatic polling switched off
    #[arg(long)]
    pub no_auto_refresh: bool,

    /// Save the generated file into this directory once it is announced
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Ignore single-key commands (r refresh, a toggle auto-refresh, q quit)
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

/// Settings shared by every command, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api: ApiSettings,
    pub poll_interval: Duration,
    pub data_dir: PathBuf,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let base_url = self
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_BASE);

        ClientConfig {
            api: ApiSettings::with_base_url(base_url),
            poll_interval: Duration::from_secs(self.poll_interval),
            data_dir: self.data_dir.clone(),
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            destination: match self.log {
                LogTarget::File => LogDestination::File,
                LogTarget::Terminal => LogDestination::Terminal,
                LogTarget::Both => LogDestination::Both,
            },
            level: match self.verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            },
            file: self.log_file.clone(),
        }
    }
}
