mod cli;
mod platform;

use anyhow::bail;
use clap::Parser;
use research_logging::{research_error, research_info};

use cli::{Cli, ClientConfig, Command, WatchArgs};
use platform::app::{run_session, SessionOutcome, SessionStart, WatchOptions};
use platform::commands;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    research_logging::initialize(&cli.log_settings());
    let config = cli.client_config();
    research_info!("Using research service at {}", config.api.base());

    let result = run(&config, cli.command);
    if let Err(err) = &result {
        research_error!("Command failed: {:#}", err);
    }
    result
}

fn run(config: &ClientConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Start {
            topic,
            filename,
            no_watch: true,
            ..
        } => commands::start_detached(config, &topic, &filename),
        Command::Start {
            topic,
            filename,
            watch,
            ..
        } => watch_job(config, SessionStart::Submit { topic, filename }, watch),
        Command::Watch { job_id, watch } => {
            let job_id = match job_id {
                Some(job_id) => job_id,
                None => commands::latest_job_id(config)?,
            };
            watch_job(config, SessionStart::Open(job_id), watch)
        }
        Command::Download { filename, out } => commands::download(config, &filename, &out),
        Command::Search { query, limit } => commands::search(config, &query, limit),
        Command::Health => commands::health(config),
        Command::Jobs => commands::jobs(config),
    }
}

fn watch_job(config: &ClientConfig, start: SessionStart, args: WatchArgs) -> anyhow::Result<()> {
    let options = WatchOptions {
        auto_refresh: !args.no_auto_refresh,
        download_dir: args.download_dir,
        input: !args.no_input,
    };
    match run_session(config, start, options)? {
        SessionOutcome::Finished | SessionOutcome::Closed | SessionOutcome::Idle => Ok(()),
        SessionOutcome::DownloadFailed(error) => bail!("download failed: {error}"),
        SessionOutcome::StartFailed(error) => bail!("{error}"),
    }
}
