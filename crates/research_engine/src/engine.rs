use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use research_logging::{research_debug, research_info, research_warn};
use tokio::runtime::Runtime;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::{ApiSettings, ReqwestApi, ResearchApi};
use crate::filename::safe_filename;
use crate::persist::AtomicFileWriter;
use crate::{ApiError, DownloadError, EngineEvent, JobId};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiSettings,
    pub poll_interval: Duration,
    /// Where downloaded files are saved.
    pub output_dir: PathBuf,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            api: ApiSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            output_dir,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid api settings: {0}")]
    Api(#[from] ApiError),
}

/// Receives engine events on the engine's own threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

enum EngineCommand {
    StartJob { topic: String, filename: String },
    FetchStatus { job_id: JobId },
    StartPolling { job_id: JobId },
    StopPolling,
    Download { filename: String },
}

/// Runs API calls on a background tokio runtime and reports results to an
/// [`EventSink`]. Dropping the handle shuts the runtime down.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let api: Arc<dyn ResearchApi> = Arc::new(ReqwestApi::new(config.api.clone())?);
        Self::with_api(config, api, sink)
    }

    pub fn with_api(
        config: EngineConfig,
        api: Arc<dyn ResearchApi>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let runtime = Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let writer = AtomicFileWriter::new(config.output_dir.clone());
        let poll_interval = config.poll_interval;

        thread::spawn(move || {
            let mut poll_cancel: Option<CancellationToken> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartPolling { job_id } => {
                        if let Some(token) = poll_cancel.take() {
                            token.cancel();
                        }
                        let token = CancellationToken::new();
                        runtime.spawn(poll_timer(
                            job_id,
                            poll_interval,
                            token.clone(),
                            sink.clone(),
                        ));
                        poll_cancel = Some(token);
                    }
                    EngineCommand::StopPolling => {
                        if let Some(token) = poll_cancel.take() {
                            token.cancel();
                        }
                    }
                    command => {
                        let api = api.clone();
                        let sink = sink.clone();
                        let writer = writer.clone();
                        runtime.spawn(async move {
                            handle_command(api.as_ref(), &writer, command, sink.as_ref()).await;
                        });
                    }
                }
            }
            if let Some(token) = poll_cancel.take() {
                token.cancel();
            }
            research_debug!("Engine command loop finished");
        });

        Ok(Self { cmd_tx })
    }

    pub fn start_job(&self, topic: impl Into<String>, filename: impl Into<String>) {
        self.send(EngineCommand::StartJob {
            topic: topic.into(),
            filename: filename.into(),
        });
    }

    pub fn fetch_status(&self, job_id: impl Into<JobId>) {
        self.send(EngineCommand::FetchStatus {
            job_id: job_id.into(),
        });
    }

    /// Start the poll timer for `job_id`, replacing any running timer. The
    /// first tick fires one interval from now.
    pub fn start_polling(&self, job_id: impl Into<JobId>) {
        self.send(EngineCommand::StartPolling {
            job_id: job_id.into(),
        });
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn download(&self, filename: impl Into<String>) {
        self.send(EngineCommand::Download {
            filename: filename.into(),
        });
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            research_warn!("Engine command loop is gone; command dropped");
        }
    }
}

async fn poll_timer(
    job_id: JobId,
    period: Duration,
    cancel: CancellationToken,
    sink: Arc<dyn EventSink>,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    research_info!("Polling job {} every {:?}", job_id, period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                research_info!("Polling stopped for job {}", job_id);
                break;
            }
            _ = interval.tick() => {
                sink.emit(EngineEvent::PollDue { job_id: job_id.clone() });
            }
        }
    }
}

async fn handle_command(
    api: &dyn ResearchApi,
    writer: &AtomicFileWriter,
    command: EngineCommand,
    sink: &dyn EventSink,
) {
    match command {
        EngineCommand::StartJob { topic, filename } => {
            let result = api.start_job(&topic, &filename).await;
            match &result {
                Ok(job_id) => research_info!("Started job {} for topic {:?}", job_id, topic),
                Err(err) => research_warn!("Start failed: {} ({})", err.message, err.kind),
            }
            sink.emit(EngineEvent::JobStarted(result));
        }
        EngineCommand::FetchStatus { job_id } => {
            let result = api.job_status(&job_id).await;
            match &result {
                Ok(status) => research_debug!(
                    "Job {} active={} updates={}",
                    job_id,
                    status.active,
                    status.updates.len()
                ),
                Err(err) => research_warn!(
                    "Status fetch for job {} failed: {} ({})",
                    job_id,
                    err.message,
                    err.kind
                ),
            }
            sink.emit(EngineEvent::StatusFetched { job_id, result });
        }
        EngineCommand::Download { filename } => {
            let result = download_to(api, writer, &filename).await;
            match &result {
                Ok(path) => research_info!("Saved {} to {:?}", filename, path),
                Err(err) => research_warn!("Download of {} failed: {}", filename, err),
            }
            sink.emit(EngineEvent::DownloadCompleted { filename, result });
        }
        EngineCommand::StartPolling { .. } | EngineCommand::StopPolling => {}
    }
}

async fn download_to(
    api: &dyn ResearchApi,
    writer: &AtomicFileWriter,
    filename: &str,
) -> Result<PathBuf, DownloadError> {
    let bytes = api.download(filename).await?;
    let path = writer.write(&safe_filename(filename), &bytes)?;
    Ok(path)
}
