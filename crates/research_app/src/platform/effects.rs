use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use chrono::Utc;
use research_core::{Effect, Msg, StatusReport, StatusUpdate};
use research_engine::{EngineConfig, EngineError, EngineEvent, EngineHandle, EventSink, JobStatus};
use research_logging::{research_info, research_warn};

use super::app::SessionEvent;
use super::persistence::{self, JobRecord};
use crate::cli::ClientConfig;

/// Forwards engine events into the session channel.
pub(crate) struct MsgSink {
    tx: mpsc::Sender<SessionEvent>,
}

impl MsgSink {
    pub(crate) fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(SessionEvent::App(map_event(event)));
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::JobStarted(result) => Msg::JobStarted(result.map_err(|err| err.message)),
        EngineEvent::StatusFetched { job_id, result } => Msg::StatusFetched {
            job_id,
            result: result.map(map_status).map_err(|err| err.message),
        },
        EngineEvent::PollDue { job_id } => Msg::PollTick { job_id },
        EngineEvent::DownloadCompleted { filename, result } => Msg::DownloadFinished {
            filename,
            result: result.map_err(|err| err.to_string()),
        },
    }
}

fn map_status(status: JobStatus) -> StatusReport {
    StatusReport {
        active: status.active,
        updates: status
            .updates
            .into_iter()
            .map(|update| StatusUpdate {
                message: update.message,
                status: update.status,
                output_file: update.output_file,
            })
            .collect(),
    }
}

/// Executes effects produced by `update` against the engine and the local
/// job history.
pub struct EffectRunner {
    engine: EngineHandle,
    data_dir: PathBuf,
}

impl EffectRunner {
    pub(crate) fn new(
        config: &ClientConfig,
        download_dir: PathBuf,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Result<Self, EngineError> {
        let engine_config = EngineConfig {
            api: config.api.clone(),
            poll_interval: config.poll_interval,
            output_dir: download_dir,
        };
        let engine = EngineHandle::new(engine_config, Arc::new(MsgSink::new(event_tx)))?;
        Ok(Self {
            engine,
            data_dir: config.data_dir.clone(),
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartJob { topic, filename } => {
                    research_info!("StartJob topic_len={} filename={}", topic.len(), filename);
                    self.engine.start_job(topic, filename);
                }
                Effect::FetchStatus { job_id } => {
                    self.engine.fetch_status(job_id);
                }
                Effect::StartPolling { job_id } => {
                    self.engine.start_polling(job_id);
                }
                Effect::StopPolling => {
                    self.engine.stop_polling();
                }
                Effect::RememberJob {
                    job_id,
                    topic,
                    filename,
                } => {
                    persistence::remember_job(
                        &self.data_dir,
                        JobRecord {
                            job_id,
                            topic,
                            filename,
                            started_utc: Utc::now().to_rfc3339(),
                        },
                    );
                }
                Effect::DownloadReady {
                    job_id,
                    filename,
                    url,
                } => {
                    research_info!("Job {} produced {} at {}", job_id, filename, url);
                }
                Effect::DownloadFile { filename } => {
                    if filename.trim().is_empty() {
                        research_warn!("Ignoring download of empty filename");
                        continue;
                    }
                    self.engine.download(filename);
                }
            }
        }
    }
}
