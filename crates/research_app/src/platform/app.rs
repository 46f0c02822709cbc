use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use research_core::{
    update, AppState, DownloadState, JobId, Msg, SessionOptions, DEFAULT_OUTPUT_FILENAME,
};
use research_logging::{research_debug, research_info};

use super::effects::EffectRunner;
use super::terminal::input::{self, RawModeGuard};
use super::terminal::render::TerminalRenderer;
use crate::cli::ClientConfig;

/// Wake-up interval of the session loop when no message arrives.
const TICK: Duration = Duration::from_millis(250);

/// How a watch session begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    Submit { topic: String, filename: String },
    Open(JobId),
}

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub auto_refresh: bool,
    pub download_dir: Option<PathBuf>,
    pub input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The job produced its file (and the download, if requested, ended).
    Finished,
    DownloadFailed(String),
    /// The user quit the view.
    Closed,
    /// Nothing left to wait for and no way to ask for more.
    Idle,
    StartFailed(String),
}

/// What arrives on the session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    App(Msg),
    /// The key reader stopped; no more user commands will arrive.
    InputClosed,
}

impl From<Msg> for SessionEvent {
    fn from(msg: Msg) -> Self {
        SessionEvent::App(msg)
    }
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer<io::Stdout>,
}

impl Session {
    fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = state;
        self.runner.enqueue(effects);
        if let Some(view) = view {
            self.renderer.render(&view)?;
        }
        Ok(())
    }
}

/// Key reader plus the raw-mode guard; both end when this is dropped.
struct KeyInput {
    stop: Arc<AtomicBool>,
    reader: Option<std::thread::JoinHandle<()>>,
    _raw: RawModeGuard,
}

impl Drop for KeyInput {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Drive one job view until the job finishes or the user quits.
pub fn run_session(
    config: &ClientConfig,
    start: SessionStart,
    options: WatchOptions,
) -> anyhow::Result<SessionOutcome> {
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>();
    let download_dir = options
        .download_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let runner = EffectRunner::new(config, download_dir, event_tx.clone())
        .context("failed to start the research engine")?;

    let mut input_open = options.input && io::stdin().is_terminal();
    let key_input = if input_open {
        println!("Keys: r refresh, a toggle auto-refresh, q quit");
        let raw = RawModeGuard::enable().context("failed to switch the terminal to raw mode")?;
        let stop = Arc::new(AtomicBool::new(false));
        let reader = input::spawn_key_reader(event_tx, stop.clone());
        Some(KeyInput {
            stop,
            reader: Some(reader),
            _raw: raw,
        })
    } else {
        drop(event_tx);
        None
    };

    let output_filename = match &start {
        SessionStart::Submit { filename, .. } => filename.clone(),
        SessionStart::Open(_) => DEFAULT_OUTPUT_FILENAME.to_string(),
    };
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut renderer = TerminalRenderer::new(stdout, color);
    if key_input.is_some() {
        renderer = renderer.with_raw_mode();
    }
    let mut session = Session {
        state: AppState::with_options(SessionOptions {
            api_base: config.api.base().to_string(),
            auto_refresh: options.auto_refresh,
            auto_download: options.download_dir.is_some(),
            output_filename,
        }),
        runner,
        renderer,
    };

    for msg in initial_messages(start) {
        session.dispatch(msg)?;
    }

    let outcome = loop {
        if let Some(outcome) = session_outcome(&session.state, input_open) {
            break outcome;
        }
        match event_rx.recv_timeout(TICK) {
            Ok(event) => {
                if let Some(msg) = route(event, &mut input_open) {
                    research_debug!("Dispatching {:?}", msg);
                    session.dispatch(msg)?;
                }
            }
            Err(RecvTimeoutError::Timeout) => session.dispatch(Msg::Tick)?,
            Err(RecvTimeoutError::Disconnected) => break SessionOutcome::Closed,
        }
    };

    research_info!("Session ended: {:?}", outcome);
    session.dispatch(Msg::ViewClosed)?;
    drop(key_input);
    Ok(outcome)
}

fn initial_messages(start: SessionStart) -> Vec<Msg> {
    match start {
        SessionStart::Submit { topic, filename } => vec![
            Msg::TopicChanged(topic),
            Msg::FilenameChanged(filename),
            Msg::TopicSubmitted,
        ],
        SessionStart::Open(job_id) => vec![Msg::JobOpened(job_id)],
    }
}

/// Handle loop-level events; returns the message for `update`, if any.
fn route(event: SessionEvent, input_open: &mut bool) -> Option<Msg> {
    match event {
        SessionEvent::App(msg) => Some(msg),
        SessionEvent::InputClosed => {
            research_info!("Key input closed");
            *input_open = false;
            None
        }
    }
}

/// Decide whether the session loop is done with the current state.
fn session_outcome(state: &AppState, input_open: bool) -> Option<SessionOutcome> {
    if state.is_closed() {
        return Some(SessionOutcome::Closed);
    }
    if !state.has_job() {
        if state.start_pending() {
            return None;
        }
        let error = state.start_error().unwrap_or("Topic is required");
        return Some(SessionOutcome::StartFailed(error.to_string()));
    }
    if state.job_finished() {
        return Some(match state.job_download() {
            Some(DownloadState::Failed(error)) => SessionOutcome::DownloadFailed(error.clone()),
            _ => SessionOutcome::Finished,
        });
    }
    if !input_open && !state.job_waiting() {
        return Some(SessionOutcome::Idle);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use research_core::{StatusReport, StatusUpdate};

    fn run(options: SessionOptions, msgs: Vec<Msg>) -> AppState {
        msgs.into_iter()
            .fold(AppState::with_options(options), |state, msg| update(state, msg).0)
    }

    fn opened() -> Vec<Msg> {
        let mut msgs = initial_messages(SessionStart::Open("1".to_string()));
        msgs.push(Msg::StatusFetched {
            job_id: "1".to_string(),
            result: Ok(StatusReport {
                active: true,
                updates: vec![StatusUpdate {
                    message: Some("Initializing research".to_string()),
                    ..StatusUpdate::default()
                }],
            }),
        });
        msgs
    }

    fn completion() -> Msg {
        Msg::StatusFetched {
            job_id: "1".to_string(),
            result: Ok(StatusReport {
                active: false,
                updates: vec![StatusUpdate {
                    message: Some("Complete".to_string()),
                    status: Some("completed".to_string()),
                    output_file: Some("paper.pdf".to_string()),
                }],
            }),
        }
    }

    #[test]
    fn submit_sends_topic_filename_then_submits() {
        assert_eq!(
            initial_messages(SessionStart::Submit {
                topic: "gnn".to_string(),
                filename: "gnn.pdf".to_string(),
            }),
            vec![
                Msg::TopicChanged("gnn".to_string()),
                Msg::FilenameChanged("gnn.pdf".to_string()),
                Msg::TopicSubmitted,
            ]
        );
    }

    #[test]
    fn blank_topic_ends_with_start_failure() {
        let state = run(
            SessionOptions::default(),
            initial_messages(SessionStart::Submit {
                topic: "   ".to_string(),
                filename: "paper.pdf".to_string(),
            }),
        );

        assert_eq!(
            session_outcome(&state, true),
            Some(SessionOutcome::StartFailed("Topic is required".to_string()))
        );
    }

    #[test]
    fn pending_start_keeps_waiting_and_server_error_is_reported() {
        let mut msgs = initial_messages(SessionStart::Submit {
            topic: "gnn".to_string(),
            filename: "paper.pdf".to_string(),
        });
        let state = run(SessionOptions::default(), msgs.clone());
        assert_eq!(session_outcome(&state, false), None);

        msgs.push(Msg::JobStarted(Err("Failed to start research job".to_string())));
        let state = run(SessionOptions::default(), msgs);
        assert_eq!(
            session_outcome(&state, false),
            Some(SessionOutcome::StartFailed(
                "Failed to start research job".to_string()
            ))
        );
    }

    #[test]
    fn running_job_keeps_session_open_until_complete() {
        let mut msgs = opened();
        let state = run(SessionOptions::default(), msgs.clone());
        assert_eq!(session_outcome(&state, false), None);

        msgs.push(completion());
        let state = run(SessionOptions::default(), msgs);
        assert_eq!(
            session_outcome(&state, false),
            Some(SessionOutcome::Finished)
        );
    }

    #[test]
    fn auto_download_waits_for_the_file() {
        let options = SessionOptions {
            auto_download: true,
            ..SessionOptions::default()
        };
        let mut msgs = opened();
        msgs.push(completion());
        let state = run(options.clone(), msgs.clone());
        assert_eq!(session_outcome(&state, false), None);

        msgs.push(Msg::DownloadFinished {
            filename: "paper.pdf".to_string(),
            result: Err("disk full".to_string()),
        });
        let state = run(options, msgs);
        assert_eq!(
            session_outcome(&state, false),
            Some(SessionOutcome::DownloadFailed("disk full".to_string()))
        );
    }

    #[test]
    fn without_timer_or_input_the_session_goes_idle() {
        let options = SessionOptions {
            auto_refresh: false,
            ..SessionOptions::default()
        };
        let state = run(options.clone(), opened());
        assert_eq!(
            session_outcome(&state, false),
            Some(SessionOutcome::Idle)
        );
        assert_eq!(session_outcome(&state, true), None);
    }

    #[test]
    fn closed_key_input_lets_an_idle_session_end() {
        let options = SessionOptions {
            auto_refresh: false,
            ..SessionOptions::default()
        };
        let state = run(options, opened());
        let mut input_open = true;
        assert_eq!(session_outcome(&state, input_open), None);

        assert_eq!(route(SessionEvent::InputClosed, &mut input_open), None);
        assert!(!input_open);
        assert_eq!(
            session_outcome(&state, input_open),
            Some(SessionOutcome::Idle)
        );
    }

    #[test]
    fn app_events_pass_through_and_keep_input_open() {
        let mut input_open = true;
        assert_eq!(
            route(Msg::RefreshClicked.into(), &mut input_open),
            Some(Msg::RefreshClicked)
        );
        assert!(input_open);
    }

    #[test]
    fn quitting_closes_the_session() {
        let mut msgs = opened();
        msgs.push(Msg::ViewClosed);
        let state = run(SessionOptions::default(), msgs);
        assert_eq!(
            session_outcome(&state, true),
            Some(SessionOutcome::Closed)
        );
    }
}
