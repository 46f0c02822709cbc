use crate::{download_reference, AppState, DownloadState, Effect, JobId, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::TopicChanged(topic) => {
            state.set_topic(topic);
            Vec::new()
        }
        Msg::FilenameChanged(filename) => {
            let filename = filename.trim();
            if !filename.is_empty() {
                state.set_output_filename(filename.to_string());
            }
            Vec::new()
        }
        Msg::TopicSubmitted => match state.begin_start() {
            Some((topic, filename)) => vec![Effect::StartJob { topic, filename }],
            None => Vec::new(),
        },
        Msg::JobStarted(result) => {
            let Some(topic) = state.finish_start() else {
                return (state, Vec::new());
            };
            match result {
                Ok(job_id) => {
                    let mut effects = vec![Effect::RememberJob {
                        job_id: job_id.clone(),
                        topic,
                        filename: state.options().output_filename.clone(),
                    }];
                    effects.extend(open_job(&mut state, job_id));
                    effects
                }
                Err(error) => {
                    state.set_error(error);
                    Vec::new()
                }
            }
        }
        Msg::JobOpened(job_id) => {
            if state.is_closed() {
                Vec::new()
            } else {
                open_job(&mut state, job_id)
            }
        }
        Msg::PollTick { job_id } => match state.session_for(&job_id) {
            // A tick while the previous fetch is outstanding is skipped so
            // responses never overlap.
            Some(session)
                if session.auto_refresh
                    && session.polling
                    && !session.is_terminal()
                    && !session.fetch_in_flight =>
            {
                session.fetch_in_flight = true;
                vec![Effect::FetchStatus { job_id }]
            }
            _ => Vec::new(),
        },
        Msg::RefreshClicked => match state.session_mut() {
            Some(session) if !session.fetch_in_flight => {
                session.fetch_in_flight = true;
                vec![Effect::FetchStatus {
                    job_id: session.job_id.clone(),
                }]
            }
            _ => Vec::new(),
        },
        Msg::AutoRefreshToggled => {
            let effects = match state.session_mut() {
                Some(session) => {
                    session.auto_refresh = !session.auto_refresh;
                    if session.auto_refresh && !session.polling && !session.is_terminal() {
                        session.polling = true;
                        vec![Effect::StartPolling {
                            job_id: session.job_id.clone(),
                        }]
                    } else if !session.auto_refresh && session.polling {
                        session.polling = false;
                        vec![Effect::StopPolling]
                    } else {
                        Vec::new()
                    }
                }
                None => return (state, Vec::new()),
            };
            state.mark_dirty();
            effects
        }
        Msg::StatusFetched { job_id, result } => {
            if state.session_for(&job_id).is_none() {
                // Response for a job that is no longer displayed.
                return (state, Vec::new());
            }
            match result {
                Ok(report) => match state.apply_report(report) {
                    Some(filename) => on_terminal(&mut state, job_id, filename),
                    None => Vec::new(),
                },
                Err(error) => {
                    state.apply_fetch_error(error);
                    Vec::new()
                }
            }
        }
        Msg::DownloadFinished { filename, result } => {
            let matches_job = state
                .session()
                .is_some_and(|s| s.output_file_is(&filename));
            if matches_job {
                state.set_download(match result {
                    Ok(path) => DownloadState::Saved(path),
                    Err(error) => DownloadState::Failed(error),
                });
            }
            Vec::new()
        }
        Msg::ViewClosed => {
            if state.is_closed() {
                Vec::new()
            } else if state.close() {
                vec![Effect::StopPolling]
            } else {
                Vec::new()
            }
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

/// Display `job_id`: one immediate fetch, plus the timer when auto-refresh
/// is on.
fn open_job(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(3);
    if state.open_session(job_id.clone()) {
        effects.push(Effect::StopPolling);
    }
    let Some(session) = state.session_mut() else {
        return effects;
    };
    session.fetch_in_flight = true;
    effects.push(Effect::FetchStatus {
        job_id: job_id.clone(),
    });
    if session.auto_refresh {
        session.polling = true;
        effects.push(Effect::StartPolling { job_id });
    }
    effects
}

fn on_terminal(state: &mut AppState, job_id: JobId, filename: String) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(3);
    if let Some(session) = state.session_mut() {
        if session.polling {
            session.polling = false;
            effects.push(Effect::StopPolling);
        }
    }
    effects.push(Effect::DownloadReady {
        job_id,
        url: download_reference(&state.options().api_base, &filename),
        filename: filename.clone(),
    });
    if state.options().auto_download {
        state.set_download(DownloadState::InProgress);
        effects.push(Effect::DownloadFile { filename });
    }
    effects
}
