use std::path::PathBuf;

use crate::download::{download_reference, DEFAULT_OUTPUT_FILENAME};
use crate::stage::{classify_message, Stage};
use crate::view_model::{AppViewModel, JobBadge, JobView, StageMarker, StageRowView};

/// Opaque job identifier handed out by the research service.
pub type JobId = String;

/// One record from a status response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusUpdate {
    pub message: Option<String>,
    pub status: Option<String>,
    pub output_file: Option<String>,
}

/// A status response: whether the job is still running plus the updates
/// produced since the previous fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusReport {
    pub active: bool,
    pub updates: Vec<StatusUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    NotRequested,
    InProgress,
    Saved(PathBuf),
    Failed(String),
}

/// Client settings the state machine needs; supplied by whoever constructs
/// the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Base the download link is built on. Empty means relative links.
    pub api_base: String,
    /// Initial auto-refresh flag for every opened job.
    pub auto_refresh: bool,
    /// Fetch the generated file as soon as it is announced.
    pub auto_download: bool,
    pub output_filename: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            auto_refresh: true,
            auto_download: false,
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
        }
    }
}

/// Per-job state, alive while the job is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobSession {
    pub(crate) job_id: JobId,
    transcript: Vec<String>,
    stage: Stage,
    output_file: Option<String>,
    pub(crate) auto_refresh: bool,
    pub(crate) polling: bool,
    pub(crate) fetch_in_flight: bool,
    active: Option<bool>,
    last_error: Option<String>,
    download: DownloadState,
}

impl JobSession {
    fn new(job_id: JobId, auto_refresh: bool) -> Self {
        Self {
            job_id,
            transcript: Vec::new(),
            stage: Stage::default(),
            output_file: None,
            auto_refresh,
            polling: false,
            fetch_in_flight: false,
            active: None,
            last_error: None,
            download: DownloadState::NotRequested,
        }
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.output_file.is_some()
    }

    fn is_finished(&self) -> bool {
        self.is_terminal() && self.download != DownloadState::InProgress
    }

    fn is_waiting(&self) -> bool {
        self.polling || self.fetch_in_flight || self.download == DownloadState::InProgress
    }

    pub(crate) fn output_file_is(&self, filename: &str) -> bool {
        self.output_file.as_deref() == Some(filename)
    }

    /// Fold one status report into the session. Returns the output file if
    /// this report is the one that made the session terminal.
    fn apply_report(&mut self, report: StatusReport) -> Option<String> {
        let was_terminal = self.is_terminal();
        self.active = Some(report.active);
        self.last_error = None;

        for update in report.updates {
            if let Some(message) = update.message.filter(|m| !m.is_empty()) {
                if let Some(stage) = classify_message(&message) {
                    self.stage = self.stage.max(stage);
                }
                self.transcript.push(message);
            }
            if self.output_file.is_none() {
                self.output_file = update.output_file.filter(|f| !f.is_empty());
            }
        }

        if was_terminal {
            None
        } else {
            self.output_file.clone()
        }
    }

    fn badge(&self) -> Option<JobBadge> {
        let active = self.active?;
        Some(if !active && self.output_file.is_some() {
            JobBadge::Complete
        } else if active {
            JobBadge::Running
        } else {
            JobBadge::Error
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    options: SessionOptions,
    topic_input: String,
    pending_topic: Option<String>,
    last_error: Option<String>,
    session: Option<JobSession>,
    closed: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start_pending(&self) -> bool {
        self.pending_topic.is_some()
    }

    /// Last start-request failure.
    pub fn start_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_job(&self) -> bool {
        self.session.is_some()
    }

    /// Terminal update seen and no download outstanding.
    pub fn job_finished(&self) -> bool {
        self.session.as_ref().is_some_and(JobSession::is_finished)
    }

    /// A timer, status fetch or download is still running for the job.
    pub fn job_waiting(&self) -> bool {
        self.session.as_ref().is_some_and(JobSession::is_waiting)
    }

    pub fn job_download(&self) -> Option<&DownloadState> {
        self.session.as_ref().map(|s| &s.download)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            topic: self.topic_input.clone(),
            output_filename: self.options.output_filename.clone(),
            start_pending: self.pending_topic.is_some(),
            error: self.last_error.clone(),
            job: self.session.as_ref().map(|session| self.job_view(session)),
            closed: self.closed,
            dirty: self.dirty,
        }
    }

    fn job_view(&self, session: &JobSession) -> JobView {
        let stages = Stage::ALL
            .iter()
            .map(|&stage| StageRowView {
                stage,
                marker: match stage.cmp(&session.stage) {
                    std::cmp::Ordering::Less => StageMarker::Done,
                    std::cmp::Ordering::Equal => StageMarker::Current,
                    std::cmp::Ordering::Greater => StageMarker::Pending,
                },
            })
            .collect();
        let download_url = session
            .output_file
            .as_deref()
            .map(|file| download_reference(&self.options.api_base, file));

        JobView {
            job_id: session.job_id.clone(),
            transcript: session.transcript.clone(),
            stage: session.stage,
            stages,
            badge: session.badge(),
            output_file: session.output_file.clone(),
            download_url,
            auto_refresh: session.auto_refresh,
            polling: session.polling,
            refreshing: session.fetch_in_flight,
            error: session.last_error.clone(),
            download: session.download.clone(),
            finished: session.is_finished(),
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_topic(&mut self, topic: String) {
        self.topic_input = topic;
    }

    pub(crate) fn set_output_filename(&mut self, filename: String) {
        self.options.output_filename = filename;
    }

    /// Marks a start request as in flight. Returns the trimmed topic and the
    /// filename to send, or `None` when nothing should be sent.
    pub(crate) fn begin_start(&mut self) -> Option<(String, String)> {
        if self.closed || self.pending_topic.is_some() {
            return None;
        }
        let topic = self.topic_input.trim();
        if topic.is_empty() {
            return None;
        }
        let topic = topic.to_string();
        self.pending_topic = Some(topic.clone());
        self.last_error = None;
        self.mark_dirty();
        Some((topic, self.options.output_filename.clone()))
    }

    /// Clears the in-flight start request, returning its topic.
    pub(crate) fn finish_start(&mut self) -> Option<String> {
        let topic = self.pending_topic.take();
        if topic.is_some() {
            self.mark_dirty();
        }
        topic
    }

    pub(crate) fn set_error(&mut self, error: String) {
        self.last_error = Some(error);
        self.mark_dirty();
    }

    /// Replaces the displayed job. Returns whether the previous job's timer
    /// was running.
    pub(crate) fn open_session(&mut self, job_id: JobId) -> bool {
        let was_polling = self.session.as_ref().is_some_and(|s| s.polling);
        self.session = Some(JobSession::new(job_id, self.options.auto_refresh));
        self.mark_dirty();
        was_polling
    }

    /// Tears the view down. Returns whether the timer was running.
    pub(crate) fn close(&mut self) -> bool {
        self.closed = true;
        self.pending_topic = None;
        let was_polling = self.session.take().is_some_and(|s| s.polling);
        self.mark_dirty();
        was_polling
    }

    pub(crate) fn session(&self) -> Option<&JobSession> {
        self.session.as_ref()
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut JobSession> {
        self.session.as_mut()
    }

    /// Session for `job_id`, if it is the one displayed.
    pub(crate) fn session_for(&mut self, job_id: &str) -> Option<&mut JobSession> {
        self.session.as_mut().filter(|s| s.job_id == job_id)
    }

    pub(crate) fn apply_report(&mut self, report: StatusReport) -> Option<String> {
        let session = self.session.as_mut()?;
        session.fetch_in_flight = false;
        let newly_terminal = session.apply_report(report);
        self.mark_dirty();
        newly_terminal
    }

    pub(crate) fn apply_fetch_error(&mut self, error: String) {
        if let Some(session) = self.session.as_mut() {
            session.fetch_in_flight = false;
            session.last_error = Some(error);
            self.mark_dirty();
        }
    }

    pub(crate) fn set_download(&mut self, download: DownloadState) {
        if let Some(session) = self.session.as_mut() {
            session.download = download;
            self.mark_dirty();
        }
    }
}
