use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the topic input.
    TopicChanged(String),
    /// User picked the output filename sent with the next start request.
    FilenameChanged(String),
    /// User submitted the current topic.
    TopicSubmitted,
    /// Start request resolved: the new job id, or a display error.
    JobStarted(Result<crate::JobId, String>),
    /// Display an existing job without submitting a topic.
    JobOpened(crate::JobId),
    /// Poll timer fired for a job.
    PollTick { job_id: crate::JobId },
    /// User asked for a status fetch now.
    RefreshClicked,
    /// User flipped the auto-refresh switch.
    AutoRefreshToggled,
    /// Status fetch resolved.
    StatusFetched {
        job_id: crate::JobId,
        result: Result<crate::StatusReport, String>,
    },
    /// Download of the generated file resolved.
    DownloadFinished {
        filename: String,
        result: Result<PathBuf, String>,
    },
    /// The job view is being torn down.
    ViewClosed,
    /// Render tick.
    Tick,
}
