#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartJob {
        topic: String,
        filename: String,
    },
    FetchStatus {
        job_id: crate::JobId,
    },
    StartPolling {
        job_id: crate::JobId,
    },
    StopPolling,
    /// Record a freshly started job so it can be resumed later.
    RememberJob {
        job_id: crate::JobId,
        topic: String,
        filename: String,
    },
    /// A terminal update arrived; the link is ready to show.
    DownloadReady {
        job_id: crate::JobId,
        filename: String,
        url: String,
    },
    DownloadFile {
        filename: String,
    },
}
