use crate::{DownloadState, JobId, Stage};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub topic: String,
    pub output_filename: String,
    pub start_pending: bool,
    /// Last start-request failure.
    pub error: Option<String>,
    pub job: Option<JobView>,
    pub closed: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job_id: JobId,
    pub transcript: Vec<String>,
    pub stage: Stage,
    pub stages: Vec<StageRowView>,
    /// `None` until the first successful status fetch.
    pub badge: Option<JobBadge>,
    pub output_file: Option<String>,
    pub download_url: Option<String>,
    pub auto_refresh: bool,
    pub polling: bool,
    pub refreshing: bool,
    /// Last status-fetch failure; cleared by the next successful fetch.
    pub error: Option<String>,
    pub download: DownloadState,
    /// Terminal update seen and no download outstanding.
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRowView {
    pub stage: Stage,
    pub marker: StageMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMarker {
    Done,
    Current,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobBadge {
    Running,
    Complete,
    Error,
}
