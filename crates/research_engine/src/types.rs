use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::persist::PersistError;

/// Opaque job identifier handed out by the service.
pub type JobId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StartRequest<'a> {
    pub topic: &'a str,
    pub filename: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct StartResponse {
    pub job_id: JobId,
}

/// Body of `GET /api/status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub updates: Vec<UpdateRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UpdateRecord {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArxivPaper {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub(crate) struct ArxivSearchResponse {
    #[serde(default)]
    pub results: Vec<ArxivPaper>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Error payload the service attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// A failed call, reduced to a display message plus its classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidInput,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidInput => write!(f, "invalid input"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "malformed response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to save download: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug)]
pub enum EngineEvent {
    JobStarted(Result<JobId, ApiError>),
    StatusFetched {
        job_id: JobId,
        result: Result<JobStatus, ApiError>,
    },
    /// The poll timer for `job_id` fired.
    PollDue { job_id: JobId },
    DownloadCompleted {
        filename: String,
        result: Result<PathBuf, DownloadError>,
    },
}
