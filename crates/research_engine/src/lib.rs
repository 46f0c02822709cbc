//! Research engine: HTTP client for the research-job service and effect
//! execution.
mod client;
mod engine;
mod filename;
mod persist;
mod types;

pub use client::{
    ApiSettings, ReqwestApi, ResearchApi, DEFAULT_API_BASE, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
pub use engine::{
    ChannelEventSink, EngineConfig, EngineError, EngineHandle, EventSink, DEFAULT_POLL_INTERVAL,
};
pub use filename::{safe_filename, FALLBACK_FILENAME};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{
    ApiError, ArxivPaper, DownloadError, EngineEvent, FailureKind, HealthReport, JobId, JobStatus,
    UpdateRecord,
};
