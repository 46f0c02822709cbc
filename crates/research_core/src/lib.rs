//! Research client core: pure state machine and view-model helpers.
mod download;
mod effect;
mod msg;
mod stage;
mod state;
mod update;
mod view_model;

pub use download::{download_reference, DEFAULT_OUTPUT_FILENAME, DOWNLOAD_ROUTE};
pub use effect::Effect;
pub use msg::Msg;
pub use stage::{classify_message, Stage, StageColor};
pub use state::{AppState, DownloadState, JobId, SessionOptions, StatusReport, StatusUpdate};
pub use update::update;
pub use view_model::{AppViewModel, JobBadge, JobView, StageMarker, StageRowView};
