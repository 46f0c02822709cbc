use std::fs;
use std::path::{Path, PathBuf};

use research_engine::AtomicFileWriter;
use research_logging::{research_error, research_info, research_warn};
use serde::{Deserialize, Serialize};

const HISTORY_FILENAME: &str = ".research_jobs.ron";
const MAX_HISTORY: usize = 50;

/// A job started from this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub topic: String,
    pub filename: String,
    pub started_utc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedHistory {
    jobs: Vec<JobRecord>,
}

/// Load the job history, oldest first. Missing or unreadable files yield an
/// empty history.
pub(crate) fn load_job_history(data_dir: &Path) -> Vec<JobRecord> {
    let path = data_dir.join(HISTORY_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            research_warn!("Failed to read job history from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    match ron::from_str::<PersistedHistory>(&content) {
        Ok(history) => history.jobs,
        Err(err) => {
            research_warn!("Failed to parse job history from {:?}: {}", path, err);
            Vec::new()
        }
    }
}

pub(crate) fn save_job_history(data_dir: &Path, jobs: &[JobRecord]) {
    let state = PersistedHistory {
        jobs: jobs.to_vec(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            research_error!("Failed to serialize job history: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(data_dir));
    if let Err(err) = writer.write(HISTORY_FILENAME, content.as_bytes()) {
        research_error!("Failed to write job history to {:?}: {}", data_dir, err);
    }
}

/// Append a job to the history, keeping only the newest entries.
pub(crate) fn remember_job(data_dir: &Path, record: JobRecord) {
    let mut jobs = load_job_history(data_dir);
    jobs.retain(|job| job.job_id != record.job_id);
    research_info!("Remembering job {} in {:?}", record.job_id, data_dir);
    jobs.push(record);
    if jobs.len() > MAX_HISTORY {
        let excess = jobs.len() - MAX_HISTORY;
        jobs.drain(..excess);
    }
    save_job_history(data_dir, &jobs);
}

pub(crate) fn latest_job(data_dir: &Path) -> Option<JobRecord> {
    load_job_history(data_dir).pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(job_id: &str) -> JobRecord {
        JobRecord {
            job_id: job_id.to_string(),
            topic: format!("topic {job_id}"),
            filename: "research_paper.pdf".to_string(),
            started_utc: "2026-10-18T12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn missing_history_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(load_job_history(temp.path()).is_empty());
        assert_eq!(latest_job(temp.path()), None);
    }

    #[test]
    fn remembered_jobs_round_trip_newest_last() {
        let temp = TempDir::new().unwrap();
        remember_job(temp.path(), record("1"));
        remember_job(temp.path(), record("2"));

        let jobs = load_job_history(temp.path());
        assert_eq!(jobs, vec![record("1"), record("2")]);
        assert_eq!(latest_job(temp.path()), Some(record("2")));
    }

    #[test]
    fn re_remembering_moves_job_to_the_end() {
        let temp = TempDir::new().unwrap();
        remember_job(temp.path(), record("1"));
        remember_job(temp.path(), record("2"));
        remember_job(temp.path(), record("1"));

        let ids: Vec<_> = load_job_history(temp.path())
            .into_iter()
            .map(|job| job.job_id)
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn history_is_capped() {
        let temp = TempDir::new().unwrap();
        for i in 0..(MAX_HISTORY + 5) {
            remember_job(temp.path(), record(&i.to_string()));
        }

        let jobs = load_job_history(temp.path());
        assert_eq!(jobs.len(), MAX_HISTORY);
        assert_eq!(jobs[0].job_id, "5");
    }

    #[test]
    fn corrupt_history_is_treated_as_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(HISTORY_FILENAME), "not ron at all (").unwrap();

        assert!(load_job_history(temp.path()).is_empty());
    }
}
