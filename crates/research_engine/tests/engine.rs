use std::fs;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use research_engine::{
    ApiError, ArxivPaper, ChannelEventSink, DownloadError, EngineConfig, EngineEvent,
    EngineHandle, HealthReport, JobId, JobStatus, ResearchApi, UpdateRecord,
};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(2);

struct FakeApi;

#[async_trait::async_trait]
impl ResearchApi for FakeApi {
    async fn start_job(&self, topic: &str, _filename: &str) -> Result<JobId, ApiError> {
        Ok(format!("job-{}", topic.len()))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        Ok(JobStatus {
            active: true,
            updates: vec![UpdateRecord {
                message: Some(format!("Drafting {job_id}")),
                status: Some("running".to_string()),
                output_file: None,
            }],
        })
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        Ok(format!("contents of {filename}").into_bytes())
    }

    async fn search_arxiv(&self, _query: &str, _limit: u32) -> Result<Vec<ArxivPaper>, ApiError> {
        Ok(Vec::new())
    }

    async fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            message: None,
        }
    }
}

fn engine(output_dir: &TempDir, poll_interval: Duration) -> (EngineHandle, mpsc::Receiver<EngineEvent>) {
    let (tx, rx) = mpsc::channel();
    let config = EngineConfig {
        poll_interval,
        ..EngineConfig::default_with_output(output_dir.path().to_path_buf())
    };
    let handle = EngineHandle::with_api(
        config,
        Arc::new(FakeApi),
        Arc::new(ChannelEventSink::new(tx)),
    )
    .expect("engine starts");
    (handle, rx)
}

#[test]
fn start_and_fetch_report_results() {
    let temp = TempDir::new().unwrap();
    let (engine, events) = engine(&temp, Duration::from_secs(60));

    engine.start_job("graphs", "paper.pdf");
    match events.recv_timeout(WAIT).unwrap() {
        EngineEvent::JobStarted(Ok(job_id)) => assert_eq!(job_id, "job-6"),
        other => panic!("unexpected event {other:?}"),
    }

    engine.fetch_status("job-6");
    match events.recv_timeout(WAIT).unwrap() {
        EngineEvent::StatusFetched { job_id, result } => {
            assert_eq!(job_id, "job-6");
            let status = result.unwrap();
            assert!(status.active);
            assert_eq!(status.updates[0].message.as_deref(), Some("Drafting job-6"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn poll_timer_ticks_until_stopped() {
    let temp = TempDir::new().unwrap();
    let (engine, events) = engine(&temp, Duration::from_millis(20));

    engine.start_polling("42");
    for _ in 0..3 {
        match events.recv_timeout(WAIT).unwrap() {
            EngineEvent::PollDue { job_id } => assert_eq!(job_id, "42"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    engine.stop_polling();
    thread::sleep(Duration::from_millis(60));
    while events.try_recv().is_ok() {}

    assert!(events.recv_timeout(Duration::from_millis(150)).is_err());
}

#[test]
fn restarting_timer_replaces_previous_job() {
    let temp = TempDir::new().unwrap();
    let (engine, events) = engine(&temp, Duration::from_millis(20));

    engine.start_polling("old");
    engine.start_polling("new");
    thread::sleep(Duration::from_millis(10));
    while events.try_recv().is_ok() {}

    for _ in 0..3 {
        match events.recv_timeout(WAIT).unwrap() {
            EngineEvent::PollDue { job_id } => assert_eq!(job_id, "new"),
            other => panic!("unexpected event {other:?}"),
        }
    }
    engine.stop_polling();
}

#[test]
fn download_saves_into_output_dir_under_safe_name() {
    let temp = TempDir::new().unwrap();
    let (engine, events) = engine(&temp, Duration::from_secs(60));

    engine.download("../paper.pdf");
    match events.recv_timeout(WAIT).unwrap() {
        EngineEvent::DownloadCompleted { filename, result } => {
            assert_eq!(filename, "../paper.pdf");
            let path = result.unwrap();
            assert_eq!(path, temp.path().join("paper.pdf"));
            assert_eq!(fs::read_to_string(path).unwrap(), "contents of ../paper.pdf");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn download_into_unusable_dir_reports_persist_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "x").unwrap();

    let (tx, events) = mpsc::channel();
    let engine = EngineHandle::with_api(
        EngineConfig::default_with_output(blocker),
        Arc::new(FakeApi),
        Arc::new(ChannelEventSink::new(tx)),
    )
    .unwrap();

    engine.download("paper.pdf");
    match events.recv_timeout(WAIT).unwrap() {
        EngineEvent::DownloadCompleted { result, .. } => {
            assert!(matches!(result, Err(DownloadError::Persist(_))));
        }
        other => panic!("unexpected event {other:?}"),
    }
}
