//! One-shot commands: everything that does not need the live job view.

use std::future::Future;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use research_core::download_reference;
use research_engine::{safe_filename, ArxivPaper, AtomicFileWriter, ReqwestApi, ResearchApi};
use research_logging::research_info;

use super::persistence::{self, JobRecord};
use crate::cli::ClientConfig;

/// Characters of an arXiv summary shown per result.
const SUMMARY_CHARS: usize = 300;

fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

fn api(config: &ClientConfig) -> anyhow::Result<ReqwestApi> {
    ReqwestApi::new(config.api.clone()).map_err(|err| anyhow!("{}: {}", err.kind, err.message))
}

pub fn health(config: &ClientConfig) -> anyhow::Result<()> {
    let api = api(config)?;
    let report = block_on(api.health())?;
    let message = report.message.as_deref().unwrap_or("");
    println!("{}: {} {}", config.api.base(), report.status, message);
    if !report.is_ok() {
        bail!("research service is not healthy");
    }
    Ok(())
}

pub fn search(config: &ClientConfig, query: &str, limit: u32) -> anyhow::Result<()> {
    let api = api(config)?;
    let papers = block_on(api.search_arxiv(query, limit))??;
    if papers.is_empty() {
        println!("No papers found.");
    }
    for (index, paper) in papers.iter().enumerate() {
        println!("{}", format_paper(index + 1, paper));
    }
    Ok(())
}

/// Submit a topic without following it.
pub fn start_detached(config: &ClientConfig, topic: &str, filename: &str) -> anyhow::Result<()> {
    let topic = topic.trim();
    if topic.is_empty() {
        bail!("Topic is required");
    }
    let api = api(config)?;
    let job_id = block_on(api.start_job(topic, filename))??;
    persistence::remember_job(
        &config.data_dir,
        JobRecord {
            job_id: job_id.clone(),
            topic: topic.to_string(),
            filename: filename.to_string(),
            started_utc: Utc::now().to_rfc3339(),
        },
    );
    println!("{job_id}");
    Ok(())
}

pub fn download(config: &ClientConfig, filename: &str, out: &Path) -> anyhow::Result<()> {
    let api = api(config)?;
    research_info!(
        "Downloading {}",
        download_reference(config.api.base(), filename)
    );
    let bytes = block_on(api.download(filename))??;
    let path = AtomicFileWriter::new(out.to_path_buf())
        .write(&safe_filename(filename), &bytes)
        .with_context(|| format!("failed to save {filename}"))?;
    println!("Saved to {}", path.display());
    Ok(())
}

pub fn jobs(config: &ClientConfig) -> anyhow::Result<()> {
    let jobs = persistence::load_job_history(&config.data_dir);
    if jobs.is_empty() {
        println!("No jobs started yet.");
    }
    for job in jobs.iter().rev() {
        println!("{}", format_job(job));
    }
    Ok(())
}

/// Job id to resume when `watch` gets none.
pub fn latest_job_id(config: &ClientConfig) -> anyhow::Result<String> {
    persistence::latest_job(&config.data_dir)
        .map(|job| job.job_id)
        .ok_or_else(|| anyhow!("no remembered job in {}; pass a job id", config.data_dir.display()))
}

fn format_paper(number: usize, paper: &ArxivPaper) -> String {
    let mut text = format!("{number}. {}", paper.title.trim());
    if !paper.authors.is_empty() {
        text.push_str(&format!("\n   {}", paper.authors.join(", ")));
    }
    if !paper.published.is_empty() {
        text.push_str(&format!("\n   Published {}", paper.published));
    }
    if !paper.url.is_empty() {
        text.push_str(&format!("\n   {}", paper.url));
    }
    let summary = paper.summary.trim();
    if !summary.is_empty() {
        text.push_str(&format!("\n   {}", truncate_summary(summary)));
    }
    text
}

fn truncate_summary(summary: &str) -> String {
    match summary.char_indices().nth(SUMMARY_CHARS) {
        Some((cut, _)) => format!("{}...", &summary[..cut]),
        None => summary.to_string(),
    }
}

fn format_job(job: &JobRecord) -> String {
    format!(
        "{}  {}  {}  {}",
        job.job_id, job.started_utc, job.filename, job.topic
    )
}
