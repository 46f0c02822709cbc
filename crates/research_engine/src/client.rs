use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, Url};
use research_logging::{research_debug, research_warn};
use serde::de::DeserializeOwned;

use crate::types::{ArxivSearchResponse, ErrorBody, StartRequest, StartResponse};
use crate::{ApiError, ArxivPaper, FailureKind, HealthReport, JobId, JobStatus};

/// Origin used when no base URL is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

pub const DEFAULT_SEARCH_LIMIT: u32 = 3;
pub const MAX_SEARCH_LIMIT: u32 = 20;

const START_FAILED: &str = "Failed to start research job";
const STATUS_FAILED: &str = "Failed to get job status";
const SEARCH_FAILED: &str = "Failed to search arXiv";
const DOWNLOAD_FAILED: &str = "Failed to download file";
const NOT_RESPONDING: &str = "API is not responding";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Scheme, host and optional path prefix every API route is joined onto.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_download_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ApiSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Base URL without a trailing slash, as used for display links.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// HTTP contract of the research-job service.
#[async_trait::async_trait]
pub trait ResearchApi: Send + Sync {
    async fn start_job(&self, topic: &str, filename: &str) -> Result<JobId, ApiError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError>;

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ApiError>;

    async fn search_arxiv(&self, query: &str, limit: u32) -> Result<Vec<ArxivPaper>, ApiError>;

    /// Never fails: transport problems are reported as an `error` status.
    async fn health(&self) -> HealthReport;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    settings: ApiSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base = Url::parse(settings.base())
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as an API base", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    /// Join path segments onto the base, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::new(FailureKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, fallback))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| fallback.to_string());
        research_debug!("Request failed with {}: {}", status, message);
        Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            message,
        ))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(request, fallback).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(err, fallback))?;
        serde_json::from_slice(&body).map_err(|err| {
            research_warn!("Malformed response body: {}", err);
            ApiError::new(FailureKind::Decode, fallback)
        })
    }
}

#[async_trait::async_trait]
impl ResearchApi for ReqwestApi {
    async fn start_job(&self, topic: &str, filename: &str) -> Result<JobId, ApiError> {
        let url = self.endpoint(&["api", "start"])?;
        let body = serde_json::to_vec(&StartRequest { topic, filename })
            .map_err(|err| ApiError::new(FailureKind::InvalidInput, err.to_string()))?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);

        let response: StartResponse = self.send_json(request, START_FAILED).await?;
        Ok(response.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let url = self.endpoint(&["api", "status", job_id])?;
        self.send_json(self.client.get(url), STATUS_FAILED).await
    }

    async fn download(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["api", "download", filename])?;
        let response = self.send(self.client.get(url), DOWNLOAD_FAILED).await?;
        let max_bytes = self.settings.max_download_bytes;

        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "file too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(err, DOWNLOAD_FAILED))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "file too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        research_debug!("Downloaded {} ({} bytes)", filename, bytes.len());
        Ok(bytes)
    }

    async fn search_arxiv(&self, query: &str, limit: u32) -> Result<Vec<ArxivPaper>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::new(
                FailureKind::InvalidInput,
                "Search query is required",
            ));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let mut url = self.endpoint(&["api", "test", "arxiv"])?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string());

        let response: ArxivSearchResponse =
            self.send_json(self.client.get(url), SEARCH_FAILED).await?;
        Ok(response.results)
    }

    async fn health(&self) -> HealthReport {
        let request = match self.endpoint(&["api", "health"]) {
            Ok(url) => self.client.get(url),
            Err(err) => return not_responding(&err),
        };
        match self.send_json(request, NOT_RESPONDING).await {
            Ok(report) => report,
            Err(err) => not_responding(&err),
        }
    }
}

fn not_responding(err: &ApiError) -> HealthReport {
    research_warn!("Health check failed: {} ({})", err.message, err.kind);
    HealthReport {
        status: "error".to_string(),
        message: Some(NOT_RESPONDING.to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error, fallback: &str) -> ApiError {
    research_debug!("Transport error: {}", err);
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, fallback);
    }
    ApiError::new(FailureKind::Network, fallback)
}
