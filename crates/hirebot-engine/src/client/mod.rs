//! Client for the remote job-search API.

pub mod request;
pub mod response;

pub use request::{GraphQlQuery, RequestError, SearchRequestBuilder};
pub use response::JobSearchResponse;

use crate::config::ClientConfig;
use crate::scheduler::JobSource;
use async_trait::async_trait;
use hirebot_common::posting::JobPosting;
use hirebot_common::settings::Settings;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request failed with status {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Parse(String),
    #[error("Invalid search request: {0}")]
    InvalidRequest(#[from] RequestError),
}

impl QueryError {
    /// Network-class failures: transport errors and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, QueryError::Network(_) | QueryError::Status(_))
    }
}

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    token: String,
}

pub struct JobQueryClient {
    http: reqwest::Client,
    config: ClientConfig,
    builder: SearchRequestBuilder,
    token: RwLock<Option<String>>,
}

impl JobQueryClient {
    pub fn new(config: ClientConfig) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            builder: SearchRequestBuilder::new(&config),
            config,
            token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches a fresh session token from the CSRF endpoint and caches it.
    pub async fn fetch_session_token(&self) -> Result<Option<String>, QueryError> {
        let Some(url) = &self.config.csrf_url else {
            return Ok(None);
        };

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let csrf: CsrfResponse =
            serde_json::from_str(&body).map_err(|e| QueryError::Parse(e.to_string()))?;

        debug!("Fetched session token");
        *self.token.write().await = Some(csrf.token.clone());
        Ok(Some(csrf.token))
    }

    async fn session_token(&self) -> Option<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Some(token);
        }
        match self.fetch_session_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not fetch session token, searching without it: {}", e);
                None
            }
        }
    }

    /// Runs one search and returns the first page of postings.
    pub async fn fetch_jobs(&self, settings: &Settings) -> Result<Vec<JobPosting>, QueryError> {
        let today = chrono::Local::now().date_naive();
        let query = self.builder.build(settings, today)?;

        let mut request = self
            .http
            .post(&self.config.search_url)
            .header("accept", "*/*")
            .header("country", &self.config.country)
            .header("iscanary", "false")
            .json(&query);
        if let Some(token) = self.session_token().await {
            request = request.header(
                "authorization",
                format!("Bearer Status|unauthenticated|Session|{}", token),
            );
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                // Token likely expired; fetch a new one next time.
                *self.token.write().await = None;
            }
            return Err(QueryError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: JobSearchResponse =
            serde_json::from_str(&body).map_err(|e| QueryError::Parse(e.to_string()))?;
        let postings = parsed.into_postings().map_err(QueryError::Parse)?;
        debug!("Search returned {} postings", postings.len());
        Ok(postings)
    }
}

#[async_trait]
impl JobSource for JobQueryClient {
    async fn fetch_jobs(&self, settings: &Settings) -> Result<Vec<JobPosting>, QueryError> {
        JobQueryClient::fetch_jobs(self, settings).await
    }
}
