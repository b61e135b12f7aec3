// HTTP backend for a registry gateway that answers queries with JSON pages
use crate::backend::{BackendError, RawResultPage, SearchBackend};
use crate::config::CheckerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &CheckerConfig) -> Result<Self> {
        let base_url = config.require_base_url()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("tmcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(&self, query: &str) -> Result<RawResultPage, reqwest::Error> {
        self.client
            .get(&self.base_url)
            .query(&[("q", query)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<RawResultPage>()
            .await
    }

    fn request_error(query: &str, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                query: query.to_string(),
            }
        } else if let Some(status) = err.status() {
            BackendError::Status {
                query: query.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            BackendError::Decode {
                query: query.to_string(),
                message: err.to_string(),
            }
        } else {
            BackendError::Request {
                query: query.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    /// Sends an empty query and requires a decodable result page back, so an
    /// endpoint that is reachable but not a gateway fails here once.
    async fn connect(&self) -> Result<(), BackendError> {
        debug!("Connecting to registry gateway at {}", self.base_url);
        self.fetch_page("").await.map(|_| ()).map_err(|e| {
            let message = if e.is_decode() {
                format!("response is not a JSON result page ({})", e)
            } else {
                e.to_string()
            };
            BackendError::Connect {
                url: self.base_url.clone(),
                message,
            }
        })
    }

    async fn search(&self, query: &str) -> Result<RawResultPage, BackendError> {
        debug!("Querying registry for '{}'", query);
        self.fetch_page(query)
            .await
            .map_err(|e| Self::request_error(query, e))
    }
}
