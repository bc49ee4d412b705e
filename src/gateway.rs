use std::num::NonZeroU32;

use async_trait::async_trait;
use log::*;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use crate::config::SourceConfig;
use crate::model::source::SourcePage;
use crate::model::user::UserRecord;

/// Longest slice of a failing response body kept in the error message.
const BODY_PREVIEW_CHARS: usize = 200;

/// The only failure a fetch can surface. Every variant is recoverable:
/// re-issuing the same request is a safe, idempotent read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("request to user source failed: {message}")]
    Transport { message: String },
    #[error("user source answered with status {status}{}", preview(.body))]
    Status { status: u16, body: String },
    #[error("user source sent an unreadable page: {message}")]
    Decode { message: String },
}

fn preview(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

/// One page worth of records, starting at cursor 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: NonZeroU32,
    pub size: usize,
}

impl PageRequest {
    pub fn first(size: usize) -> Self {
        PageRequest {
            cursor: NonZeroU32::MIN,
            size,
        }
    }
}

/// Where pages of user records come from.
///
/// Implementations must not touch directory state; applying the batch is the
/// caller's job. A batch shorter than `request.size` is a normal answer.
#[async_trait]
pub trait FetchGateway: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<UserRecord>, NetworkError>;
}

/// Reads pages over HTTP: `GET <endpoint>?results=<size>&page=<cursor>`.
pub struct HttpGateway {
    client: Client,
    endpoint: Url,
    seed: Option<String>,
}

impl HttpGateway {
    pub fn new(config: SourceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(HttpGateway {
            client,
            endpoint: config.endpoint,
            seed: config.seed,
        })
    }

    pub fn page_url(&self, request: &PageRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("results", &request.size.to_string())
                .append_pair("page", &request.cursor.to_string());
            if let Some(seed) = &self.seed {
                query.append_pair("seed", seed);
            }
        }
        url
    }
}

#[async_trait]
impl FetchGateway for HttpGateway {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<UserRecord>, NetworkError> {
        let url = self.page_url(request);
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let page: SourcePage = serde_json::from_slice(&body).map_err(|e| NetworkError::Decode {
            message: e.to_string(),
        })?;
        Ok(page.into_records())
    }
}

fn transport_error(error: reqwest::Error) -> NetworkError {
    NetworkError::Transport {
        message: error.to_string(),
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> NetworkError {
    let body: String = String::from_utf8_lossy(body)
        .trim()
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect();
    NetworkError::Status {
        status: status.as_u16(),
        body,
    }
}
