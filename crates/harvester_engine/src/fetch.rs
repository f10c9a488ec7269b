use std::time::Duration;

use bytes::{Bytes, BytesMut};
use engine_logging::{engine_debug, engine_trace};
use futures_util::StreamExt;
use harvester_core::{HttpMethod, TableName};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};

use crate::{EngineEvent, FailureKind, HarvestError, Stage};

/// Portal endpoints only answer browser-looking clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0 OS/10.0.22621";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Upper bound on pages followed for one paginated target.
    pub max_pages: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            redirect_limit: 5,
            max_bytes: 64 * 1024 * 1024,
            max_pages: 10_000,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// One authenticated request against the harvest source.
#[derive(Debug, Clone, Copy)]
pub struct SourceRequest<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub body: Option<&'a str>,
    pub bearer_token: &'a str,
}

impl<'a> SourceRequest<'a> {
    pub fn get(url: &'a str, bearer_token: &'a str) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            body: None,
            bearer_token,
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the full body of a 2xx response.
    async fn fetch(&self, request: &SourceRequest<'_>) -> Result<Bytes, HarvestError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, HarvestError> {
        let client = build_client(&settings, false, Stage::Fetching)?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &SourceRequest<'_>) -> Result<Bytes, HarvestError> {
        engine_trace!("{:?} {}", request.method, request.url);
        let url = reqwest::Url::parse(request.url).map_err(|err| {
            HarvestError::new(Stage::Fetching, FailureKind::InvalidUrl, err.to_string())
        })?;

        let builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self
                .client
                .post(url)
                .body(request.body.unwrap_or_default().to_string()),
        };

        let response = builder
            .header(AUTHORIZATION, format!("Bearer {}", request.bearer_token))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, Stage::Fetching))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::new(
                Stage::Fetching,
                FailureKind::HttpStatus(status.as_u16()),
                format!("{} returned {status}", request.url),
            ));
        }

        read_body(response, self.settings.max_bytes, Stage::Fetching).await
    }
}

pub(crate) fn build_client(
    settings: &FetchSettings,
    accept_invalid_certs: bool,
    stage: Stage,
) -> Result<reqwest::Client, HarvestError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|err| HarvestError::new(stage, FailureKind::Transport, err.to_string()))
}

/// Streams the body, failing as soon as it exceeds `max_bytes`.
pub(crate) async fn read_body(
    response: reqwest::Response,
    max_bytes: u64,
    stage: Stage,
) -> Result<Bytes, HarvestError> {
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(too_large(stage, max_bytes, content_len));
        }
    }

    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| map_reqwest_error(err, stage))?;
        let next_len = body.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(too_large(stage, max_bytes, next_len));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn too_large(stage: Stage, max_bytes: u64, actual: u64) -> HarvestError {
    HarvestError::new(
        stage,
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

/// Dumps a source response pretty-printed when debug logging is on.
pub(crate) fn log_body(table: TableName, body: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let pretty = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    engine_debug!("{table} response:\n{pretty}");
}

pub(crate) fn map_reqwest_error(err: reqwest::Error, stage: Stage) -> HarvestError {
    if err.is_timeout() {
        return HarvestError::new(stage, FailureKind::Timeout, err.to_string());
    }
    HarvestError::new(stage, FailureKind::Transport, err.to_string())
}
