use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::extract::PostItem;
use crate::{FailureKind, Page, PageCursor, SortMode, UpstreamError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl FetchSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<reqwest::Url, UpstreamError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        reqwest::Url::parse(&raw)
            .map_err(|err| UpstreamError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client, UpstreamError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|err| UpstreamError::new(FailureKind::Network, err.to_string()))
    }
}

/// Issues search and continuation requests for one authenticated session.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    type Item: Send;

    async fn search(
        &self,
        keyword: &str,
        sort: SortMode,
    ) -> Result<Page<Self::Item>, UpstreamError>;

    async fn next_page(&self, cursor: &PageCursor) -> Result<Page<Self::Item>, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<PostItem>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// JSON search API client authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    settings: FetchSettings,
    client: reqwest::Client,
    token: String,
}

impl HttpSearchClient {
    pub fn new(settings: FetchSettings, token: impl Into<String>) -> Result<Self, UpstreamError> {
        let client = settings.build_client()?;
        Ok(Self {
            settings,
            client,
            token: token.into(),
        })
    }

    async fn get_page(&self, url: reqwest::Url) -> Result<Page<PostItem>, UpstreamError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: SearchResponse = serde_json::from_slice(&body)
            .map_err(|err| UpstreamError::new(FailureKind::MalformedResponse, err.to_string()))?;

        let cursor = parsed
            .next_cursor
            .filter(|c| !c.trim().is_empty())
            .map(PageCursor::new);
        Ok(Page::new(parsed.items, cursor))
    }
}

#[async_trait::async_trait]
impl SearchClient for HttpSearchClient {
    type Item = PostItem;

    async fn search(&self, keyword: &str, sort: SortMode) -> Result<Page<PostItem>, UpstreamError> {
        let mut url = self.settings.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("q", keyword)
            .append_pair("product", sort.as_str());
        self.get_page(url).await
    }

    async fn next_page(&self, cursor: &PageCursor) -> Result<Page<PostItem>, UpstreamError> {
        let mut url = self.settings.endpoint("search")?;
        url.query_pairs_mut().append_pair("cursor", cursor.as_str());
        self.get_page(url).await
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        return UpstreamError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return UpstreamError::new(FailureKind::MalformedResponse, err.to_string());
    }
    UpstreamError::new(FailureKind::Network, err.to_string())
}
