use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use scout_logging::{scout_info, scout_warn};
use serde::{Deserialize, Serialize};

use crate::fetch::{map_reqwest_error, FetchSettings, HttpSearchClient, SearchClient};
use crate::persist::AtomicFileWriter;
use crate::{FailureKind, ScrapeError, UpstreamError};

/// Hands out an authenticated [`SearchClient`].
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    type Client: SearchClient;

    async fn establish(&self) -> Result<Self::Client, ScrapeError>;
}

/// The three opaque login values.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub auth_info_1: String,
    pub auth_info_2: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        auth_info_1: impl Into<String>,
        auth_info_2: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            auth_info_1: auth_info_1.into(),
            auth_info_2: auth_info_2.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.auth_info_1, &self.auth_info_2, &self.password]
            .iter()
            .all(|value| !value.trim().is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_info_1", &self.auth_info_1)
            .field("auth_info_2", &self.auth_info_2)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub token: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    auth_info_1: &'a str,
    auth_info_2: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Reuses a cached session token when one is on disk, otherwise logs in with
/// credentials and caches the new token.
#[derive(Debug, Clone)]
pub struct HttpSessionProvider {
    settings: FetchSettings,
    credentials: Option<Credentials>,
    cache_path: PathBuf,
}

impl HttpSessionProvider {
    pub fn new(
        settings: FetchSettings,
        credentials: Option<Credentials>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            credentials,
            cache_path: cache_path.into(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn load_cached(&self) -> Option<CachedSession> {
        let content = match fs::read_to_string(&self.cache_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                scout_warn!("Error loading session from {:?}: {}", self.cache_path, err);
                return None;
            }
        };
        match serde_json::from_str::<CachedSession>(&content) {
            Ok(session) if !session.token.trim().is_empty() => Some(session),
            Ok(_) => {
                scout_warn!("Cached session in {:?} has an empty token", self.cache_path);
                None
            }
            Err(err) => {
                scout_warn!("Error parsing session from {:?}: {}", self.cache_path, err);
                None
            }
        }
    }

    fn save_cached(&self, session: &CachedSession) -> Result<(), ScrapeError> {
        let filename = self
            .cache_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ScrapeError::Configuration(format!(
                    "session cache path {:?} has no file name",
                    self.cache_path
                ))
            })?;
        AtomicFileWriter::for_path(&self.cache_path).write_json(filename, session)?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<CachedSession, ScrapeError> {
        let client = self.settings.build_client()?;
        let url = self.settings.endpoint("login")?;
        let response = client
            .post(url)
            .json(&LoginRequest {
                auth_info_1: &credentials.auth_info_1,
                auth_info_2: &credentials.auth_info_2,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::BAD_REQUEST
        {
            return Err(ScrapeError::Authentication(format!(
                "login rejected: {status}"
            )));
        }
        if !status.is_success() {
            return Err(UpstreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            )
            .into());
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: LoginResponse = serde_json::from_slice(&body)
            .map_err(|err| UpstreamError::new(FailureKind::MalformedResponse, err.to_string()))?;
        if parsed.token.trim().is_empty() {
            return Err(ScrapeError::Authentication(
                "login response carried an empty token".to_string(),
            ));
        }
        Ok(CachedSession {
            token: parsed.token,
        })
    }
}

#[async_trait::async_trait]
impl SessionProvider for HttpSessionProvider {
    type Client = HttpSearchClient;

    async fn establish(&self) -> Result<HttpSearchClient, ScrapeError> {
        if let Some(session) = self.load_cached() {
            scout_info!("Loaded existing session from {:?}", self.cache_path);
            return Ok(HttpSearchClient::new(self.settings.clone(), session.token)?);
        }

        let credentials = self
            .credentials
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or_else(|| {
                ScrapeError::Configuration(
                    "credentials not found and no cached session available".to_string(),
                )
            })?;

        let session = self.login(credentials).await?;
        if let Err(err) = self.save_cached(&session) {
            scout_warn!("Could not cache session at {:?}: {}", self.cache_path, err);
        } else {
            scout_info!("Logged in and saved session to {:?}", self.cache_path);
        }
        Ok(HttpSearchClient::new(self.settings.clone(), session.token)?)
    }
}
