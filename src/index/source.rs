//! File sources for index artifacts.
//!
//! An index is a manifest plus sibling files. The manifest may live on the
//! local filesystem or behind a static HTTP server; every file reference
//! inside it is resolved relative to the manifest's own location.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;

/// Where an index artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Path(PathBuf),
    Url(Url),
}

impl Location {
    /// Parses a user-supplied path or `http(s)://` URL.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        if is_http(raw) {
            let url = Url::parse(raw).map_err(|e| SourceError::InvalidLocation {
                reference: raw.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Self::Url(url))
        } else {
            Ok(Self::Path(PathBuf::from(raw)))
        }
    }

    /// Resolves a file reference found inside a manifest against this location.
    ///
    /// Absolute URLs and absolute paths are used verbatim; anything else is
    /// taken relative to the directory containing `self`.
    pub fn resolve(&self, reference: &str) -> Result<Self, SourceError> {
        if is_http(reference) {
            return Self::parse(reference);
        }
        match self {
            Self::Url(base) => base
                .join(reference)
                .map(Self::Url)
                .map_err(|e| SourceError::InvalidLocation {
                    reference: reference.to_string(),
                    reason: e.to_string(),
                }),
            Self::Path(base) => {
                let reference_path = Path::new(reference);
                if reference_path.is_absolute() {
                    Ok(Self::Path(reference_path.to_path_buf()))
                } else {
                    let dir = base.parent().unwrap_or_else(|| Path::new(""));
                    Ok(Self::Path(dir.join(reference_path)))
                }
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

fn is_http(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

/// Errors raised while fetching an artifact.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read '{location}': {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },

    #[error("HTTP {status} while fetching '{location}'\nSuggestion: Check that the index files were published next to the manifest")]
    Status { location: String, status: u16 },

    #[error("Failed to fetch '{location}': {reason}")]
    Http { location: String, reason: String },

    #[error("Invalid file reference '{reference}': {reason}")]
    InvalidLocation { reference: String, reason: String },

    #[error("Source cannot serve '{location}'")]
    Unsupported { location: String },

    #[error("Fetch task failed: {0}")]
    Task(String),
}

/// Read-only access to index artifacts.
#[async_trait]
pub trait IndexSource: Send + Sync + fmt::Debug {
    /// Fetches the full contents of an artifact.
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, SourceError>;
}

/// Local filesystem source backed by `tokio::fs`.
#[derive(Debug, Default, Clone)]
pub struct FsSource;

#[async_trait]
impl IndexSource for FsSource {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, SourceError> {
        let Location::Path(path) = location else {
            return Err(SourceError::Unsupported {
                location: location.to_string(),
            });
        };
        let bytes = tokio::fs::read(path).await.map_err(|source| SourceError::Io {
            location: location.to_string(),
            source,
        })?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }
}

/// Static-file HTTP source.
///
/// `ureq` is blocking, so every request runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct HttpSource {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpSource {
    #[must_use]
    pub fn new(timeout: Duration, max_body_bytes: u64) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            max_body_bytes,
        }
    }

    fn get_blocking(
        agent: &ureq::Agent,
        url: &Url,
        max_body_bytes: u64,
    ) -> Result<Vec<u8>, SourceError> {
        debug!("Making HTTP GET request to: {}", url);
        match agent.get(url.as_str()).call() {
            Ok(mut response) => response
                .body_mut()
                .with_config()
                .limit(max_body_bytes)
                .read_to_vec()
                .map_err(|e| SourceError::Http {
                    location: url.to_string(),
                    reason: e.to_string(),
                }),
            Err(ureq::Error::StatusCode(status)) => Err(SourceError::Status {
                location: url.to_string(),
                status,
            }),
            Err(e) => Err(SourceError::Http {
                location: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        let config = FetchConfig::default();
        Self::new(Duration::from_secs(config.timeout_secs), config.max_body_bytes)
    }
}

#[async_trait]
impl IndexSource for HttpSource {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, SourceError> {
        let Location::Url(url) = location else {
            return Err(SourceError::Unsupported {
                location: location.to_string(),
            });
        };
        let agent = self.agent.clone();
        let url = url.clone();
        let limit = self.max_body_bytes;
        tokio::task::spawn_blocking(move || Self::get_blocking(&agent, &url, limit))
            .await
            .map_err(|e| SourceError::Task(e.to_string()))?
    }
}

/// Dispatches paths to [`FsSource`] and URLs to [`HttpSource`].
#[derive(Debug, Clone)]
pub struct StaticFileSource {
    fs: FsSource,
    http: HttpSource,
}

impl StaticFileSource {
    #[must_use]
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            fs: FsSource,
            http: HttpSource::new(
                Duration::from_secs(config.timeout_secs),
                config.max_body_bytes,
            ),
        }
    }
}

#[async_trait]
impl IndexSource for StaticFileSource {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, SourceError> {
        match location {
            Location::Path(_) => self.fs.fetch(location).await,
            Location::Url(_) => self.http.fetch(location).await,
        }
    }
}

/// Builds the default source for the given fetch settings.
#[must_use]
pub fn open_source(config: &FetchConfig) -> Arc<dyn IndexSource> {
    Arc::new(StaticFileSource::new(config))
}
