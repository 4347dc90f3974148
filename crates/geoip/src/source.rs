//! Acquisition of raw database bytes.
//!
//! A [`Source`] produces the decompressed bytes of a database, ready to be
//! handed to a [`SnapshotParser`](crate::SnapshotParser). Sources have no
//! side effects: a failed fetch leaves everything as it was.

use {
    async_trait::async_trait,
    bytes::Bytes,
    flate2::read::GzDecoder,
    std::{
        fmt,
        io::{self, Read},
        ops::Deref,
        path::PathBuf,
        sync::Arc,
        time::Duration,
    },
    tracing::{debug, info},
};

/// MaxMind update endpoint. `{edition}` is substituted with the database
/// edition, e.g. `GeoLite2-City`.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://updates.maxmind.com/geoip/databases/{edition}/update";

pub const DEFAULT_EDITION: &str = "GeoLite2-City";

const EDITION_PLACEHOLDER: &str = "{edition}";

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed: status {0}")]
    Unauthorized(u16),

    #[error("invalid response: status {0}")]
    Response(u16),

    #[error("decompression failed: {0}")]
    Decompress(io::Error),

    #[error("empty payload")]
    EmptyPayload,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("acquisition timed out")]
    Timeout,
}

#[async_trait]
pub trait Source: 'static + Send + Sync {
    /// Fetches the full, decompressed database.
    async fn fetch(&self) -> Result<Bytes, AcquisitionError>;
}

#[async_trait]
impl<T> Source for Arc<T>
where
    T: Source + ?Sized,
{
    async fn fetch(&self) -> Result<Bytes, AcquisitionError> {
        self.deref().fetch().await
    }
}

#[async_trait]
impl<T> Source for Box<T>
where
    T: Source + ?Sized,
{
    async fn fetch(&self) -> Result<Bytes, AcquisitionError> {
        self.deref().fetch().await
    }
}

/// Account credentials for the remote update endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub account_id: String,
    pub license_key: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, license_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            license_key: license_key.into(),
        }
    }
}

// Make sure we're not leaking the license key in debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("license_key", &"<redacted>")
            .finish()
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total request timeout, including reading the whole body.
    ///
    /// Default is 60 seconds.
    pub timeout: Duration,

    /// Default is 10 seconds.
    pub connect_timeout: Duration,

    /// Connection keep-alive timeout after being returned to the pool.
    ///
    /// `None` disables the timeout. Default is 90 seconds.
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

/// Downloads a gzip-compressed database over HTTP(S) with basic auth.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    url: String,
    credentials: Credentials,
    http_client: reqwest::Client,
}

impl RemoteSource {
    pub fn new(edition: &str, credentials: Credentials) -> Result<Self, AcquisitionError> {
        Self::with_config(
            DEFAULT_URL_TEMPLATE,
            edition,
            credentials,
            Default::default(),
        )
    }

    pub fn with_config(
        url_template: &str,
        edition: &str,
        credentials: Credentials,
        config: HttpClientConfig,
    ) -> Result<Self, AcquisitionError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()?;

        Ok(Self {
            url: url_template.replace(EDITION_PLACEHOLDER, edition),
            credentials,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Source for RemoteSource {
    async fn fetch(&self) -> Result<Bytes, AcquisitionError> {
        info!(url = %self.url, "downloading geoip database");

        let resp = self
            .http_client
            .get(&self.url)
            .basic_auth(
                &self.credentials.account_id,
                Some(&self.credentials.license_key),
            )
            .send()
            .await?;

        let body = match resp.status().as_u16() {
            200..=299 => resp.bytes().await?,
            code @ (401 | 403) => return Err(AcquisitionError::Unauthorized(code)),
            code => return Err(AcquisitionError::Response(code)),
        };

        debug!(compressed_size = body.len(), "geoip database downloaded");

        let data = gunzip_blocking(body).await?;

        info!(size = data.len(), "geoip database download finished");

        Ok(data)
    }
}

/// Reads a pre-downloaded database from the local filesystem. Files with a
/// `.gz` extension are decompressed.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_compressed(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "gz")
    }
}

#[async_trait]
impl Source for FileSource {
    async fn fetch(&self) -> Result<Bytes, AcquisitionError> {
        info!(path = %self.path.display(), "loading geoip database from file");

        let data = Bytes::from(tokio::fs::read(&self.path).await?);

        if self.is_compressed() {
            gunzip_blocking(data).await
        } else if data.is_empty() {
            Err(AcquisitionError::EmptyPayload)
        } else {
            Ok(data)
        }
    }
}

/// Decompresses a gzip stream in full.
pub fn gunzip(data: &[u8]) -> Result<Bytes, AcquisitionError> {
    if data.is_empty() {
        return Err(AcquisitionError::EmptyPayload);
    }

    let mut buf = Vec::with_capacity(data.len() * 2);
    GzDecoder::new(data)
        .read_to_end(&mut buf)
        .map_err(AcquisitionError::Decompress)?;

    if buf.is_empty() {
        return Err(AcquisitionError::EmptyPayload);
    }

    Ok(buf.into())
}

// Decompressing a full database is CPU-heavy, so keep it off the async workers.
async fn gunzip_blocking(data: Bytes) -> Result<Bytes, AcquisitionError> {
    tokio::task::spawn_blocking(move || gunzip(&data))
        .await
        .map_err(|err| AcquisitionError::Decompress(io::Error::other(err)))?
}
