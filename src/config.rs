use {
    geoip::{
        source::{DEFAULT_EDITION, DEFAULT_URL_TEMPLATE},
        AcquisitionError,
        Credentials,
        FileSource,
        HttpClientConfig,
        RefreshConfig,
        RemoteSource,
        Source,
    },
    std::{
        net::{IpAddr, SocketAddr},
        path::PathBuf,
        time::Duration,
    },
    structopt::StructOpt,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("account id and license key are required to download the database")]
    MissingCredentials,

    #[error("invalid config: {0}")]
    Invalid(&'static str),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] AcquisitionError),
}

/// Command line configuration of the geoip service.
#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "geoip-service", about = "IP geolocation lookup service")]
pub struct Config {
    /// The ip address to bind to.
    #[structopt(short = "b", long = "bindip", default_value = "0.0.0.0")]
    pub bind_ip: IpAddr,

    /// Port to listen on.
    #[structopt(short = "p", long = "port", default_value = "8080")]
    pub port: u16,

    /// Interval (hours) to check for database updates.
    #[structopt(short = "u", long = "updateinterval", default_value = "24")]
    pub update_interval: u64,

    /// License key, generated on the MaxMind website.
    #[structopt(short = "l", long = "license")]
    pub license: Option<String>,

    /// Account id, generated on the MaxMind website.
    #[structopt(short = "a", long = "accountid")]
    pub account_id: Option<String>,

    /// Edition of the database to download.
    #[structopt(short = "e", long = "edition", default_value = DEFAULT_EDITION)]
    pub edition: String,

    /// Route prefix of the service.
    #[structopt(short = "r", long = "routeprefix", default_value = "/geoip")]
    pub route_prefix: String,

    /// Load the database from a local file instead of downloading it.
    #[structopt(short = "f", long = "database-file", parse(from_os_str))]
    pub database_file: Option<PathBuf>,

    /// Download URL, `{edition}` is replaced with the database edition.
    #[structopt(long = "url-template", default_value = DEFAULT_URL_TEMPLATE)]
    pub url_template: String,

    /// Timeout (seconds) for a single database download.
    #[structopt(long = "fetch-timeout", default_value = "60")]
    pub fetch_timeout: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval == 0 {
            return Err(ConfigError::Invalid("update interval must be positive"));
        }

        if self.fetch_timeout == 0 {
            return Err(ConfigError::Invalid("fetch timeout must be positive"));
        }

        if self.database_file.is_none() && self.credentials().is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: Duration::from_secs(self.update_interval.saturating_mul(60 * 60)),
            fetch_timeout: self.fetch_timeout(),
        }
    }

    /// Builds the database source: a local file if one is configured,
    /// otherwise the remote update endpoint.
    pub fn source(&self) -> Result<Box<dyn Source>, ConfigError> {
        if let Some(path) = &self.database_file {
            return Ok(Box::new(FileSource::new(path)));
        }

        let credentials = self.credentials().ok_or(ConfigError::MissingCredentials)?;
        let source = RemoteSource::with_config(
            &self.url_template,
            &self.edition,
            credentials,
            HttpClientConfig {
                timeout: self.fetch_timeout(),
                ..Default::default()
            },
        )?;

        Ok(Box::new(source))
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.account_id, &self.license) {
            (Some(account_id), Some(license)) if !account_id.is_empty() && !license.is_empty() => {
                Some(Credentials::new(account_id, license))
            }
            _ => None,
        }
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}
