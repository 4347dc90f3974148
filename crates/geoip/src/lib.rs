pub use {
    local::LocalSnapshot,
    locator::{LocationRecord, Locator, QueryError},
    manager::DatabaseManager,
    maxmind::{MaxMindParser, MaxMindSnapshot},
    maxminddb,
    refresh::{RefreshConfig, RefreshError, Refresher},
    source::{AcquisitionError, Credentials, FileSource, HttpClientConfig, RemoteSource, Source},
    tokio_util::sync::CancellationToken,
};
use {
    bytes::Bytes,
    std::{net::IpAddr, ops::Deref, sync::Arc},
};

mod local;
mod locator;
mod manager;
mod maxmind;
mod refresh;
pub mod source;

/// Geo data of a single address, as stored in the database. Any attribute may
/// be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoData {
    pub continent: Option<Arc<str>>,
    pub country_name: Option<Arc<str>>,
    pub country_code: Option<Arc<str>>,
    pub region_name: Option<Arc<str>>,
    pub region_code: Option<Arc<str>>,
    pub city: Option<Arc<str>>,
    pub postal_code: Option<Arc<str>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metro_code: Option<u16>,
    pub time_zone: Option<Arc<str>>,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Geoip database is not loaded yet")]
    NotReady,

    #[error("Address not found in database: {0}")]
    NotFound(IpAddr),

    #[error("MaxMind DB lookup error: {0}")]
    MaxMindDB(#[from] maxminddb::MaxMindDBError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("MaxMind DB parse error: {0}")]
    MaxMindDB(#[from] maxminddb::MaxMindDBError),

    #[error("Invalid database: {0}")]
    Invalid(String),
}

/// Immutable, fully constructed geolocation database.
pub trait Snapshot: Send + Sync + 'static {
    /// Lookup the geo data for the given IP address.
    fn lookup_geo_data(&self, addr: IpAddr) -> Result<GeoData, LookupError>;

    /// Database build time as a unix timestamp, if known.
    fn build_epoch(&self) -> Option<u64> {
        None
    }

    /// Database edition, e.g. `GeoLite2-City`, if known.
    fn database_type(&self) -> Option<&str> {
        None
    }
}

impl<T> Snapshot for Arc<T>
where
    T: Snapshot,
{
    fn lookup_geo_data(&self, addr: IpAddr) -> Result<GeoData, LookupError> {
        let s = self.deref();
        s.lookup_geo_data(addr)
    }

    fn build_epoch(&self) -> Option<u64> {
        self.deref().build_epoch()
    }

    fn database_type(&self) -> Option<&str> {
        self.deref().database_type()
    }
}

/// Turns raw, decompressed database bytes into a [`Snapshot`].
pub trait SnapshotParser: Send + Sync + 'static {
    type Snapshot: Snapshot;

    fn parse(&self, data: Bytes) -> Result<Self::Snapshot, ParseError>;
}

impl<F, S> SnapshotParser for F
where
    F: Fn(Bytes) -> Result<S, ParseError> + Send + Sync + 'static,
    S: Snapshot,
{
    type Snapshot = S;

    fn parse(&self, data: Bytes) -> Result<Self::Snapshot, ParseError> {
        self(data)
    }
}
