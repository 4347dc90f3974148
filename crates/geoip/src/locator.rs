use {
    crate::{DatabaseManager, GeoData, LookupError, MaxMindSnapshot, Snapshot},
    std::{
        net::{AddrParseError, IpAddr},
        sync::Arc,
    },
};

/// Location of a single address. Attributes missing from the database are
/// left empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationRecord {
    pub ip: String,
    pub continent: String,
    pub country_name: String,
    pub country_code: String,
    pub region_name: String,
    pub region_code: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub metro_code: u16,
    pub time_zone: String,
}

impl LocationRecord {
    fn new(ip: String, data: GeoData) -> Self {
        fn text(value: Option<Arc<str>>) -> String {
            value.as_deref().unwrap_or_default().to_owned()
        }

        Self {
            ip,
            continent: text(data.continent),
            country_name: text(data.country_name),
            country_code: text(data.country_code),
            region_name: text(data.region_name),
            region_code: text(data.region_code),
            city: text(data.city),
            postal_code: text(data.postal_code),
            latitude: data.latitude.unwrap_or_default(),
            longitude: data.longitude.unwrap_or_default(),
            metro_code: data.metro_code.unwrap_or_default(),
            time_zone: text(data.time_zone),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid IP address: {0}")]
    BadInput(#[from] AddrParseError),

    #[error("Geoip database is not loaded yet")]
    NotReady,

    #[error("Lookup failed: {0}")]
    LookupFailed(LookupError),
}

impl From<LookupError> for QueryError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotReady => Self::NotReady,
            err => Self::LookupFailed(err),
        }
    }
}

/// Transport-independent entry point for address lookups.
#[derive(Debug)]
pub struct Locator<S = MaxMindSnapshot> {
    manager: Arc<DatabaseManager<S>>,
}

impl<S> Clone for Locator<S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

impl<S> Locator<S>
where
    S: Snapshot,
{
    pub fn new(manager: Arc<DatabaseManager<S>>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<DatabaseManager<S>> {
        &self.manager
    }

    /// Parses `addr` and looks it up in the current database snapshot.
    pub fn lookup(&self, addr: &str) -> Result<LocationRecord, QueryError> {
        let addr = addr.trim();
        let ip = addr.parse::<IpAddr>()?;
        let data = self.manager.query(ip)?;

        Ok(LocationRecord::new(addr.to_owned(), data))
    }
}
