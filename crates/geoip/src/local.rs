use {
    crate::{GeoData, LookupError, Snapshot},
    std::{collections::HashMap, net::IpAddr},
};

/// Local snapshot that does not need DB files. Holds a fixed table of
/// per-address records.
#[derive(Debug, Clone, Default)]
pub struct LocalSnapshot {
    records: HashMap<IpAddr, GeoData>,
}

impl LocalSnapshot {
    pub fn new(records: impl IntoIterator<Item = (IpAddr, GeoData)>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl FromIterator<(IpAddr, GeoData)> for LocalSnapshot {
    fn from_iter<T: IntoIterator<Item = (IpAddr, GeoData)>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl Snapshot for LocalSnapshot {
    fn lookup_geo_data(&self, addr: IpAddr) -> Result<GeoData, LookupError> {
        self.records
            .get(&addr)
            .cloned()
            .ok_or(LookupError::NotFound(addr))
    }
}
