use {
    crate::{GeoData, LookupError, ParseError, Snapshot, SnapshotParser},
    bytes::Bytes,
    maxminddb::{geoip2::City, MaxMindDBError},
    std::{collections::BTreeMap, net::IpAddr, sync::Arc},
};

const LANGUAGE: &str = "en";

/// Snapshot backed by a MaxMind `City` database held in memory.
#[derive(Debug)]
pub struct MaxMindSnapshot {
    reader: maxminddb::Reader<Bytes>,
}

impl MaxMindSnapshot {
    pub fn from_buffer(buffer: Bytes) -> Result<Self, ParseError> {
        let reader = maxminddb::Reader::from_source(buffer)?;
        Ok(Self { reader })
    }

    /// Lookup the raw `City` record for the given IP address.
    pub fn lookup_geo_data_raw(&self, addr: IpAddr) -> Result<City<'_>, LookupError> {
        self.reader.lookup::<City>(addr).map_err(|err| match err {
            MaxMindDBError::AddressNotFoundError(_) => LookupError::NotFound(addr),
            err => err.into(),
        })
    }
}

impl Snapshot for MaxMindSnapshot {
    fn lookup_geo_data(&self, addr: IpAddr) -> Result<GeoData, LookupError> {
        self.lookup_geo_data_raw(addr).map(geo_data)
    }

    fn build_epoch(&self) -> Option<u64> {
        Some(self.reader.metadata.build_epoch)
    }

    fn database_type(&self) -> Option<&str> {
        Some(&self.reader.metadata.database_type)
    }
}

/// Maps a MaxMind `City` record to [`GeoData`]. The first subdivision is
/// used as the region, names are taken in English only.
fn geo_data(city: City<'_>) -> GeoData {
    let region = city.subdivisions.and_then(|divs| divs.into_iter().next());
    let location = city.location;

    GeoData {
        continent: city
            .continent
            .and_then(|continent| english_name(continent.names)),
        country_name: city
            .country
            .as_ref()
            .and_then(|country| english_name(country.names.clone())),
        country_code: city
            .country
            .and_then(|country| country.iso_code.map(Into::into)),
        region_name: region
            .as_ref()
            .and_then(|div| english_name(div.names.clone())),
        region_code: region.and_then(|div| div.iso_code.map(Into::into)),
        city: city.city.and_then(|city| english_name(city.names)),
        postal_code: city.postal.and_then(|postal| postal.code.map(Into::into)),
        latitude: location.as_ref().and_then(|loc| loc.latitude),
        longitude: location.as_ref().and_then(|loc| loc.longitude),
        metro_code: location.as_ref().and_then(|loc| loc.metro_code),
        time_zone: location.and_then(|loc| loc.time_zone.map(Into::into)),
    }
}

fn english_name(names: Option<BTreeMap<&str, &str>>) -> Option<Arc<str>> {
    names.and_then(|names| names.get(LANGUAGE).copied().map(Into::into))
}

/// Parses raw MaxMind DB bytes into a [`MaxMindSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMindParser;

impl SnapshotParser for MaxMindParser {
    type Snapshot = MaxMindSnapshot;

    fn parse(&self, data: Bytes) -> Result<Self::Snapshot, ParseError> {
        MaxMindSnapshot::from_buffer(data)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, maxminddb::geoip2};

    fn names(
        entries: &[(&'static str, &'static str)],
    ) -> Option<BTreeMap<&'static str, &'static str>> {
        Some(entries.iter().copied().collect())
    }

    fn subdivision(
        iso_code: &'static str,
        name: &'static str,
    ) -> geoip2::city::Subdivision<'static> {
        geoip2::city::Subdivision {
            geoname_id: None,
            iso_code: Some(iso_code),
            names: names(&[("en", name)]),
        }
    }

    fn seattle() -> City<'static> {
        City {
            city: Some(geoip2::city::City {
                geoname_id: None,
                names: names(&[("de", "Seattle (Stadt)"), ("en", "Seattle")]),
            }),
            continent: Some(geoip2::city::Continent {
                code: Some("NA"),
                geoname_id: None,
                names: names(&[("en", "North America"), ("fr", "Amérique du Nord")]),
            }),
            country: Some(geoip2::city::Country {
                geoname_id: None,
                is_in_european_union: None,
                iso_code: Some("US"),
                names: names(&[("de", "USA"), ("en", "United States")]),
            }),
            location: Some(geoip2::city::Location {
                accuracy_radius: Some(20),
                latitude: Some(47.5),
                longitude: Some(-122.25),
                metro_code: Some(819),
                time_zone: Some("America/Los_Angeles"),
            }),
            postal: Some(geoip2::city::Postal {
                code: Some("98101"),
            }),
            registered_country: None,
            represented_country: None,
            subdivisions: Some(vec![subdivision("WA", "Washington")]),
            traits: None,
        }
    }

    fn country_only() -> City<'static> {
        City {
            city: None,
            continent: None,
            country: Some(geoip2::city::Country {
                geoname_id: None,
                is_in_european_union: None,
                iso_code: Some("CU"),
                names: None,
            }),
            location: None,
            postal: None,
            registered_country: None,
            represented_country: None,
            subdivisions: None,
            traits: None,
        }
    }

    #[test]
    fn full_city_record() {
        assert_eq!(
            geo_data(seattle()),
            GeoData {
                continent: Some("North America".into()),
                country_name: Some("United States".into()),
                country_code: Some("US".into()),
                region_name: Some("Washington".into()),
                region_code: Some("WA".into()),
                city: Some("Seattle".into()),
                postal_code: Some("98101".into()),
                latitude: Some(47.5),
                longitude: Some(-122.25),
                metro_code: Some(819),
                time_zone: Some("America/Los_Angeles".into()),
            }
        );
    }

    #[test]
    fn missing_attributes_are_none() {
        assert_eq!(
            geo_data(country_only()),
            GeoData {
                country_code: Some("CU".into()),
                ..Default::default()
            }
        );

        let record = City {
            subdivisions: Some(Vec::new()),
            ..seattle()
        };
        let data = geo_data(record);
        assert_eq!(data.region_code, None);
        assert_eq!(data.region_name, None);
        assert_eq!(data.city.as_deref(), Some("Seattle"));
    }

    #[test]
    fn first_subdivision_is_the_region() {
        let record = City {
            subdivisions: Some(vec![
                subdivision("ENG", "England"),
                subdivision("LND", "London"),
            ]),
            ..seattle()
        };
        let data = geo_data(record);

        assert_eq!(data.region_code.as_deref(), Some("ENG"));
        assert_eq!(data.region_name.as_deref(), Some("England"));
    }

    #[test]
    fn names_without_english_entry() {
        let mut record = seattle();
        record.city = Some(geoip2::city::City {
            geoname_id: None,
            names: names(&[("ja", "シアトル")]),
        });
        record.country = Some(geoip2::city::Country {
            geoname_id: None,
            is_in_european_union: None,
            iso_code: Some("US"),
            names: names(&[("de", "USA")]),
        });
        let data = geo_data(record);

        assert_eq!(data.city, None);
        assert_eq!(data.country_name, None);
        assert_eq!(data.country_code.as_deref(), Some("US"));
        assert_eq!(data.continent.as_deref(), Some("North America"));
    }

    #[test]
    fn garbage_is_rejected() {
        let result = MaxMindParser.parse(Bytes::from_static(b"definitely not a maxmind database"));

        assert!(matches!(result, Err(ParseError::MaxMindDB(_))));
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(MaxMindParser.parse(Bytes::new()).is_err());
    }

    #[test]
    fn english_names_only() {
        let names = BTreeMap::from([("de", "Deutschland"), ("en", "Germany")]);
        assert_eq!(english_name(Some(names)).as_deref(), Some("Germany"));

        let names = BTreeMap::from([("de", "Deutschland")]);
        assert_eq!(english_name(Some(names)), None);
        assert_eq!(english_name(None), None);
    }
}
