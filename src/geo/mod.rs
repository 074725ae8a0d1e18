// Geolocation resolution module
// Wraps the local GeoLite2 dataset behind a lookup seam and memoizes
// results per IP, so the dataset is queried at most once per peer.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the underlying geolocation dataset.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The dataset file is missing or corrupt. Fatal at startup; there is
    /// no useful degraded mode without the dataset.
    #[error("cannot open geolocation dataset {path}: {source}")]
    Open {
        path: PathBuf,
        source: maxminddb::MaxMindDBError,
    },

    /// A single record could not be read or decoded. Non-fatal; the
    /// resolver records the IP as `LookupFailed` and moves on.
    #[error("malformed dataset entry for {ip}: {message}")]
    Entry { ip: IpAddr, message: String },
}

/// How an IP resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The dataset returned coordinates for this address.
    Resolved,
    /// Private, loopback, link-local or otherwise non-routable; the
    /// dataset is never consulted for these.
    PrivateOrReserved,
    /// The dataset had no usable entry. Cached so the miss is not
    /// re-queried every poll tick.
    LookupFailed,
}

/// Resolved geographic position for an IP. Immutable once computed for a
/// given address within a process lifetime.
///
/// `latitude`/`longitude` are only meaningful when `resolution` is
/// [`Resolution::Resolved`]; callers must never plot the other outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub resolution: Resolution,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl GeoLocation {
    fn resolved(raw: RawLocation) -> Self {
        Self {
            resolution: Resolution::Resolved,
            latitude: raw.latitude,
            longitude: raw.longitude,
            city: raw.city,
            country: raw.country,
        }
    }

    fn private_or_reserved() -> Self {
        Self {
            resolution: Resolution::PrivateOrReserved,
            latitude: 0.0,
            longitude: 0.0,
            city: None,
            country: None,
        }
    }

    fn lookup_failed() -> Self {
        Self {
            resolution: Resolution::LookupFailed,
            latitude: 0.0,
            longitude: 0.0,
            city: None,
            country: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution == Resolution::Resolved
    }

    /// Short human-readable form for the sidebar and log dumps.
    pub fn summary(&self) -> String {
        match self.resolution {
            Resolution::PrivateOrReserved => "private/reserved".to_string(),
            Resolution::LookupFailed => "unresolved".to_string(),
            Resolution::Resolved => match (&self.city, &self.country) {
                (Some(city), Some(country)) => format!("{}, {}", city, country),
                (Some(city), None) => city.clone(),
                (None, Some(country)) => country.clone(),
                (None, None) => format!("{:.2}, {:.2}", self.latitude, self.longitude),
            },
        }
    }
}

/// What the dataset yields for an address, before resolution policy is
/// applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// The black-box dataset capability: given an IP, return a location or
/// nothing. `Ok(None)` is a miss; `Err` is a malformed entry.
pub trait GeoDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<RawLocation>, GeoError>;
}

/// GeoLite2-City `.mmdb` reader.
pub struct MaxMindDb {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindDb {
    /// Open the dataset file. This is the fatal startup gate: a missing or
    /// unreadable dataset aborts before the main loop starts.
    pub fn open(path: &Path) -> Result<Self, GeoError> {
        let reader = maxminddb::Reader::open_readfile(path).map_err(|source| GeoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { reader })
    }
}

impl GeoDatabase for MaxMindDb {
    fn lookup(&self, ip: IpAddr) -> Result<Option<RawLocation>, GeoError> {
        let city: maxminddb::geoip2::City = match self.reader.lookup(ip) {
            Ok(city) => city,
            Err(maxminddb::MaxMindDBError::AddressNotFoundError(_)) => return Ok(None),
            Err(e) => {
                return Err(GeoError::Entry {
                    ip,
                    message: e.to_string(),
                })
            }
        };

        let location = match city.location {
            Some(loc) => loc,
            None => return Ok(None),
        };
        // A record without coordinates cannot be plotted; treat it as a miss.
        let (latitude, longitude) = match (location.latitude, location.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Ok(None),
        };

        let city_name = city
            .city
            .and_then(|c| c.names)
            .and_then(|names| names.get("en").map(|s| s.to_string()));
        let country = city
            .country
            .and_then(|c| c.iso_code)
            .map(|s| s.to_string());

        Ok(Some(RawLocation {
            latitude,
            longitude,
            city: city_name,
            country,
        }))
    }
}

/// Memoizing resolver over a [`GeoDatabase`].
///
/// The cache is unbounded: the key space is the set of distinct peers this
/// host actually talks to, which stays small in practice. Failures are
/// cached too, so a persistently unresolvable IP costs one query total.
pub struct Resolver {
    db: Box<dyn GeoDatabase>,
    cache: HashMap<IpAddr, GeoLocation>,
}

impl Resolver {
    pub fn new(db: Box<dyn GeoDatabase>) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    /// Resolve an address, consulting the dataset at most once per IP for
    /// the process lifetime.
    pub fn resolve(&mut self, ip: IpAddr) -> GeoLocation {
        if let Some(cached) = self.cache.get(&ip) {
            return cached.clone();
        }

        let location = if is_reserved(ip) {
            GeoLocation::private_or_reserved()
        } else {
            match self.db.lookup(ip) {
                Ok(Some(raw)) => {
                    debug!(%ip, lat = raw.latitude, lon = raw.longitude, "resolved");
                    GeoLocation::resolved(raw)
                }
                Ok(None) => {
                    // Cached below, so this warning fires once per IP.
                    warn!(%ip, "address not in geolocation dataset");
                    GeoLocation::lookup_failed()
                }
                Err(e) => {
                    warn!(%ip, error = %e, "geolocation lookup failed");
                    GeoLocation::lookup_failed()
                }
            }
        };

        self.cache.insert(ip, location.clone());
        location
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// Whether an address is in a private, loopback, link-local or otherwise
/// non-routable range. These never reach the dataset.
///
/// Written against stable std only; the unstable `Ipv6Addr` classification
/// helpers are reimplemented with explicit range checks.
pub fn is_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_multicast()
                || v4.is_unspecified()
                // Carrier-grade NAT, 100.64.0.0/10
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
                // Benchmarking, 198.18.0.0/15
                || (v4.octets()[0] == 198 && (v4.octets()[1] & 0xfe) == 18)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_reserved(IpAddr::V4(mapped));
            }
            let seg = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                // Unique local, fc00::/7
                || (seg[0] & 0xfe00) == 0xfc00
                // Link-local, fe80::/10
                || (seg[0] & 0xffc0) == 0xfe80
                // Documentation, 2001:db8::/32
                || (seg[0] == 0x2001 && seg[1] == 0x0db8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::rc::Rc;

    /// Dataset fake that counts queries and serves one fixed answer.
    struct FakeDb {
        queries: Rc<Cell<usize>>,
        answer: Result<Option<RawLocation>, ()>,
    }

    impl GeoDatabase for FakeDb {
        fn lookup(&self, ip: IpAddr) -> Result<Option<RawLocation>, GeoError> {
            self.queries.set(self.queries.get() + 1);
            match &self.answer {
                Ok(answer) => Ok(answer.clone()),
                Err(()) => Err(GeoError::Entry {
                    ip,
                    message: "truncated record".to_string(),
                }),
            }
        }
    }

    fn resolver_with(answer: Result<Option<RawLocation>, ()>) -> (Resolver, Rc<Cell<usize>>) {
        let queries = Rc::new(Cell::new(0));
        let db = FakeDb {
            queries: Rc::clone(&queries),
            answer,
        };
        (Resolver::new(Box::new(db)), queries)
    }

    fn sample_raw() -> RawLocation {
        RawLocation {
            latitude: 37.751,
            longitude: -97.822,
            city: None,
            country: Some("US".to_string()),
        }
    }

    #[test]
    fn test_reserved_ipv4_ranges() {
        let reserved = [
            "127.0.0.1",
            "10.0.0.5",
            "172.16.4.2",
            "192.168.1.1",
            "169.254.0.9",
            "0.0.0.0",
            "255.255.255.255",
            "224.0.0.1",
            "100.64.0.1",
            "198.18.0.1",
            "192.0.2.7",
        ];
        for s in reserved {
            let ip: IpAddr = s.parse().unwrap();
            assert!(is_reserved(ip), "{} should be reserved", s);
        }

        let routable = ["8.8.8.8", "93.184.216.34", "1.1.1.1", "198.20.0.1"];
        for s in routable {
            let ip: IpAddr = s.parse().unwrap();
            assert!(!is_reserved(ip), "{} should be routable", s);
        }
    }

    #[test]
    fn test_reserved_ipv6_ranges() {
        assert!(is_reserved(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_reserved(IpAddr::V6(Ipv6Addr::UNSPECIFIED)));
        assert!(is_reserved("fe80::1".parse().unwrap()));
        assert!(is_reserved("fc00::1".parse().unwrap()));
        assert!(is_reserved("fd12:3456::1".parse().unwrap()));
        assert!(is_reserved("ff02::1".parse().unwrap()));
        assert!(is_reserved("2001:db8::1".parse().unwrap()));
        // v4-mapped addresses classify as their embedded v4 address
        assert!(is_reserved("::ffff:192.168.0.1".parse().unwrap()));
        assert!(!is_reserved("::ffff:8.8.8.8".parse().unwrap()));

        assert!(!is_reserved("2606:4700::1111".parse().unwrap()));
    }

    #[test]
    fn test_reserved_addresses_never_query_the_dataset() {
        let (mut resolver, queries) = resolver_with(Ok(Some(sample_raw())));

        let loc = resolver.resolve("10.0.0.5".parse().unwrap());
        assert_eq!(loc.resolution, Resolution::PrivateOrReserved);
        let loc = resolver.resolve(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(loc.resolution, Resolution::PrivateOrReserved);

        assert_eq!(queries.get(), 0);
    }

    #[test]
    fn test_resolve_caches_success() {
        let (mut resolver, queries) = resolver_with(Ok(Some(sample_raw())));
        let ip: IpAddr = "93.184.216.34".parse().unwrap();

        let first = resolver.resolve(ip);
        let second = resolver.resolve(ip);

        assert_eq!(queries.get(), 1);
        assert_eq!(first, second);
        assert_eq!(first.resolution, Resolution::Resolved);
        assert_eq!(first.latitude, 37.751);
        assert_eq!(first.longitude, -97.822);
        assert_eq!(first.country.as_deref(), Some("US"));
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn test_resolve_caches_miss() {
        let (mut resolver, queries) = resolver_with(Ok(None));
        let ip: IpAddr = "8.8.8.8".parse().unwrap();

        let first = resolver.resolve(ip);
        let second = resolver.resolve(ip);

        assert_eq!(queries.get(), 1);
        assert_eq!(first.resolution, Resolution::LookupFailed);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_caches_error() {
        let (mut resolver, queries) = resolver_with(Err(()));
        let ip: IpAddr = "8.8.8.8".parse().unwrap();

        assert_eq!(resolver.resolve(ip).resolution, Resolution::LookupFailed);
        assert_eq!(resolver.resolve(ip).resolution, Resolution::LookupFailed);
        assert_eq!(queries.get(), 1);
    }

    #[test]
    fn test_location_summary() {
        let loc = GeoLocation::resolved(RawLocation {
            latitude: 48.85,
            longitude: 2.35,
            city: Some("Paris".to_string()),
            country: Some("FR".to_string()),
        });
        assert_eq!(loc.summary(), "Paris, FR");

        let loc = GeoLocation::resolved(RawLocation {
            latitude: 37.751,
            longitude: -97.822,
            city: None,
            country: None,
        });
        assert_eq!(loc.summary(), "37.75, -97.82");

        assert_eq!(
            GeoLocation::private_or_reserved().summary(),
            "private/reserved"
        );
        assert_eq!(GeoLocation::lookup_failed().summary(), "unresolved");
    }
}
