// Connection state tracking module
//
// Owns the live map of remote endpoints. Enumeration snapshots come in
// through `ingest`, the render loop reads immutable copies out through
// `snapshot_for_render`; nothing else touches the map.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::geo::{GeoLocation, Resolver};
use crate::net::{ConnectionRecord, Direction};

/// Which directions have been observed for an endpoint over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionSet {
    pub inbound: bool,
    pub outbound: bool,
}

impl DirectionSet {
    pub fn observe(&mut self, direction: Direction) {
        match direction {
            Direction::Inbound => self.inbound = true,
            Direction::Outbound => self.outbound = true,
        }
    }

    pub fn union(&mut self, other: DirectionSet) {
        self.inbound |= other.inbound;
        self.outbound |= other.outbound;
    }

    /// Compact arrow form for the sidebar: ↓ in, ↑ out.
    pub fn arrows(&self) -> &'static str {
        match (self.inbound, self.outbound) {
            (true, true) => "↑↓",
            (false, true) => "↑",
            (true, false) => "↓",
            (false, false) => "–",
        }
    }
}

/// One tracked remote endpoint, keyed by IP.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEndpoint {
    pub ip: IpAddr,
    pub first_seen: Instant,
    pub last_seen: Instant,
    pub location: GeoLocation,
    /// Count of distinct concurrent connections to this IP in the most
    /// recent tick it was observed. Always at least 1.
    pub weight: usize,
    pub directions: DirectionSet,
}

/// Live endpoint table with TTL expiry.
///
/// Aggregation is keyed by IP, never by resolved coordinate: two peers
/// behind the same gateway stay two entries. An endpoint expires once
/// `now - last_seen >= ttl`, both during ingest and at snapshot time, so a
/// render never observes an entry past its TTL.
pub struct EndpointTracker {
    endpoints: HashMap<IpAddr, TrackedEndpoint>,
    ttl: Duration,
}

impl EndpointTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            endpoints: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Merge one enumeration snapshot into the live table.
    ///
    /// Records are grouped by remote IP; the group size becomes the
    /// endpoint's weight for this tick. Unseen IPs are resolved exactly
    /// once through the resolver's cache; re-sighted IPs keep their stored
    /// location. Expired entries are evicted on every call.
    pub fn ingest(&mut self, snapshot: &[ConnectionRecord], now: Instant, resolver: &mut Resolver) {
        let mut seen: HashMap<IpAddr, (usize, DirectionSet)> = HashMap::new();
        for rec in snapshot {
            let entry = seen.entry(rec.remote_addr).or_default();
            entry.0 += 1;
            entry.1.observe(rec.direction);
        }

        for (ip, (count, directions)) in seen {
            match self.endpoints.entry(ip) {
                Entry::Occupied(mut occupied) => {
                    let ep = occupied.get_mut();
                    ep.last_seen = now;
                    ep.weight = count;
                    ep.directions.union(directions);
                }
                Entry::Vacant(vacant) => {
                    let location = resolver.resolve(ip);
                    vacant.insert(TrackedEndpoint {
                        ip,
                        first_seen: now,
                        last_seen: now,
                        location,
                        weight: count,
                        directions,
                    });
                }
            }
        }

        let ttl = self.ttl;
        self.endpoints
            .retain(|_, ep| now.duration_since(ep.last_seen) < ttl);
    }

    /// Immutable point-in-time copy of the live table for the render loop.
    ///
    /// Entries past their TTL are filtered here as well, so the invariant
    /// holds even when no ingest ran since they expired. Output is sorted
    /// by IP: two back-to-back snapshots without an intervening ingest are
    /// equal.
    pub fn snapshot_for_render(&self, now: Instant) -> Vec<TrackedEndpoint> {
        let mut endpoints: Vec<TrackedEndpoint> = self
            .endpoints
            .values()
            .filter(|ep| now.duration_since(ep.last_seen) < self.ttl)
            .cloned()
            .collect();
        endpoints.sort_by_key(|ep| ep.ip);
        endpoints
    }
}
