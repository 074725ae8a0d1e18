// Application state management
//
// AppState is the orchestrator: it owns the two cadences (poll, render),
// the tracker and resolver, and the UI toggles. The tracker is mutated
// only from `on_tick`, so every mutation happens inside one bounded
// update; the render path works from value snapshots.

pub mod config;
pub mod event;

pub use config::Cadence;

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::geo::Resolver;
use crate::net;
use crate::track::{EndpointTracker, TrackedEndpoint};

/// Main application state.
pub struct AppState {
    /// Whether the application is running.
    pub running: bool,

    /// Polling paused by the user. Rendering continues and entries still
    /// age out per TTL; the map stays honest about liveness.
    pub paused: bool,

    /// Show endpoint labels on the map.
    pub labels_enabled: bool,

    /// Also enumerate IPv6 sockets.
    pub ipv6: bool,

    /// Connection enumeration cadence.
    pub poll: Cadence,

    /// Map redraw cadence, independent of the poll cadence.
    pub render: Cadence,

    /// Live endpoint table.
    pub tracker: EndpointTracker,

    /// Memoizing geolocation resolver.
    pub resolver: Resolver,

    /// Snapshot taken at the last render tick; what the UI draws.
    pub last_snapshot: Vec<TrackedEndpoint>,

    /// Most recent enumeration warning, shown in the status bar until the
    /// next successful poll.
    pub enum_warning: Option<String>,

    /// When true, the TTL follows the poll interval (3x) as it is adjusted
    /// at runtime. Set from whether --ttl was given explicitly.
    ttl_follows_poll: bool,

    // Counters surfaced in the status bar.
    pub polls_completed: u64,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
}

impl AppState {
    pub fn new(
        resolver: Resolver,
        poll_interval: Duration,
        render_interval: Duration,
        ttl: Duration,
        ttl_follows_poll: bool,
        ipv6: bool,
    ) -> Self {
        Self {
            running: true,
            paused: false,
            labels_enabled: true,
            ipv6,
            poll: Cadence::new(poll_interval),
            render: Cadence::new(render_interval),
            tracker: EndpointTracker::new(ttl),
            resolver,
            last_snapshot: Vec::new(),
            enum_warning: None,
            ttl_follows_poll,
            polls_completed: 0,
            frames_rendered: 0,
            frames_skipped: 0,
        }
    }

    /// Drive both cadences. Returns true when a new frame should be drawn.
    ///
    /// Poll and render fire independently; when rendering falls behind its
    /// cadence the missed intervals are counted as skipped and the newest
    /// snapshot is drawn, so frames are never queued.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if !self.paused && self.poll.is_due(now) {
            self.poll_connections(now);
            self.poll.fire(now);
            self.polls_completed += 1;
        }

        if self.render.is_due(now) {
            self.frames_skipped += self.render.lag_periods(now);
            self.render.fire(now);
            self.last_snapshot = self.tracker.snapshot_for_render(now);
            self.frames_rendered += 1;
            return true;
        }

        false
    }

    /// One enumeration + ingest pass.
    ///
    /// A transient enumeration error keeps the previous tracked state and
    /// surfaces a warning; the next tick retries.
    fn poll_connections(&mut self, now: Instant) {
        match net::enumerate(self.ipv6) {
            Ok(snapshot) => {
                self.tracker.ingest(&snapshot, now, &mut self.resolver);
                self.enum_warning = None;
            }
            Err(e) => {
                warn!(error = %e, "connection enumeration failed, keeping previous state");
                self.enum_warning = Some(format!("enumeration failed: {e:#}"));
            }
        }
    }

    /// How long the main loop may wait for input before the next tick of
    /// either cadence is due.
    pub fn next_deadline(&self, now: Instant) -> Duration {
        let mut wait = self.render.until_due(now);
        if !self.paused {
            wait = wait.min(self.poll.until_due(now));
        }
        wait.clamp(config::MIN_EVENT_WAIT, config::MAX_EVENT_WAIT)
    }

    /// Speed polling up one step (shorter interval, clamped).
    pub fn increase_poll_rate(&mut self) {
        let ms = self
            .poll
            .interval()
            .as_millis()
            .min(config::MAX_POLL_MS as u128) as u64;
        let new_ms = ms.saturating_sub(config::POLL_STEP_MS).max(config::MIN_POLL_MS);
        self.apply_poll_interval(Duration::from_millis(new_ms));
    }

    /// Slow polling down one step (longer interval, clamped).
    pub fn decrease_poll_rate(&mut self) {
        let ms = self.poll.interval().as_millis() as u64;
        let new_ms = ms.saturating_add(config::POLL_STEP_MS).min(config::MAX_POLL_MS);
        self.apply_poll_interval(Duration::from_millis(new_ms));
    }

    fn apply_poll_interval(&mut self, interval: Duration) {
        self.poll.set_interval(interval);
        if self.ttl_follows_poll {
            self.tracker.set_ttl(interval * config::TTL_POLL_MULTIPLIER);
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        info!(paused = self.paused, "polling pause toggled");
    }

    pub fn toggle_labels(&mut self) {
        self.labels_enabled = !self.labels_enabled;
    }

    /// Write the current endpoint table to the log ('l' key).
    pub fn dump_endpoints(&self) {
        info!(
            endpoints = self.last_snapshot.len(),
            cached_ips = self.resolver.cache_len(),
            "tracked endpoint dump"
        );
        for ep in &self.last_snapshot {
            info!(
                ip = %ep.ip,
                location = %ep.location.summary(),
                weight = ep.weight,
                directions = ep.directions.arrows(),
                age_secs = ep.last_seen.elapsed().as_secs(),
                tracked_secs = ep.first_seen.elapsed().as_secs(),
                "endpoint"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoDatabase, GeoError, RawLocation};
    use std::net::IpAddr;

    struct EmptyDb;

    impl GeoDatabase for EmptyDb {
        fn lookup(&self, _ip: IpAddr) -> Result<Option<RawLocation>, GeoError> {
            Ok(None)
        }
    }

    fn test_app() -> AppState {
        AppState::new(
            Resolver::new(Box::new(EmptyDb)),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(3),
            true,
            false,
        )
    }

    #[test]
    fn test_poll_rate_clamps_at_bounds() {
        let mut app = test_app();

        for _ in 0..100 {
            app.increase_poll_rate();
        }
        assert_eq!(
            app.poll.interval(),
            Duration::from_millis(config::MIN_POLL_MS)
        );

        for _ in 0..100 {
            app.decrease_poll_rate();
        }
        assert_eq!(
            app.poll.interval(),
            Duration::from_millis(config::MAX_POLL_MS)
        );
    }

    #[test]
    fn test_ttl_follows_poll_interval() {
        let mut app = test_app();
        app.decrease_poll_rate();

        let expected = app.poll.interval() * config::TTL_POLL_MULTIPLIER;
        assert_eq!(app.tracker.ttl(), expected);
    }

    #[test]
    fn test_explicit_ttl_does_not_follow_poll() {
        let mut app = AppState::new(
            Resolver::new(Box::new(EmptyDb)),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(30),
            false,
            false,
        );
        app.decrease_poll_rate();
        assert_eq!(app.tracker.ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_render_cadence_independent_of_pause() {
        let mut app = test_app();
        app.paused = true;

        // Paused: no polling happens, but render ticks still fire.
        let now = Instant::now();
        assert!(app.on_tick(now));
        assert_eq!(app.polls_completed, 0);
        assert_eq!(app.frames_rendered, 1);

        // Within the render interval nothing is due.
        assert!(!app.on_tick(now + Duration::from_millis(100)));

        // The next render interval fires again.
        assert!(app.on_tick(now + Duration::from_secs(1)));
        assert_eq!(app.frames_rendered, 2);
    }

    #[test]
    fn test_lagging_render_counts_skipped_frames() {
        let mut app = test_app();
        app.paused = true;

        let now = Instant::now();
        assert!(app.on_tick(now));
        // Wake up four intervals late: one frame drawn, three skipped.
        assert!(app.on_tick(now + Duration::from_secs(4)));
        assert_eq!(app.frames_rendered, 2);
        assert_eq!(app.frames_skipped, 3);
    }

    #[test]
    fn test_next_deadline_is_clamped() {
        let app = test_app();
        let now = Instant::now();
        let wait = app.next_deadline(now);
        assert!(wait >= config::MIN_EVENT_WAIT);
        assert!(wait <= config::MAX_EVENT_WAIT);
    }
}
