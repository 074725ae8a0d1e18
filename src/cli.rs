use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::app::config::TTL_POLL_MULTIPLIER;

/// geowatch — live world map of your host's network traffic.
///
/// Polls the operating system's socket table, resolves each remote
/// endpoint against a local GeoLite2 dataset, and plots the active
/// endpoints on a world map in the terminal. Geolocation is approximate
/// (city-level at best); interpret locations with caution.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "geowatch",
    version,
    about = "Live world map of your host's network traffic",
    long_about = None,
)]
pub struct Cli {
    // ── Dataset ──────────────────────────────────────────────────────────────
    /// Path to the GeoLite2-City `.mmdb` dataset.
    ///
    /// The dataset is read once at startup; a missing or corrupt file is a
    /// fatal error since there is no useful degraded mode without it.
    #[arg(short = 'd', long = "dataset", value_name = "PATH")]
    pub dataset: PathBuf,

    // ── Cadences ─────────────────────────────────────────────────────────────
    /// How often the socket table is polled (e.g. "1s", "500ms").
    #[arg(
        long = "poll-interval",
        value_name = "DUR",
        default_value = "1s",
        value_parser = parse_duration
    )]
    pub poll_interval: Duration,

    /// How often the map is redrawn. Independent of the poll cadence; if
    /// rendering falls behind, frames are skipped rather than queued.
    #[arg(
        long = "render-interval",
        value_name = "DUR",
        default_value = "1s",
        value_parser = parse_duration
    )]
    pub render_interval: Duration,

    /// How long an endpoint stays on the map after its last sighting.
    ///
    /// Defaults to 3x the poll interval, and in that case follows the poll
    /// interval when it is adjusted at runtime with +/-.
    #[arg(long = "ttl", value_name = "DUR", value_parser = parse_duration)]
    pub ttl: Option<Duration>,

    // ── Logging ──────────────────────────────────────────────────────────────
    /// Write log output to this file.
    ///
    /// The TUI owns the terminal, so this is the only log destination;
    /// without it, logging is disabled. Filter with RUST_LOG.
    #[arg(short = 'o', long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    // ── Enumeration ──────────────────────────────────────────────────────────
    /// Also enumerate IPv6 sockets (IPv4 is always on).
    #[arg(long = "ipv6")]
    pub ipv6: bool,
}

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

impl Cli {
    /// The TTL actually in effect: explicit flag or the poll-derived
    /// default.
    pub fn effective_ttl(&self) -> Duration {
        self.ttl
            .unwrap_or(self.poll_interval * TTL_POLL_MULTIPLIER)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("--poll-interval must be greater than zero");
        }
        if self.render_interval.is_zero() {
            bail!("--render-interval must be greater than zero");
        }
        if self.effective_ttl() < self.poll_interval {
            bail!(
                "--ttl ({:?}) must be at least the poll interval ({:?}), \
                 otherwise endpoints expire between polls",
                self.effective_ttl(),
                self.poll_interval
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("args should parse")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["geowatch", "--dataset", "/tmp/GeoLite2-City.mmdb"]);
        assert_eq!(cli.poll_interval, Duration::from_secs(1));
        assert_eq!(cli.render_interval, Duration::from_secs(1));
        assert_eq!(cli.effective_ttl(), Duration::from_secs(3));
        assert!(!cli.ipv6);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_duration_parsing() {
        let cli = parse(&[
            "geowatch",
            "--dataset",
            "/tmp/db.mmdb",
            "--poll-interval",
            "500ms",
            "--ttl",
            "2s",
        ]);
        assert_eq!(cli.poll_interval, Duration::from_millis(500));
        assert_eq!(cli.effective_ttl(), Duration::from_secs(2));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_dataset_is_required() {
        assert!(Cli::try_parse_from(["geowatch"]).is_err());
    }

    #[test]
    fn test_ttl_below_poll_interval_rejected() {
        let cli = parse(&[
            "geowatch",
            "--dataset",
            "/tmp/db.mmdb",
            "--poll-interval",
            "2s",
            "--ttl",
            "1s",
        ]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let cli = parse(&[
            "geowatch",
            "--dataset",
            "/tmp/db.mmdb",
            "--poll-interval",
            "0s",
        ]);
        assert!(cli.validate().is_err());
    }
}
