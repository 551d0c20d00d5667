//! Engine tuning loaded from the environment.

use std::time::Duration;

/// Default bound on concurrent per-recipient dispatches within one fanout.
const DEFAULT_FANOUT_CONCURRENCY: usize = 8;

/// Default deadline for a single channel side effect.
const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 10;

/// Default bound on the reconciler's unread scan.
const DEFAULT_SOURCE_SCAN_LIMIT: i64 = 500;

/// Default age (from `read_at`) after which read notifications are deleted.
const DEFAULT_READ_RETENTION_DAYS: i64 = 30;

/// Default period of the cleanup sweeper.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Upper bound on read retention; keeps `now - retention` representable.
const MAX_READ_RETENTION_DAYS: i64 = 36_500;

const MIN_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub fanout_concurrency: usize,
    pub channel_timeout: Duration,
    pub source_scan_limit: i64,
    pub read_retention_days: i64,
    pub sweep_interval: Duration,
}

impl NotificationConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                       | Default |
    /// |--------------------------------|---------|
    /// | `NOTIFY_FANOUT_CONCURRENCY`    | `8`     |
    /// | `NOTIFY_CHANNEL_TIMEOUT_SECS`  | `10`    |
    /// | `NOTIFY_SOURCE_SCAN_LIMIT`     | `500`   |
    /// | `NOTIFY_READ_RETENTION_DAYS`   | `30`    |
    /// | `NOTIFY_SWEEP_INTERVAL_SECS`   | `3600`  |
    ///
    /// Unparseable values fall back to the default; out-of-range values are
    /// clamped (see [`NotificationConfig::normalized`]).
    pub fn from_env() -> Self {
        Self {
            fanout_concurrency: env_or("NOTIFY_FANOUT_CONCURRENCY", DEFAULT_FANOUT_CONCURRENCY),
            channel_timeout: Duration::from_secs(env_or(
                "NOTIFY_CHANNEL_TIMEOUT_SECS",
                DEFAULT_CHANNEL_TIMEOUT_SECS,
            )),
            source_scan_limit: env_or("NOTIFY_SOURCE_SCAN_LIMIT", DEFAULT_SOURCE_SCAN_LIMIT),
            read_retention_days: env_or("NOTIFY_READ_RETENTION_DAYS", DEFAULT_READ_RETENTION_DAYS),
            sweep_interval: Duration::from_secs(env_or(
                "NOTIFY_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
        }
        .normalized()
    }

    /// Clamp every field into its usable range: at least one concurrent
    /// dispatch, one scanned row, one day of retention (at most
    /// `MAX_READ_RETENTION_DAYS`), and one second for each period.
    pub fn normalized(self) -> Self {
        Self {
            fanout_concurrency: self.fanout_concurrency.max(1),
            channel_timeout: self.channel_timeout.max(MIN_PERIOD),
            source_scan_limit: self.source_scan_limit.max(1),
            read_retention_days: self.read_retention_days.clamp(1, MAX_READ_RETENTION_DAYS),
            sweep_interval: self.sweep_interval.max(MIN_PERIOD),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            channel_timeout: Duration::from_secs(DEFAULT_CHANNEL_TIMEOUT_SECS),
            source_scan_limit: DEFAULT_SOURCE_SCAN_LIMIT,
            read_retention_days: DEFAULT_READ_RETENTION_DAYS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NotificationConfig::default();
        assert_eq!(config.fanout_concurrency, 8);
        assert_eq!(config.channel_timeout, Duration::from_secs(10));
        assert_eq!(config.source_scan_limit, 500);
        assert_eq!(config.read_retention_days, 30);
    }

    #[test]
    fn normalized_clamps_out_of_range_values() {
        let config = NotificationConfig {
            fanout_concurrency: 0,
            channel_timeout: Duration::ZERO,
            source_scan_limit: -5,
            read_retention_days: i64::MAX,
            sweep_interval: Duration::ZERO,
        }
        .normalized();

        assert_eq!(config.fanout_concurrency, 1);
        assert_eq!(config.channel_timeout, Duration::from_secs(1));
        assert_eq!(config.source_scan_limit, 1);
        assert_eq!(config.read_retention_days, MAX_READ_RETENTION_DAYS);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));

        let config = NotificationConfig {
            read_retention_days: -3,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.read_retention_days, 1);
    }

    #[test]
    fn normalized_keeps_defaults() {
        let config = NotificationConfig::default().normalized();
        assert_eq!(config.fanout_concurrency, DEFAULT_FANOUT_CONCURRENCY);
        assert_eq!(config.source_scan_limit, DEFAULT_SOURCE_SCAN_LIMIT);
        assert_eq!(config.sweep_interval, Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));
    }
}
