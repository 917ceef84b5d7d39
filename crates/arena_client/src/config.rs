//! Client configuration.

use std::time::Duration;

use arena_input::MovementTuning;
use arena_net::connection::{DEFAULT_URL, URL_ENV};
use arena_net::messages::PLAYER_QUERY;

/// Default logical database name.
pub const DEFAULT_DATABASE: &str = "arena";

/// The environment variable used to override the database name.
pub const DATABASE_ENV: &str = "ARENA_DATABASE";

/// Minimum spacing between two input transmissions (20 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Bound on the handshake for automated clients.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Predicted/authoritative divergence beyond which the local pose is re-seeded.
pub const DEFAULT_SNAP_DISTANCE: f32 = 2.0;

/// Configuration for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service endpoint URL.
    pub url: String,
    /// Logical database name sent in the handshake.
    pub database: String,
    /// Read-confirmation mode flag sent in the handshake.
    pub confirmed_reads: bool,
    /// Minimum spacing between input transmissions.
    pub tick_interval: Duration,
    /// Upper bound on the handshake.
    pub handshake_timeout: Duration,
    /// Subscription query issued after the listeners are attached.
    pub query: String,
    /// Speeds used for local prediction.
    pub movement: MovementTuning,
    /// See [`DEFAULT_SNAP_DISTANCE`].
    pub snap_distance: f32,
}

impl ClientConfig {
    /// Defaults, with `ARENA_URL` and `ARENA_DATABASE` applied if set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(URL_ENV) {
            config.url = url;
        }
        if let Ok(database) = std::env::var(DATABASE_ENV) {
            config.database = database;
        }
        config
    }

    /// Override the endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Override the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Override the handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Override the subscription query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            confirmed_reads: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            query: PLAYER_QUERY.to_string(),
            movement: MovementTuning::default(),
            snap_distance: DEFAULT_SNAP_DISTANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.tick_interval, Duration::from_millis(50));
        assert_eq!(config.handshake_timeout, Duration::from_secs(15));
        assert_eq!(config.database, "arena");
        assert_eq!(config.query, "SELECT * FROM player");
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::default()
            .with_url("nats://example:4222")
            .with_database("quickstart")
            .with_tick_interval(Duration::from_millis(100));
        assert_eq!(config.url, "nats://example:4222");
        assert_eq!(config.database, "quickstart");
        assert_eq!(config.tick_interval, Duration::from_millis(100));
    }
}
