//! Process-level configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::routing::{RoutingRequest, StopDistanceCache};
use crate::timetable::DEFAULT_MAX_SNAPSHOT_FREQUENCY;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_VAR: &str = "TRIP_ROUTER_CONFIG";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An environment override could not be parsed
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: String, value: String },
}

/// Router settings. Every field has a default, so a config file only
/// needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub bind_addr: SocketAddr,
    /// JSON network description to load at startup.
    pub network_path: Option<PathBuf>,
    /// JSON file of trip updates, polled by the background updater.
    pub trip_updates_path: Option<PathBuf>,
    pub updater_poll_interval_ms: u64,
    /// Minimum time between published timetable snapshots.
    pub snapshot_interval_ms: u64,
    pub purge_expired_data: bool,

    /// Search timeout applied when a request gives none. Zero disables it.
    pub default_timeout_ms: u64,
    pub oversearch_multiplier: f64,
    pub max_transit_speed: f64,
    pub num_itineraries: usize,

    pub distance_cache_capacity: u64,
    pub distance_cache_ttl_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            network_path: None,
            trip_updates_path: None,
            updater_poll_interval_ms: 30_000,
            snapshot_interval_ms: DEFAULT_MAX_SNAPSHOT_FREQUENCY.as_millis() as u64,
            purge_expired_data: false,
            default_timeout_ms: 5_000,
            oversearch_multiplier: 4.0,
            max_transit_speed: 40.0,
            num_itineraries: 3,
            distance_cache_capacity: 10_000,
            distance_cache_ttl_secs: 3_600,
        }
    }
}

impl RouterConfig {
    /// Load from the file named by `TRIP_ROUTER_CONFIG`, if set, then
    /// apply `TRIP_ROUTER_*` overrides from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::from_path(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `lookup`, which maps variable names such as
    /// `TRIP_ROUTER_BIND_ADDR` to values.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        override_parsed(&lookup, "TRIP_ROUTER_BIND_ADDR", &mut self.bind_addr)?;
        if let Some(path) = lookup("TRIP_ROUTER_NETWORK") {
            self.network_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("TRIP_ROUTER_TRIP_UPDATES") {
            self.trip_updates_path = Some(PathBuf::from(path));
        }
        override_parsed(
            &lookup,
            "TRIP_ROUTER_POLL_INTERVAL_MS",
            &mut self.updater_poll_interval_ms,
        )?;
        override_parsed(
            &lookup,
            "TRIP_ROUTER_SNAPSHOT_INTERVAL_MS",
            &mut self.snapshot_interval_ms,
        )?;
        override_parsed(&lookup, "TRIP_ROUTER_PURGE_EXPIRED", &mut self.purge_expired_data)?;
        override_parsed(&lookup, "TRIP_ROUTER_TIMEOUT_MS", &mut self.default_timeout_ms)?;
        Ok(())
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.updater_poll_interval_ms)
    }

    /// Fill in the options a client left at their library defaults.
    pub fn apply_defaults(&self, request: &mut RoutingRequest) {
        if request.timeout.is_none() && self.default_timeout_ms > 0 {
            request.timeout = Some(Duration::from_millis(self.default_timeout_ms));
        }
        request.oversearch_multiplier = self.oversearch_multiplier;
        request.max_transit_speed = self.max_transit_speed;
    }

    pub fn distance_cache(&self) -> StopDistanceCache {
        moka::sync::Cache::builder()
            .max_capacity(self.distance_cache_capacity)
            .time_to_live(Duration::from_secs(self.distance_cache_ttl_secs))
            .build()
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    field: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(var) {
        *field = value.parse().map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"snapshot_interval_ms": 250, "network_path": "net.json"}"#)
            .unwrap();
        let config = RouterConfig::from_path(file.path()).unwrap();
        assert_eq!(config.snapshot_interval(), Duration::from_millis(250));
        assert_eq!(config.network_path, Some(PathBuf::from("net.json")));
        assert_eq!(config.oversearch_multiplier, 4.0);
        assert_eq!(config.bind_addr, RouterConfig::default().bind_addr);
    }

    #[test]
    fn default_snapshot_interval_is_one_second() {
        assert_eq!(
            RouterConfig::default().snapshot_interval(),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn malformed_and_missing_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"bind_addr\": 7}").unwrap();
        assert!(matches!(
            RouterConfig::from_path(file.path()),
            Err(ConfigError::Json { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let err = RouterConfig::from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn environment_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("TRIP_ROUTER_BIND_ADDR", "0.0.0.0:8080"),
            ("TRIP_ROUTER_TRIP_UPDATES", "/tmp/updates.json"),
            ("TRIP_ROUTER_PURGE_EXPIRED", "true"),
        ]
        .into_iter()
        .collect();
        let mut config = RouterConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.trip_updates_path, Some(PathBuf::from("/tmp/updates.json")));
        assert!(config.purge_expired_data);
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = RouterConfig::default();
        let err = config
            .apply_overrides(|k| (k == "TRIP_ROUTER_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"soon\" for TRIP_ROUTER_TIMEOUT_MS");
    }

    #[test]
    fn defaults_fill_request() {
        use crate::domain::VertexId;

        let config = RouterConfig {
            oversearch_multiplier: 2.5,
            ..RouterConfig::default()
        };
        let mut request = RoutingRequest::new(VertexId(0), VertexId(1), 0);
        config.apply_defaults(&mut request);
        assert_eq!(request.timeout, Some(Duration::from_millis(5_000)));
        assert_eq!(request.oversearch_multiplier, 2.5);
    }
}
