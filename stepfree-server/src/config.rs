//! Server configuration file (TOML)

use std::path::Path;

use serde::{Deserialize, Serialize};
use stepfree_core::{ImportConfig, PLATFORM_MATCH_RADIUS, WalkingTime};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub import: ImportConfig,
    pub server: ServeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    /// Seconds between two reads of the elevator feed, no refresh if unset
    pub feed_refresh_secs: Option<u64>,
    pub max_concurrent_requests: usize,
    /// Meters between a query point and its street node
    pub offset_match_radius: f64,
    /// Upper bound for the `max` query parameter, seconds
    pub max_offset_duration: WalkingTime,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            feed_refresh_secs: Some(60),
            max_concurrent_requests: 64,
            offset_match_radius: PLATFORM_MATCH_RADIUS,
            max_offset_duration: 30 * 60,
        }
    }
}

impl ServerConfig {
    pub fn read(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {e}", path.display()))?;
        Ok(toml::from_str(&text)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepfree_core::Feature;

    #[test]
    fn partial_files_use_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [import]
            streets = "input/streets"
            gtfs_dirs = ["input/gtfs"]
            disabled_features = ["elevators"]

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.import.has_feature(Feature::Elevators));
        assert_eq!(
            config.import.max_footpath_duration,
            stepfree_core::MAX_FOOTPATH_DURATION
        );
    }

    #[test]
    fn written_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = ServerConfig::default();
        config.import.gtfs_dirs = vec!["gtfs".into()];
        config.server.feed_refresh_secs = Some(300);

        config.write(&path).unwrap();
        assert_eq!(ServerConfig::read(&path).unwrap(), config);
    }
}
