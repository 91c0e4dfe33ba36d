//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for a Skirmish session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Network/session settings.
    pub network: NetworkConfig,
    /// Follower reconnection policy.
    pub reconnect: ReconnectConfig,
    /// World simulation tuning (host authority only).
    pub world: WorldConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Network and replication cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Rendezvous host that room-code addresses resolve against.
    pub rendezvous_host: String,
    /// First port of the rendezvous range.
    pub port_base: u16,
    /// Number of ports room codes hash into.
    pub port_span: u16,
    /// Rate at which a follower sends its own player state (Hz).
    pub input_rate_hz: u32,
    /// Rate at which the host broadcasts world deltas (Hz).
    pub broadcast_rate_hz: u32,
    /// Watchdog interval between unconditional full snapshots (seconds).
    pub full_sync_interval_secs: u32,
    /// Maximum wire frame size in KiB.
    pub max_frame_kib: u32,
}

/// Exponential-backoff reconnection policy for followers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Consecutive failures tolerated before the session is abandoned.
    pub max_attempts: u32,
    /// Uniform random jitter added to each delay, in milliseconds.
    pub jitter_ms: u64,
}

/// Host-side world simulation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// In-game hours advanced per real second.
    pub time_scale: f32,
    /// How long a corpse persists before decaying into a bloom marker (ms).
    pub corpse_decay_ms: u64,
    /// Radius within which units notice hostiles (meters).
    pub detection_radius: f32,
    /// Hour at which night begins (24h clock).
    pub night_start_hour: f32,
    /// Hour at which night ends.
    pub night_end_hour: f32,
    /// Radius around home inside which unowned units wander (meters).
    pub wander_radius: f32,
    /// Distance below which a unit counts as arrived at its target (meters).
    pub arrival_tolerance: f32,
    /// Distance beyond which a following unit re-approaches its owner (meters).
    pub follow_distance: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log every decoded protocol message at trace level.
    pub trace_protocol: bool,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rendezvous_host: "127.0.0.1".to_string(),
            port_base: 42000,
            port_span: 512,
            input_rate_hz: 50,
            broadcast_rate_hz: 20,
            full_sync_interval_secs: 5,
            max_frame_kib: 1024,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
            jitter_ms: 1_000,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            time_scale: 0.02,
            corpse_decay_ms: 1_200_000,
            detection_radius: 30.0,
            night_start_hour: 20.0,
            night_end_hour: 6.0,
            wander_radius: 20.0,
            arrival_tolerance: 0.5,
            follow_distance: 4.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trace_protocol: false,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("skirmish.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `skirmish.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("skirmish.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("skirmish.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Default config directory under the platform config dir.
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|d| d.join("skirmish"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("port_base: 42000"));
        assert!(ron_str.contains("input_rate_hz: 50"));
        assert!(ron_str.contains("max_attempts: 5"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.network.broadcast_rate_hz = 10;
        config.world.corpse_decay_ms = 60_000;

        let ron_str = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new()).unwrap();
        let parsed: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("skirmish.ron").exists());
    }

    #[test]
    fn test_load_or_create_reads_existing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.network.port_base = 55000;
        config.save(dir.path()).unwrap();

        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(loaded.network.port_base, 55000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        // Forward compatibility: a file with only one section parses and
        // backfills everything else from Default.
        let partial = "(network: (port_base: 50000))";
        let config: Config = ron::from_str(partial).unwrap();
        assert_eq!(config.network.port_base, 50000);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.world.night_start_hour, 20.0);
    }

    #[test]
    fn test_reload_detects_change() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());

        let mut changed = config.clone();
        changed.debug.log_level = "debug".to_string();
        changed.save(dir.path()).unwrap();

        let reloaded = config.reload(dir.path()).unwrap();
        assert_eq!(reloaded.unwrap().debug.log_level, "debug");
    }
}
