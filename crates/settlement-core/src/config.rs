//! Configuration loading and typed config structures for the settlement
//! engine.
//!
//! `SimulationConfig` is parsed once at startup from a YAML file (or
//! documented defaults when none is supplied), then the environment
//! variable overrides are layered on top. The result is handed to the
//! server as an `Arc<SimulationConfig>`; there is no hot-reload.

use std::path::Path;

use serde::Deserialize;
use settlement_types::{Resource, ResourceAmounts};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration for the settlement engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Defaults applied to newly generated worlds and settlements.
    #[serde(default)]
    pub world: WorldDefaultsConfig,

    /// Tick rates and batching for the game loop.
    #[serde(default)]
    pub tick: TickConfig,

    /// HTTP server and session settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database and cache connection settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldDefaultsConfig::default(),
            tick: TickConfig::default(),
            server: ServerConfig::default(),
            infrastructure: InfrastructureConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path, falling back
    /// to documented defaults for any field the file omits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.infrastructure.apply_env_overrides();
        config.server.apply_env_overrides();
        config.tick.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from the documented defaults only, still
    /// applying environment variable overrides. Used when no config file
    /// is present at startup.
    pub fn from_defaults() -> Self {
        let mut config = Self::default();
        config.infrastructure.apply_env_overrides();
        config.server.apply_env_overrides();
        config.tick.apply_env_overrides();
        config
    }

    /// Parse configuration from a YAML string, without applying
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Defaults applied when generating new worlds and settlements.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldDefaultsConfig {
    /// Random seed used for world generation and disaster scheduling when
    /// none is supplied explicitly.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Starting resource storage for a newly founded settlement.
    #[serde(default = "default_starting_resources")]
    pub starting_resources: ResourceAmounts,

    /// Global production multiplier (`worldMul`) applied uniformly across
    /// a world's settlements.
    #[serde(default = "default_world_multiplier")]
    pub world_multiplier_percent: u32,
}

impl Default for WorldDefaultsConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            starting_resources: default_starting_resources(),
            world_multiplier_percent: default_world_multiplier(),
        }
    }
}

/// Tick rates and event batching for the game loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TickConfig {
    /// Economic tick frequency in Hz (production, population, construction
    /// promotion).
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Disaster engine sub-tick frequency in Hz, used only while a
    /// disaster is in IMPACT.
    #[serde(default = "default_disaster_tick_hz")]
    pub disaster_tick_hz: u32,

    /// How often construction-progress events are coalesced into a single
    /// batch, in milliseconds.
    #[serde(default = "default_construction_batch_interval_ms")]
    pub construction_batch_interval_ms: u64,

    /// Soft per-settlement tick deadline in milliseconds; exceeding it
    /// defers the settlement to the next tick with a warning logged.
    #[serde(default = "default_settlement_deadline_ms")]
    pub settlement_deadline_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            disaster_tick_hz: default_disaster_tick_hz(),
            construction_batch_interval_ms: default_construction_batch_interval_ms(),
            settlement_deadline_ms: default_settlement_deadline_ms(),
        }
    }
}

impl TickConfig {
    /// Override tick rates with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(val) = parse_env("TICK_HZ") {
            self.tick_hz = val;
        }
        if let Some(val) = parse_env("DISASTER_TICK_HZ") {
            self.disaster_tick_hz = val;
        }
        if let Some(val) = parse_env("CONSTRUCTION_BATCH_INTERVAL_MS") {
            self.construction_batch_interval_ms = val;
        }
    }

    /// The economic tick interval as a `Duration`.
    #[must_use]
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

/// HTTP server and session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Port the HTTP/event-channel server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins for the browser client.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Secret used to sign session cookies.
    #[serde(default = "default_session_secret")]
    pub session_secret: String,

    /// Structure-metadata cache TTL in seconds.
    #[serde(default = "default_metadata_cache_ttl_s")]
    pub metadata_cache_ttl_s: u64,

    /// Deployment environment name (`development`, `production`, ...).
    #[serde(default = "default_node_env")]
    pub node_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: default_cors_origins(),
            session_secret: default_session_secret(),
            metadata_cache_ttl_s: default_metadata_cache_ttl_s(),
            node_env: default_node_env(),
        }
    }
}

impl ServerConfig {
    /// Override server settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(val) = parse_env("PORT") {
            self.port = val;
        }
        if let Ok(val) = std::env::var("CORS_ORIGINS") {
            self.cors_origins = val.split(',').map(str::trim).map(str::to_owned).collect();
        }
        if let Ok(val) = std::env::var("SESSION_SECRET") {
            self.session_secret = val;
        }
        if let Some(val) = parse_env("METADATA_CACHE_TTL_S") {
            self.metadata_cache_ttl_s = val;
        }
        if let Ok(val) = std::env::var("NODE_ENV") {
            self.node_env = val;
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection string.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl InfrastructureConfig {
    /// Override the database URL with `DATABASE_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database_url = val;
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}

fn default_seed() -> u64 {
    0
}

fn default_starting_resources() -> ResourceAmounts {
    ResourceAmounts::from([
        (Resource::Food, 50),
        (Resource::Water, 100),
        (Resource::Wood, 50),
        (Resource::Stone, 30),
        (Resource::Ore, 10),
    ])
}

const fn default_world_multiplier() -> u32 {
    100
}

const fn default_tick_hz() -> u32 {
    1
}

const fn default_disaster_tick_hz() -> u32 {
    4
}

const fn default_construction_batch_interval_ms() -> u64 {
    1_000
}

const fn default_settlement_deadline_ms() -> u64 {
    1_000
}

const fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_owned()]
}

fn default_session_secret() -> String {
    "dev-session-secret-change-me".to_owned()
}

const fn default_metadata_cache_ttl_s() -> u64 {
    300
}

fn default_node_env() -> String {
    "development".to_owned()
}

fn default_database_url() -> String {
    "postgresql://localhost/settlement_engine".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_resolved_open_question() {
        let config = SimulationConfig::default();
        assert_eq!(
            config.world.starting_resources.get(&Resource::Ore).copied(),
            Some(10)
        );
        assert_eq!(
            config.world.starting_resources.get(&Resource::Water).copied(),
            Some(100)
        );
    }

    #[test]
    fn parse_applies_field_level_defaults() {
        let config = SimulationConfig::parse("tick:\n  tick_hz: 2\n").unwrap();
        assert_eq!(config.tick.tick_hz, 2);
        assert_eq!(config.tick.disaster_tick_hz, default_disaster_tick_hz());
        assert_eq!(config.server.port, default_port());
    }

    #[test]
    fn empty_yaml_document_uses_all_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = SimulationConfig::parse("tick: [this is not a mapping");
        assert!(result.is_err());
    }

    #[test]
    fn tick_interval_is_the_reciprocal_of_tick_hz() {
        let config = TickConfig {
            tick_hz: 4,
            ..TickConfig::default()
        };
        assert_eq!(config.tick_interval(), std::time::Duration::from_millis(250));
    }
}
