use crate::config::types::{Config, OutputConfig, SourceConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable holding the site root
pub const ENV_BASE_URL: &str = "BASE_URL";

/// Environment variable holding the comma-separated city list
pub const ENV_CITY_NAMES: &str = "CITY_NAMES";

/// Environment variable holding the SQLite database path
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";

const DEFAULT_DATABASE_PATH: &str = "./listings.db";

/// Loads and parses a configuration file from the given path
///
/// Values from `BASE_URL`, `CITY_NAMES` and `DATABASE_PATH` in the process
/// environment take precedence over the file.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use listing_harvester::config::load_config;
///
/// let config = load_config(Path::new("harvester.toml")).unwrap();
/// println!("Cities: {:?}", config.source.city_names());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with(path, env_lookup)
}

/// Same as [`load_config`], reading overrides through `lookup`
pub fn load_config_with<F>(path: &Path, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_overrides_from(lookup);
    validate(&config)?;
    Ok(config)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Builds a configuration purely from the process environment
    ///
    /// `BASE_URL` and `CITY_NAMES` are required; everything else falls back
    /// to its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Builds a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::MissingEnv(ENV_BASE_URL))?;
        let cities = lookup(ENV_CITY_NAMES).ok_or(ConfigError::MissingEnv(ENV_CITY_NAMES))?;
        let database_path =
            lookup(ENV_DATABASE_PATH).unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let config = Config {
            source: SourceConfig { base_url, cities },
            crawler: Default::default(),
            user_agent: Default::default(),
            output: OutputConfig { database_path },
            server: Default::default(),
        };

        validate(&config)?;
        Ok(config)
    }

    /// Overwrites file values with environment values where present
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_lookup);
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.source.base_url = base_url;
        }
        if let Some(cities) = lookup(ENV_CITY_NAMES) {
            self.source.cities = cities;
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.output.database_path = path;
        }
    }

    /// Hex-encoded SHA-256 of the effective configuration
    ///
    /// Recorded with each ingestion run to tell runs with different settings
    /// apart.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}
