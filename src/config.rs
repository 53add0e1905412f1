//! Configuration schema and loading helpers.
//!
//! A [`BlockCacheConfig`] is read from TOML (every field optional, unknown
//! fields rejected) and may be overridden by `BLOCKCACHE__section__field`
//! environment variables:
//!
//! ```toml
//! [cache]
//! capacity = 4096
//! bypass_sequential = true
//!
//! [space]
//! size = 67108864
//! alignment = 64
//!
//! [pattern]
//! sequential_condition = 8
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Environment variable naming a TOML file for [`BlockCacheConfig::load_from_env`].
pub const CONFIG_PATH_ENV: &str = "BLOCKCACHE_CONFIG";

const ENV_PREFIX: &str = "BLOCKCACHE__";

/// Errors returned by configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading config files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// A field holds a value the cache cannot run with.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path, e.g. `space.alignment`.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// An override value failed to parse.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Environment key.
        key: String,
        /// Raw value string.
        value: String,
    },
    /// Unknown override key.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Cache engine sizing and admission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Number of resident entries. Zero disables caching.
    pub capacity: usize,
    /// Largest initial table per key-index shard.
    pub max_shard_capacity: usize,
    /// Skip admission while the access stream is sequential.
    pub bypass_sequential: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_shard_capacity: 1 << 16,
            bypass_sequential: true,
        }
    }
}

/// Managed address range and size-class resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpaceConfig {
    pub base: u64,
    pub size: u64,
    /// Allocation granularity; a power of two, at least 4.
    pub alignment: u64,
    /// `log2` of the second-level class count, in `1..=6`.
    pub second_level_log2: u32,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            base: 0,
            size: 64 * 1024 * 1024,
            alignment: 4,
            second_level_log2: 6,
        }
    }
}

/// Sequential/random classifier thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternConfig {
    /// Contiguous pairs a batch look-ahead run needs to count as sequential.
    pub sequential_limiting: usize,
    /// Contiguous accesses that switch the stream to sequential.
    pub sequential_condition: u32,
    /// Non-contiguous accesses beyond which a sequential stream turns random.
    pub random_condition: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            sequential_limiting: 4,
            sequential_condition: 8,
            random_condition: 4,
        }
    }
}

/// Top-level configuration schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockCacheConfig {
    pub cache: CacheConfig,
    pub space: SpaceConfig,
    pub pattern: PatternConfig,
}

impl BlockCacheConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load configuration from the `BLOCKCACHE_CONFIG` file (if set), then
    /// apply `BLOCKCACHE__section__field` overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_ENV).ok() {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_overrides(env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `BLOCKCACHE__section__field = value` pairs; other keys are
    /// ignored. Does not validate.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(path) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path = path.to_ascii_lowercase();
            let parts: Vec<&str> = path.split("__").collect();
            let value = value.as_ref().trim();

            match parts.as_slice() {
                ["cache", "capacity"] => self.cache.capacity = parse_value(key, value)?,
                ["cache", "max_shard_capacity"] => {
                    self.cache.max_shard_capacity = parse_value(key, value)?
                },
                ["cache", "bypass_sequential"] => {
                    self.cache.bypass_sequential = parse_value(key, value)?
                },
                ["space", "base"] => self.space.base = parse_value(key, value)?,
                ["space", "size"] => self.space.size = parse_value(key, value)?,
                ["space", "alignment"] => self.space.alignment = parse_value(key, value)?,
                ["space", "second_level_log2"] => {
                    self.space.second_level_log2 = parse_value(key, value)?
                },
                ["pattern", "sequential_limiting"] => {
                    self.pattern.sequential_limiting = parse_value(key, value)?
                },
                ["pattern", "sequential_condition"] => {
                    self.pattern.sequential_condition = parse_value(key, value)?
                },
                ["pattern", "random_condition"] => {
                    self.pattern.random_condition = parse_value(key, value)?
                },
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            }
            tracing::debug!(key, value, "configuration override applied");
        }
        Ok(())
    }

    /// Rejects values the cache cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_shard_capacity == 0 {
            return Err(invalid("cache.max_shard_capacity", "must be > 0"));
        }
        let space = &self.space;
        if space.size == 0 {
            return Err(invalid("space.size", "must be > 0"));
        }
        if usize::try_from(space.size).is_err() {
            return Err(invalid("space.size", "exceeds addressable memory"));
        }
        if space.base.checked_add(space.size).is_none() {
            return Err(invalid("space.size", "base + size overflows"));
        }
        if !space.alignment.is_power_of_two() || space.alignment < 4 {
            return Err(invalid("space.alignment", "must be a power of two >= 4"));
        }
        if !(1..=6).contains(&space.second_level_log2) {
            return Err(invalid("space.second_level_log2", "must be in 1..=6"));
        }
        if self.pattern.sequential_limiting == 0 {
            return Err(invalid("pattern.sequential_limiting", "must be > 0"));
        }
        if self.pattern.sequential_condition == 0 {
            return Err(invalid("pattern.sequential_condition", "must be > 0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
