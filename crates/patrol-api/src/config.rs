use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use patrol_core::storage::R2Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration. `R2Config` redacts its secret, so the derived
/// `Debug` is safe to log.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub lock_timeout: Duration,
    pub default_folder: String,
    pub max_body_bytes: usize,
    pub r2: Option<R2Config>,
}

const MIN_BODY_BYTES: usize = 1024;
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "PATROL_API_BIND_ADDR", "127.0.0.1:8080");
        let db_path = PathBuf::from(value_or_default(&lookup, "PATROL_DB_PATH", "patrol.db"));

        let lock_timeout_secs = value_or_default(&lookup, "PATROL_LOCK_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "PATROL_LOCK_TIMEOUT_SECS must be an integer in [1, 120]".to_string(),
                )
            })?;
        if !(1..=120).contains(&lock_timeout_secs) {
            return Err(ConfigError::Invalid(
                "PATROL_LOCK_TIMEOUT_SECS must be in [1, 120]".to_string(),
            ));
        }

        let default_folder = value_or_default(&lookup, "PATROL_DEFAULT_FOLDER", "root");

        let max_body_bytes = value_or_default(&lookup, "PATROL_MAX_BODY_BYTES", "16777216")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "PATROL_MAX_BODY_BYTES must be an integer in [1024, 67108864]".to_string(),
                )
            })?;
        if !(MIN_BODY_BYTES..=MAX_BODY_BYTES).contains(&max_body_bytes) {
            return Err(ConfigError::Invalid(
                "PATROL_MAX_BODY_BYTES must be in [1024, 67108864]".to_string(),
            ));
        }

        let r2 = R2Config::from_lookup(&lookup)
            .map_err(|error| ConfigError::Invalid(error.to_string()))?;

        Ok(Self {
            bind_addr,
            db_path,
            lock_timeout: Duration::from_secs(lock_timeout_secs),
            default_folder,
            max_body_bytes,
            r2,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = parse(&HashMap::new()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.db_path, PathBuf::from("patrol.db"));
        assert_eq!(config.lock_timeout, Duration::from_secs(10));
        assert_eq!(config.default_folder, "root");
        assert_eq!(config.max_body_bytes, 16 * 1024 * 1024);
        assert!(config.r2.is_none());
    }

    #[test]
    fn lock_timeout_is_bounded() {
        let mut map = HashMap::new();
        map.insert("PATROL_LOCK_TIMEOUT_SECS", "0");
        assert!(parse(&map)
            .unwrap_err()
            .to_string()
            .contains("PATROL_LOCK_TIMEOUT_SECS"));

        map.insert("PATROL_LOCK_TIMEOUT_SECS", "soon");
        assert!(parse(&map).is_err());

        map.insert("PATROL_LOCK_TIMEOUT_SECS", " 30 ");
        assert_eq!(parse(&map).unwrap().lock_timeout, Duration::from_secs(30));
    }

    #[test]
    fn body_limit_is_bounded() {
        let mut map = HashMap::new();
        map.insert("PATROL_MAX_BODY_BYTES", "512");
        assert!(parse(&map).is_err());
        map.insert("PATROL_MAX_BODY_BYTES", "1048576");
        assert_eq!(parse(&map).unwrap().max_body_bytes, 1_048_576);
    }

    #[test]
    fn partial_r2_configuration_is_rejected() {
        let mut map = HashMap::new();
        map.insert("R2_BUCKET", "photos");
        let err = parse(&map).unwrap_err();
        assert!(err.to_string().contains("R2_ACCOUNT_ID"));
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let mut map = HashMap::new();
        map.insert("R2_ACCOUNT_ID", "acc");
        map.insert("R2_BUCKET", "bucket");
        map.insert("R2_ACCESS_KEY_ID", "access");
        map.insert("R2_SECRET_ACCESS_KEY", "sensitive-r2-secret");
        map.insert("R2_PUBLIC_BASE_URL", "https://photos.example.com");

        let config = parse(&map).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-r2-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
