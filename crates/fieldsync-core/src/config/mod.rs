//! Client configuration.
//!
//! Resolves the remote API endpoint, local storage location and HTTP limits
//! from `FIELDSYNC_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::store::{StoreBackend, StoreConfig};
use crate::util::{http_base_url, non_empty};

const ENV_API_URL: &str = "FIELDSYNC_API_URL";
const ENV_API_TOKEN: &str = "FIELDSYNC_API_TOKEN";
const ENV_DB_PATH: &str = "FIELDSYNC_DB_PATH";
const ENV_DATA_DIR: &str = "FIELDSYNC_DATA_DIR";
const ENV_STORAGE: &str = "FIELDSYNC_STORAGE";
const ENV_HTTP_TIMEOUT_SECS: &str = "FIELDSYNC_HTTP_TIMEOUT_SECS";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote API base URL without trailing slash
    pub api_url: Option<String>,
    /// Bearer token for the remote API
    pub api_token: Option<String>,
    /// Offline database file
    pub db_path: Option<PathBuf>,
    /// Root that relative photo and recording paths resolve against
    pub data_dir: Option<PathBuf>,
    pub storage: StoreBackend,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            db_path: None,
            data_dir: None,
            storage: StoreBackend::Auto,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("db_path", &self.db_path)
            .field("data_dir", &self.data_dir)
            .field("storage", &self.storage)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    /// Local store settings derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.storage,
            db_path: self.db_path.clone(),
        }
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
    let api_url = non_empty(lookup(ENV_API_URL))
        .map(|url| {
            http_base_url(&url).ok_or_else(|| {
                Error::InvalidInput(format!("{ENV_API_URL} must include http:// or https://"))
            })
        })
        .transpose()?;

    let storage = match non_empty(lookup(ENV_STORAGE)) {
        Some(raw) => raw
            .parse::<StoreBackend>()
            .map_err(|error| Error::InvalidInput(format!("{ENV_STORAGE}: {error}")))?,
        None => StoreBackend::Auto,
    };

    let http_timeout = match non_empty(lookup(ENV_HTTP_TIMEOUT_SECS)) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "{ENV_HTTP_TIMEOUT_SECS} must be a positive number of seconds, got '{raw}'"
                )))
            }
        },
        None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
    };

    Ok(ClientConfig {
        api_url,
        api_token: non_empty(lookup(ENV_API_TOKEN)),
        db_path: non_empty(lookup(ENV_DB_PATH)).map(PathBuf::from),
        data_dir: non_empty(lookup(ENV_DATA_DIR)).map(PathBuf::from),
        storage,
        http_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<ClientConfig> {
        parse_config(|key| map.get(key).map(ToString::to_string))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = parse_from_map(&HashMap::new()).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn parse_config_reads_and_normalizes_values() {
        let mut map = HashMap::new();
        map.insert(ENV_API_URL, " https://inspections.example.com/ ");
        map.insert(ENV_API_TOKEN, "tok");
        map.insert(ENV_DB_PATH, "/var/lib/fieldsync/offline.db");
        map.insert(ENV_DATA_DIR, "/var/lib/fieldsync");
        map.insert(ENV_STORAGE, "SQLite");
        map.insert(ENV_HTTP_TIMEOUT_SECS, "12");

        let config = parse_from_map(&map).unwrap();
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://inspections.example.com")
        );
        assert_eq!(config.api_token.as_deref(), Some("tok"));
        assert_eq!(config.storage, StoreBackend::Sqlite);
        assert_eq!(config.http_timeout, Duration::from_secs(12));
        assert_eq!(
            config.store_config(),
            StoreConfig::sqlite("/var/lib/fieldsync/offline.db")
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut map = HashMap::new();
        map.insert(ENV_API_TOKEN, "   ");
        map.insert(ENV_STORAGE, "");

        let config = parse_from_map(&map).unwrap();
        assert_eq!(config.api_token, None);
        assert_eq!(config.storage, StoreBackend::Auto);
    }

    #[test]
    fn parse_config_rejects_invalid_values() {
        for (key, value) in [
            (ENV_API_URL, "inspections.example.com"),
            (ENV_STORAGE, "indexeddb"),
            (ENV_HTTP_TIMEOUT_SECS, "0"),
            (ENV_HTTP_TIMEOUT_SECS, "soon"),
        ] {
            let map = HashMap::from([(key, value)]);
            match parse_from_map(&map).unwrap_err() {
                Error::InvalidInput(message) => assert!(message.contains(key), "{message}"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClientConfig {
            api_token: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        assert!(!format!("{config:?}").contains("secret"));
    }
}
