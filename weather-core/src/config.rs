use directories::ProjectDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use url::Url;

use crate::error::{Error, Result};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "WEATHER_JOB_CONFIG";

/// Config file looked up in the working directory before the platform dir.
pub const LOCAL_CONFIG_FILE: &str = "conf.toml";

/// Settings for the weatherstack API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// weatherstack `access_key`.
    pub key: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// When set, today's date is sent as `historical_date`.
    #[serde(default)]
    pub historical_date: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location: default_location(),
            base_url: default_base_url(),
            historical_date: false,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Connection settings for the destination database.
///
/// Example TOML:
/// [db]
/// name = "weather"
/// user = "postgres"
/// password = "..."
/// host = "localhost"
/// port = 5432
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection url; takes precedence over the individual parts.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DatabaseConfig {
    /// Settings that connect straight to `url`.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            name: String::new(),
            user: String::new(),
            password: String::new(),
            host: default_db_host(),
            port: default_db_port(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the connection url, building a PostgreSQL one from parts
    /// when no explicit `url` is configured.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        if self.name.is_empty() {
            return Err(Error::InvalidDatabaseConfig("`name` is required".into()));
        }
        if self.user.is_empty() {
            return Err(Error::InvalidDatabaseConfig("`user` is required".into()));
        }

        let invalid = |what: &str| Error::InvalidDatabaseConfig(format!("invalid {what}"));

        let mut url = Url::parse("postgres://localhost").map_err(|_| invalid("url"))?;
        url.set_host(Some(&self.host)).map_err(|_| invalid("`host`"))?;
        url.set_port(Some(self.port)).map_err(|_| invalid("`port`"))?;
        url.set_username(&self.user).map_err(|_| invalid("`user`"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("`password`"))?;
        }
        url.set_path(&self.name);

        Ok(url.into())
    }
}

/// Top-level configuration for one job run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub weatherstack: ProviderConfig,
    pub db: DatabaseConfig,
}

impl Config {
    /// Load config from the first location that exists, see [`Config::config_file_path`].
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| Error::ConfigParse { path, source })
    }

    /// Path to the config file: `$WEATHER_JOB_CONFIG`, then `./conf.toml`,
    /// then `config.toml` in the platform config directory.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }

        let dirs = ProjectDirs::from("dev", "weather-task", "weather-job").ok_or(Error::ConfigDir)?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn default_location() -> String {
    "Poole".to_string()
}

fn default_base_url() -> String {
    crate::provider::DEFAULT_BASE_URL.to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_timeout_secs() -> u64 {
    10
}
