//! Configuration management
//!
//! Layered: a YAML file merged with `PLM_GATEWAY_`-prefixed environment
//! variables, with a `.env` file loaded into the process environment first.

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::backend::ServerProfile;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Backend profile configuration
    pub backend: BackendSettings,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be
    /// parsed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // Local .env first, so the figment Env provider sees its values.
        dotenvy::dotenv().ok();

        let mut figment = Figment::new();
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }
        figment = figment.merge(Env::prefixed("PLM_GATEWAY_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the type system cannot express
    fn validate(&self) -> Result<()> {
        if self.backend.profiles.is_empty() {
            return Err(Error::Config(
                "At least one server profile must be configured".to_string(),
            ));
        }
        if !self
            .backend
            .profiles
            .iter()
            .any(|p| p.id == self.backend.active_server)
        {
            return Err(Error::Config(format!(
                "active_server {} is not a configured profile id",
                self.backend.active_server
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 39500,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Backend profile configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Profile id that is active at startup
    pub active_server: u32,
    /// Configured server profiles
    pub profiles: Vec<ProfileConfig>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            active_server: 1,
            profiles: Vec::new(),
        }
    }
}

/// One configured server profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Stable small-integer id
    pub id: u32,
    /// Display name
    pub name: String,
    /// Backend base URL
    pub base_url: String,
    /// Service path appended to the base URL
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Basic-Auth username
    pub username: String,
    /// Basic-Auth password
    pub password: String,
    /// Per-request timeout
    #[serde(default = "default_profile_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_api_path() -> String {
    "/odata/v2".to_string()
}

fn default_profile_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ProfileConfig {
    /// Convert to the runtime profile type
    #[must_use]
    pub fn to_profile(&self) -> ServerProfile {
        ServerProfile {
            id: self.id,
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            api_path: self.api_path.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
        }
    }
}
