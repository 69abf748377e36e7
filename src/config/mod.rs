//! Configuration loading and management
//!
//! Configuration comes from an optional YAML file, then environment variables
//! override individual values:
//!
//! | Variable | Field |
//! |---|---|
//! | `HOST`, `PORT` | `server.host`, `server.port` |
//! | `JWT_SECRET`, `JWT_EXPIRE`, `JWT_COOKIE_EXPIRE` | `auth.*` (days) |
//! | `FILE_UPLOAD_PATH`, `MAX_FILE_UPLOAD` | `upload.*` |
//! | `MONGO_URI` | `database.mongo_uri` |
//! | `NODE_ENV=production` | `auth.secure_cookies` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::geo::ZipcodeEntry;
use crate::core::query::QueryOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Log every request through `TraceLayer`
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_logging: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub cookie_expire_days: i64,
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string(),
            jwt_expire_days: 30,
            cookie_expire_days: 30,
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: u64,
    /// Optional upper bound on `limit`
    pub max_limit: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        let options = QueryOptions::default();
        Self {
            default_limit: options.default_limit,
            max_limit: options.max_limit,
        }
    }
}

impl QueryConfig {
    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            default_limit: self.default_limit.max(1),
            max_limit: self.max_limit.map(|max| max.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub file_upload_path: PathBuf,
    /// Maximum photo size in bytes
    pub max_file_upload: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            file_upload_path: PathBuf::from("./public/uploads"),
            max_file_upload: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub zipcodes: HashMap<String, ZipcodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connect to MongoDB when set, otherwise use the in-memory store
    pub mongo_uri: Option<String>,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mongo_uri: None,
            name: "devcamper".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub query: QueryConfig,
    pub upload: UploadConfig,
    pub geocoder: GeocoderConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("invalid config file {}", path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load from an optional file, then apply the process environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides read through `lookup`
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(days) = lookup("JWT_EXPIRE") {
            self.auth.jwt_expire_days = parse_days("JWT_EXPIRE", &days)?;
        }
        if let Some(days) = lookup("JWT_COOKIE_EXPIRE") {
            self.auth.cookie_expire_days = parse_days("JWT_COOKIE_EXPIRE", &days)?;
        }
        if let Some(path) = lookup("FILE_UPLOAD_PATH") {
            self.upload.file_upload_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("MAX_FILE_UPLOAD") {
            self.upload.max_file_upload = parse_var("MAX_FILE_UPLOAD", &size)?;
        }
        if let Some(uri) = lookup("MONGO_URI") {
            self.database.mongo_uri = Some(uri);
        }
        if lookup("NODE_ENV").as_deref() == Some("production") {
            self.auth.secure_cookies = true;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}: '{}'", name, value))
}

/// Accepts `30` or the `30d` form
fn parse_days(name: &str, value: &str) -> Result<i64> {
    parse_var(name, value.trim().trim_end_matches('d'))
}
