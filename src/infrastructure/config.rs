use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";
const CONFIG_SCHEMA: u64 = 1;

pub const MONDAY_API_KEY: &str = "mondayApiKey";
pub const GOOGLE_CLIENT_ID: &str = "googleClientId";
pub const GOOGLE_SECRET: &str = "googleSecret";
pub const TIMEZONE: &str = "timezone";
pub const REDIRECT_URI: &str = "redirectUri";

pub const SETTABLE_KEYS: [&str; 5] = [
    MONDAY_API_KEY,
    GOOGLE_CLIENT_ID,
    GOOGLE_SECRET,
    TIMEZONE,
    REDIRECT_URI,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_secret: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: CONFIG_SCHEMA,
            monday_api_key: None,
            google_client_id: None,
            google_secret: None,
            timezone: default_timezone(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl AppConfig {
    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        parse_time_zone(&self.timezone)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), InfraError> {
        let value = value.trim();
        match key {
            MONDAY_API_KEY => self.monday_api_key = non_empty(value),
            GOOGLE_CLIENT_ID => self.google_client_id = non_empty(value),
            GOOGLE_SECRET => self.google_secret = non_empty(value),
            TIMEZONE => {
                parse_time_zone(value)?;
                self.timezone = value.to_string();
            }
            REDIRECT_URI => {
                url::Url::parse(value).map_err(|error| {
                    InfraError::InvalidConfig(format!("{REDIRECT_URI} is not a valid url: {error}"))
                })?;
                self.redirect_uri = value.to_string();
            }
            other => {
                return Err(InfraError::InvalidConfig(format!(
                    "unknown key `{other}`; expected one of: {}",
                    SETTABLE_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn project_dirs() -> Result<ProjectDirs, InfraError> {
    ProjectDirs::from("", "", "boardcal").ok_or_else(|| {
        InfraError::InvalidConfig("could not determine a home directory".to_string())
    })
}

pub fn default_config_path() -> Result<PathBuf, InfraError> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

pub fn default_cache_dir() -> Result<PathBuf, InfraError> {
    Ok(project_dirs()?.cache_dir().to_path_buf())
}

pub fn parse_time_zone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown time zone `{}`", name.trim())))
}

fn read_config(path: &Path) -> Result<AppConfig, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != CONFIG_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(serde_json::from_value(parsed)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), InfraError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let formatted = serde_json::to_string_pretty(config)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig, InfraError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    read_config(path)
}

/// Applies `key=value` assignments and writes the result.
///
/// Every assignment is validated before anything is written, so a bad entry
/// leaves the file untouched.
pub fn set_values(path: &Path, assignments: &[String]) -> Result<AppConfig, InfraError> {
    if assignments.is_empty() {
        return Err(InfraError::InvalidConfig(
            "expected at least one key=value pair".to_string(),
        ));
    }

    let mut config = load_config(path)?;
    for assignment in assignments {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            InfraError::InvalidConfig(format!("`{assignment}` is not in key=value form"))
        })?;
        config.set(key.trim(), value)?;
    }

    write_config(path, &config)?;
    Ok(config)
}
