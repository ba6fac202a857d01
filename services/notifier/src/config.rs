//! services/notifier/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use notification_core::DesktopPermission;
use reqwest::Url;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base of the push endpoint, e.g. `https://api.example.com/ws`.
    pub push_base_url: String,
    /// Base of the REST API used for the fallback calls.
    pub api_base_url: String,
    pub user_id: String,
    pub user_role: String,
    pub auth_token: Option<String>,
    pub log_level: Level,
    pub settings_path: PathBuf,
    pub backlog_limit: u32,
    pub desktop_permission: DesktopPermission,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Endpoints and identity ---
        let push_base_url = required("PUSH_BASE_URL")?;
        let api_base_url = required("API_BASE_URL")?;
        let user_id = required("USER_ID")?;
        let user_role = std::env::var("USER_ROLE").unwrap_or_else(|_| "customer".to_string());
        let auth_token = std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty());

        // Fail at startup rather than on the first connect.
        websocket_scheme(&push_base_url)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Local state ---
        let settings_path = std::env::var("SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_settings_path());

        let backlog_limit = match std::env::var("BACKLOG_LIMIT") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("BACKLOG_LIMIT".to_string(), e.to_string())
            })?,
            Err(_) => 50,
        };

        let desktop_permission = match std::env::var("DESKTOP_PERMISSION") {
            Ok(raw) => raw.parse::<DesktopPermission>().map_err(|e| {
                ConfigError::InvalidValue("DESKTOP_PERMISSION".to_string(), e.to_string())
            })?,
            Err(_) => DesktopPermission::Granted,
        };

        Ok(Self {
            push_base_url,
            api_base_url,
            user_id,
            user_role,
            auth_token,
            log_level,
            settings_path,
            backlog_limit,
            desktop_permission,
        })
    }

    /// The push endpoint for this user. The scheme mirrors the base URL's, so a
    /// secure API is reached over `wss` and a plain one over `ws`.
    pub fn push_url(&self) -> Result<String, ConfigError> {
        let (scheme, rest) = websocket_scheme(&self.push_base_url)?;
        let invalid = |reason: String| ConfigError::InvalidValue("PUSH_BASE_URL".to_string(), reason);
        let mut url = Url::parse(&format!("{}://{}", scheme, rest))
            .map_err(|e| invalid(format!("'{}': {}", self.push_base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("'{}' cannot carry a path", self.push_base_url)))?
            .pop_if_empty()
            .push("notifications");
        url.query_pairs_mut()
            .append_pair("userId", &self.user_id)
            .append_pair("role", &self.user_role);
        Ok(url.into())
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingVar(var.to_string()))
}

fn websocket_scheme(url: &str) -> Result<(&'static str, &str), ConfigError> {
    let (scheme, rest) = url.split_once("://").ok_or_else(|| {
        ConfigError::InvalidValue("PUSH_BASE_URL".to_string(), format!("'{}' has no scheme", url))
    })?;
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ConfigError::InvalidValue(
                "PUSH_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", other),
            ))
        }
    };
    Ok((ws_scheme, rest))
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("notifier"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notification-settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(push_base_url: &str) -> Config {
        Config {
            push_base_url: push_base_url.to_string(),
            api_base_url: "https://api.example.com/api".to_string(),
            user_id: "u-42".to_string(),
            user_role: "admin".to_string(),
            auth_token: None,
            log_level: Level::INFO,
            settings_path: PathBuf::from("settings.json"),
            backlog_limit: 50,
            desktop_permission: DesktopPermission::Granted,
        }
    }

    #[test]
    fn secure_base_maps_to_wss() {
        let url = config("https://api.example.com/ws/").push_url().unwrap();
        assert_eq!(url, "wss://api.example.com/ws/notifications?userId=u-42&role=admin");
    }

    #[test]
    fn plain_base_maps_to_ws() {
        let url = config("http://localhost:8080").push_url().unwrap();
        assert_eq!(url, "ws://localhost:8080/notifications?userId=u-42&role=admin");
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(matches!(
            config("ftp://example.com").push_url(),
            Err(ConfigError::InvalidValue(..))
        ));
        assert!(config("example.com").push_url().is_err());
    }

    #[test]
    fn user_and_role_are_query_encoded() {
        let mut config = config("https://api.example.com/ws");
        config.user_id = "u1&role=admin".to_string();
        config.user_role = "customer".to_string();
        let url = config.push_url().unwrap();
        assert_eq!(
            url,
            "wss://api.example.com/ws/notifications?userId=u1%26role%3Dadmin&role=customer"
        );
        let parsed = Url::parse(&url).unwrap();
        let roles: Vec<_> = parsed.query_pairs().filter(|(k, _)| k == "role").collect();
        assert_eq!(roles.len(), 1);
    }
}
