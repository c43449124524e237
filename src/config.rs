use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub static BASE_URL_ENV: &str = "IAM_DASHBOARD_BASE_URL";
pub static TOKEN_ENV: &str = "IAM_DASHBOARD_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} must be greater than zero")]
    ZeroPageSize(&'static str),
    #[error("base_url must start with http:// or https://, got {0:?}")]
    BaseUrl(String),
}

fn default_page_size() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Clone, Deserialize, Debug)]
pub struct DashboardConfigDeserialize {
    /// i.e "https://iam.example.org"
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub items_per_page: u64,
    #[serde(default = "default_page_size")]
    pub policies_per_page: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Answer every confirmation with yes and never prompt.
    #[serde(default)]
    pub assume_yes: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub items_per_page: u64,
    pub policies_per_page: u64,
    pub log_level: tracing::Level,
    pub assume_yes: bool,
}

impl DashboardConfig {
    pub fn new(other: DashboardConfigDeserialize) -> Result<DashboardConfig, ConfigError> {
        if !(other.base_url.starts_with("http://") || other.base_url.starts_with("https://")) {
            return Err(ConfigError::BaseUrl(other.base_url));
        }
        if other.items_per_page == 0 {
            return Err(ConfigError::ZeroPageSize("items_per_page"));
        }
        if other.policies_per_page == 0 {
            return Err(ConfigError::ZeroPageSize("policies_per_page"));
        }
        // unknown levels fall back to info rather than refusing to start
        let log_level = other.log_level.parse().unwrap_or(tracing::Level::INFO);

        Ok(DashboardConfig {
            base_url: other.base_url,
            access_token: other.access_token.filter(|token| !token.is_empty()),
            items_per_page: other.items_per_page,
            policies_per_page: other.policies_per_page,
            log_level,
            assume_yes: other.assume_yes,
        })
    }

    pub fn from_toml(contents: &str) -> Result<DashboardConfig, ConfigError> {
        let config: DashboardConfigDeserialize = toml::from_str(contents)?;
        Self::new(config)
    }

    /// Reads the file, then lets the environment override the endpoint and token.
    pub fn load(path: impl AsRef<Path>) -> Result<DashboardConfig, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: DashboardConfigDeserialize = toml::from_str(&contents)?;
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.access_token = Some(token);
        }
        Self::new(config)
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        Self::from_toml(
            r#"
base_url = "http://127.0.0.1:8080"
access_token = "test-token"
items_per_page = 10
policies_per_page = 10
log_level = "debug"
        "#,
        )
        .expect("test config to be valid")
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DashboardConfig::from_toml(r#"base_url = "https://iam.example.org""#).unwrap();
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.policies_per_page, 10);
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert!(!config.assume_yes);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            DashboardConfig::from_toml(r#"base_url = "iam.example.org""#),
            Err(ConfigError::BaseUrl(_))
        ));
        assert!(matches!(
            DashboardConfig::from_toml(
                r#"
base_url = "https://iam.example.org"
items_per_page = 0
"#
            ),
            Err(ConfigError::ZeroPageSize("items_per_page"))
        ));
        assert!(matches!(
            DashboardConfig::from_toml("items_per_page = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = DashboardConfig::from_toml(include_str!("../Config.toml")).unwrap();
        assert_eq!(config.log_level, tracing::Level::WARN);
    }

    #[test]
    fn test_new_test_config() {
        let config = DashboardConfig::new_test();
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.access_token.as_deref(), Some("test-token"));
    }
}
