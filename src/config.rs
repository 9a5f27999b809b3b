use crate::policy::MembershipPolicy;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "groupdesk.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub notifications: NotificationConfig,
    pub policy: MembershipPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_owned(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Rest,
    Sql,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Rest,
            url: "mysql://localhost/groupdesk".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("groupdesk-session.json"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub duration_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { duration_ms: 3000 }
    }
}

impl NotificationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Config {
    /// Load `file_name`, or the default configuration file if none is given.
    /// Only an explicitly named file is required to exist.
    pub fn load(file_name: Option<&Path>) -> Result<Config> {
        let (path, required) = match file_name {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot load configuration file {}", path.display()))?;
        Self::parse(&text)
            .wrap_err_with(|| format!("cannot parse configuration file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.store.backend, Backend::Rest);
        assert_eq!(config.notifications.duration(), Duration::from_secs(3));
        assert_eq!(config.policy, MembershipPolicy::default());
    }

    #[test]
    fn test_full_file() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "https://projects.example.edu/api"
            timeout_secs = 20

            [store]
            backend = "sql"
            url = "sqlite://groups.db"

            [session]
            file = "/tmp/session.json"

            [notifications]
            duration_ms = 4000

            [policy]
            soft_cap = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.store.backend, Backend::Sql);
        assert_eq!(config.session.file, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.notifications.duration_ms, 4000);
        assert_eq!(config.policy.soft_cap, 3);
        assert_eq!(config.policy.hard_cap, 5);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(Config::parse("[solver]\nalgorithm = \"hungarian\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
