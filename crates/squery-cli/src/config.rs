//! Connection settings file
//!
//! ```toml
//! address = "127.0.0.1:10011"
//! username = "serveradmin"
//! password = "secret"
//! server = 1
//! keepalive_secs = 200
//! command_timeout_secs = 10
//! ```
//!
//! Every key is optional. Command-line flags and environment variables take
//! precedence over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:10011";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub server: Option<u32>,
    /// 0 disables the keep-alive
    pub keepalive_secs: Option<u64>,
    /// 0 waits forever
    pub command_timeout_secs: Option<u64>,
}

impl Config {
    /// Parse a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load `path`, or the default location when none is given
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn keepalive(&self) -> Option<Option<Duration>> {
        self.keepalive_secs.map(non_zero_secs)
    }

    pub fn command_timeout(&self) -> Option<Option<Duration>> {
        self.command_timeout_secs.map(non_zero_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// `<config dir>/squery/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("squery").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            address = "ts.example.com:10011"
            username = "serveradmin"
            password = "secret"
            server = 2
            keepalive_secs = 0
            command_timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.address.as_deref(), Some("ts.example.com:10011"));
        assert_eq!(config.server, Some(2));
        assert_eq!(config.keepalive(), Some(None));
        assert_eq!(config.command_timeout(), Some(Some(Duration::from_secs(30))));
    }

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.keepalive(), None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("adress = \"x\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/squery.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
