//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fanout.toml` files.

use crate::models::PolicyKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".fanout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Services to fan out to, in submission order.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            services: default_services(),
        }
    }
}

/// General aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Failure-handling policy.
    #[serde(default)]
    pub policy: PolicyKind,

    /// Value substituted for failures under fail-soft.
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// How long to wait for the aggregate before giving up.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            fallback: default_fallback(),
            timeout_seconds: default_timeout(),
            verbose: false,
        }
    }
}

fn default_fallback() -> String {
    "N/A".to_string()
}

fn default_timeout() -> u64 {
    2
}

/// A mock service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service identifier, used as the prefix of its answers.
    pub id: String,

    /// Simulated latency in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,

    /// If set, the service always fails with this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

impl ServiceConfig {
    pub fn echo(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delay_ms: 0,
            fail: None,
        }
    }
}

fn default_services() -> Vec<ServiceConfig> {
    vec![ServiceConfig::echo("Alpha"), ServiceConfig::echo("Beta")]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.fanout.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(policy) = args.policy {
            self.general.policy = policy;
        }
        if let Some(ref fallback) = args.fallback {
            self.general.fallback = fallback.clone();
        }
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }

        // An explicit service list replaces the configured one
        if let Some(ref ids) = args.services {
            self.services = ids.iter().map(ServiceConfig::echo).collect();
        }

        if let Some(ref failing) = args.fail {
            for service in self.services.iter_mut() {
                if failing.contains(&service.id) {
                    service.fail = Some(format!("{} is unavailable", service.id));
                }
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// `--fail` ids that match none of the configured services.
    pub fn unknown_services<'a>(&self, ids: &'a [String]) -> Vec<&'a str> {
        ids.iter()
            .filter(|id| !self.services.iter().any(|s| &s.id == *id))
            .map(String::as_str)
            .collect()
    }

    /// Log level for this run. `quiet` wins over a configured `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.policy, PolicyKind::FailFast);
        assert_eq!(config.general.fallback, "N/A");
        assert_eq!(config.general.timeout_seconds, 2);
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].id, "Alpha");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
policy = "fail-soft"
fallback = "DEFAULT"
verbose = true

[[services]]
id = "Good"
delay_ms = 25

[[services]]
id = "Bad"
fail = "service down"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.policy, PolicyKind::FailSoft);
        assert_eq!(config.general.fallback, "DEFAULT");
        assert_eq!(config.general.timeout_seconds, 2);
        assert!(config.general.verbose);
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].delay_ms, 25);
        assert_eq!(config.services[1].fail.as_deref(), Some("service down"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[general]\npolicy = \"completion-order\"\n",
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.general.policy, PolicyKind::CompletionOrder);
        assert_eq!(config.services, default_services());
    }

    #[test]
    fn test_load_rejects_bad_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[general]\npolicy = \"fail-sometimes\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        args.policy = Some(PolicyKind::FailPartial);
        args.services = Some(vec!["Good1".to_string(), "Bad".to_string(), "Good2".to_string()]);
        args.fail = Some(vec!["Bad".to_string()]);
        args.timeout = Some(5);

        config.merge_with_args(&args);

        assert_eq!(config.general.policy, PolicyKind::FailPartial);
        assert_eq!(config.general.timeout_seconds, 5);
        assert_eq!(config.general.fallback, "N/A");
        let ids: Vec<_> = config.services.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["Good1", "Bad", "Good2"]);
        assert!(config.services[1].fail.is_some());
        assert!(config.services[0].fail.is_none());
    }

    #[test]
    fn test_merge_keeps_config_without_flags() {
        let mut config = Config::default();
        config.general.policy = PolicyKind::FailSoft;

        config.merge_with_args(&make_args());

        assert_eq!(config.general.policy, PolicyKind::FailSoft);
        assert_eq!(config.services, default_services());
    }

    #[test]
    fn test_log_level_follows_config_verbose() {
        let mut config = Config::default();
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        config.general.verbose = true;
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        let mut config = Config::default();
        let mut args = make_args();
        args.verbose = true;
        config.merge_with_args(&args);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
    }

    #[test]
    fn test_unknown_services() {
        let config = Config::default();
        let ids = vec!["Beta".to_string(), "Gamma".to_string()];
        assert_eq!(config.unknown_services(&ids), vec!["Gamma"]);

        let mut config = config;
        let mut args = make_args();
        args.fail = Some(ids);
        config.merge_with_args(&args);
        assert!(config.services[1].fail.is_some());
        assert!(config.services[0].fail.is_none());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[[services]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.services, default_services());
    }
}
