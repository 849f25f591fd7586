//! Configuration management for eureka-exporter.
//!
//! This module handles loading and validating the configuration file and
//! expanding its registry entries into poll targets. It supports YAML,
//! JSON, and TOML formats.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::model::{BasicAuth, Target, DEFAULT_PULL_INTERVAL};
use crate::registry::DEFAULT_REQUEST_TIMEOUT;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9109;

/// Config file locations tried when none is given on the command line.
pub const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/eureka-exporter/config.yaml",
    "/etc/eureka-exporter/config.yml",
    "./config.yaml",
    "./eureka-exporter.yaml",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("no config file found (tried: {0})")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

/// Basic-auth block of a registry entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    #[serde(default)]
    pub basic: BasicAuth,
}

/// One configured registry; `urls` may hold several comma-separated
/// endpoints of the same cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EurekaConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub urls: String,
    #[serde(
        rename = "pullInterval",
        alias = "pull_interval",
        default,
        with = "humantime_serde"
    )]
    pub pull_interval: Option<Duration>,
    #[serde(default)]
    pub security: Security,
}

impl EurekaConfig {
    /// Non-empty, trimmed endpoints listed in `urls`.
    pub fn endpoints(&self) -> Vec<&str> {
        self.urls
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// Exporter configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    /// Metadata keys promoted to `eureka_meta_*` labels.
    #[serde(default)]
    pub metadata: Vec<String>,

    /// Upper bound for one registry request.
    #[serde(
        rename = "requestTimeout",
        alias = "request_timeout",
        default,
        with = "humantime_serde"
    )]
    pub request_timeout: Option<Duration>,

    // Feature flags
    pub enable_health: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    /// Registries to poll. Kept last: TOML output needs tables after values.
    #[serde(default)]
    pub eurekas: Vec<EurekaConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            metadata: Vec::new(),
            eurekas: Vec::new(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            enable_health: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Default configuration with one example registry, used by the
    /// `config` subcommand.
    pub fn example() -> Self {
        Self {
            metadata: vec!["zone".into(), "management.port".into()],
            eurekas: vec![EurekaConfig {
                name: "prod".into(),
                urls: "http://eureka-1:8761, http://eureka-2:8761".into(),
                pull_interval: Some(DEFAULT_PULL_INTERVAL),
                security: Security::default(),
            }],
            ..Self::default()
        }
    }

    /// Expands every registry entry into one target per endpoint.
    pub fn targets(&self) -> Vec<Target> {
        self.eurekas
            .iter()
            .flat_map(|ec| {
                ec.endpoints().into_iter().map(move |url| {
                    Target::new(
                        ec.name.clone(),
                        url,
                        ec.pull_interval,
                        Some(ec.security.basic.clone()),
                    )
                })
            })
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Copy with every password replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        for ec in &mut cfg.eurekas {
            if !ec.security.basic.password.is_empty() {
                ec.security.basic.password = "***".into();
            }
        }
        cfg
    }
}

/// Validate effective config (used by --check-config, at startup and on reload)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.eurekas.is_empty() {
        return Err(ConfigError::Invalid(
            "eureka instance config is empty".into(),
        ));
    }

    let mut names = HashSet::new();
    for ec in &cfg.eurekas {
        if ec.name.trim().is_empty() || ec.urls.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "invalid eureka instance config: urls/name can not be empty".into(),
            ));
        }
        if !names.insert(ec.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate eureka instance name: {}",
                ec.name
            )));
        }
        let endpoints = ec.endpoints();
        if endpoints.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "eureka instance {} has no valid url",
                ec.name
            )));
        }
        if let Some(bad) = endpoints
            .iter()
            .find(|u| !(u.starts_with("http://") || u.starts_with("https://")))
        {
            return Err(ConfigError::Invalid(format!(
                "eureka instance {}: url '{}' must start with http:// or https://",
                ec.name, bad
            )));
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                ));
            }
            (Some(_), None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_key_path is not set".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_cert_path is not set".into(),
                ));
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

fn check_pem_file(path: &str, what: &str) -> Result<(), ConfigError> {
    if !Path::new(path).exists() {
        return Err(ConfigError::Invalid(format!(
            "TLS {} file not found: {}",
            what, path
        )));
    }
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(ConfigError::Invalid(format!(
            "TLS {} file is empty: {}",
            what, path
        ))),
        Err(e) => Err(ConfigError::Invalid(format!(
            "TLS {} file is not readable: {} ({})",
            what, path, e
        ))),
        Ok(_) => Ok(()),
    }
}

/// Returns `explicit` or the first existing default location.
pub fn find_config_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| ConfigError::NotFound(DEFAULT_CONFIG_PATHS.join(", ")))
}

/// Loads a config file, picking the format from its extension (YAML by default).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config =
                serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config =
                serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
port: 9200
metadata:
  - zone
  - management-port
eurekas:
  - name: prod
    urls: "http://eureka-1:8761/, http://eureka-2:8761 ,"
    pullInterval: 15s
    security:
      basic:
        user: admin
        password: secret
  - name: staging
    urls: http://eureka-staging:8761
"#;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_targets_expand_comma_separated_urls() {
        let cfg = parse(YAML);
        let targets = cfg.targets();

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].key(), "prod_http://eureka-1:8761");
        assert_eq!(targets[1].key(), "prod_http://eureka-2:8761");
        assert_eq!(targets[0].interval, Duration::from_secs(15));
        assert_eq!(
            targets[1].credentials.as_ref().map(|c| c.user.as_str()),
            Some("admin")
        );
        assert_eq!(targets[2].name, "staging");
        assert_eq!(targets[2].interval, DEFAULT_PULL_INTERVAL);
        assert!(targets[2].credentials.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        let empty = Config::default();
        assert!(validate_effective_config(&empty).is_err());

        let mut cfg = Config::example();
        cfg.eurekas.push(cfg.eurekas[0].clone());
        let err = validate_effective_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("duplicate eureka instance name"), "{}", err);

        let mut cfg = Config::example();
        cfg.eurekas[0].urls = " , ".into();
        let err = validate_effective_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("no valid url"), "{}", err);

        let mut cfg = Config::example();
        cfg.eurekas[0].urls = "eureka:8761".into();
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        assert!(validate_effective_config(&Config::example()).is_ok());
    }

    #[test]
    fn test_redacted_hides_passwords() {
        let cfg = parse(YAML);
        let shown = serde_yaml::to_string(&cfg.redacted()).unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("admin"));
    }

    #[test]
    fn test_request_timeout_default() {
        let mut cfg = Config::default();
        cfg.request_timeout = None;
        assert_eq!(cfg.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        cfg.request_timeout = Some(Duration::from_secs(3));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(3));
    }
}
