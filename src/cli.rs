//! CLI arguments and subcommands for eureka-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands, and merges the flags over the
//! configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use eureka_exporter::config::{find_config_file, load_config, Config};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "eureka-exporter",
    about = "Prometheus exporter for Eureka service registry instance status",
    long_about = "Prometheus exporter for Eureka service registry instance status.\n\n\
                  Polls one or more Eureka registries and exports one eureka_app_status \
                  sample per registered instance, labelled with application, host, status \
                  and configurable metadata. The configuration file is watched and \
                  reloaded without restart.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/eureka-exporter - Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file; default info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Do not watch the config file for changes
    #[arg(long)]
    pub no_watch: bool,

    /// Print effective merged config (passwords redacted) and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Upper bound for one registry request, e.g. "10s"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Fetch every configured registry once and print what it reports
    Test {
        /// List every instance instead of a per-status summary
        #[arg(long)]
        verbose: bool,
    },
}

/// Loads the config file and applies CLI overrides (CLI > file > defaults).
///
/// Returns the merged config and the path it was loaded from.
pub fn resolve_config(args: &Args) -> Result<(Config, PathBuf), Box<dyn std::error::Error>> {
    let path = find_config_file(args.config.as_deref())?;
    let mut config = load_config(&path)?;

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(timeout) = args.request_timeout {
        config.request_timeout = Some(timeout);
    }

    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS overrides
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert) = &args.tls_cert {
        config.tls_cert_path = Some(cert.to_string_lossy().into_owned());
    }
    if let Some(key) = &args.tls_key {
        config.tls_key_path = Some(key.to_string_lossy().into_owned());
    }

    Ok((config, path))
}

/// Prints `config` with passwords redacted.
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let redacted = config.redacted();
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&redacted)?,
        ConfigFormat::Toml => toml::to_string_pretty(&redacted)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&redacted)?,
    };

    println!("{output}");
    Ok(())
}
