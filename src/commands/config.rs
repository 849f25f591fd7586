//! Config command implementation.
//!
//! Generates configuration files in various formats.

use eureka_exporter::Config;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::example();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("eureka-exporter.yaml"),
    };

    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
        ConfigFormat::Yaml => {
            let mut content = serde_yaml::to_string(&config)?;
            if commented {
                content = add_config_comments(content);
            }
            content
        }
    };

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Eureka Exporter Configuration
# =============================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9109                   # HTTP port (not reloadable)
#
# Labels
# ------
# metadata:                    # Instance metadata keys exported as
#   - zone                     # eureka_meta_<key> labels; characters outside
#   - management.port          # [a-zA-Z0-9_] become '_' (not reloadable)
#
# Registries
# ----------
# eurekas:
#   - name: prod               # Unique name, exported as eureka_instance
#     urls: "http://a:8761, http://b:8761"  # Comma-separated; each url is polled on its own
#     pullInterval: 30s        # Poll interval (0 or missing = 30s)
#     security:
#       basic:
#         user: admin          # Empty user = no authentication
#         password: secret
#
# requestTimeout: 10s          # Upper bound for one registry request
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false            # Enable HTTPS (default: false)
# tls_cert_path: null          # Path to TLS certificate (PEM format)
# tls_key_path: null           # Path to TLS private key (PEM format)
#
# Changes to eurekas are picked up while running; the file is watched.
"#;

    format!("{comments}\n{yaml}")
}
