//! Configuration display endpoint handler.
//!
//! This module provides the `/config` endpoint handler that displays
//! the current exporter configuration and the targets being polled.
//! Passwords are never shown.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use eureka_exporter::config::{DEFAULT_BIND_ADDR, DEFAULT_PORT};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /config endpoint.
#[instrument(skip(state))]
pub async fn config_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /config request");

    // Track HTTP request
    state.health_stats.record_http_request();

    let cfg = &state.config;

    let mut out = String::new();

    writeln!(out, "EUREKA EXPORTER - CONFIGURATION").ok();
    writeln!(out, "===============================").ok();
    writeln!(out).ok();

    writeln!(out, "SERVER CONFIGURATION").ok();
    writeln!(out, "--------------------").ok();
    writeln!(
        out,
        "bind:                       {}",
        cfg.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    )
    .ok();
    writeln!(
        out,
        "port:                       {}",
        cfg.port.unwrap_or(DEFAULT_PORT)
    )
    .ok();
    writeln!(
        out,
        "enable_health:              {}",
        cfg.enable_health.unwrap_or(true)
    )
    .ok();
    writeln!(
        out,
        "log_level:                  {}",
        cfg.log_level.as_deref().unwrap_or("info")
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "TLS/SSL CONFIGURATION").ok();
    writeln!(out, "---------------------").ok();
    writeln!(
        out,
        "enable_tls:                 {}",
        cfg.enable_tls.unwrap_or(false)
    )
    .ok();
    writeln!(
        out,
        "tls_cert_path:              {}",
        cfg.tls_cert_path.as_deref().unwrap_or("none")
    )
    .ok();
    writeln!(
        out,
        "tls_key_path:               {}",
        cfg.tls_key_path.as_deref().unwrap_or("none")
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "REGISTRY POLLING").ok();
    writeln!(out, "----------------").ok();
    writeln!(
        out,
        "request_timeout:            {:?}",
        cfg.request_timeout()
    )
    .ok();
    let labels = state.supervisor.context().schema.label_names().join(", ");
    writeln!(out, "labels:                     {}", labels).ok();
    writeln!(out).ok();

    // Targets come from the supervisor so reloads are reflected here.
    writeln!(out, "ACTIVE TARGETS").ok();
    writeln!(out, "--------------").ok();
    let targets = state.supervisor.targets().await;
    if targets.is_empty() {
        writeln!(out, "(none)").ok();
    }
    for target in targets {
        let auth = match &target.credentials {
            Some(c) => format!("basic ({}:***)", c.user),
            None => "none".to_string(),
        };
        writeln!(
            out,
            "{:20} {} every {:?}, auth: {}",
            target.name, target.endpoint, target.interval, auth
        )
        .ok();
    }
    writeln!(out).ok();
    writeln!(out, "{FOOTER_TEXT}").ok();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        out,
    )
}
