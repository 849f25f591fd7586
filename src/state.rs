//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use eureka_exporter::{Config, EurekaClient, ExporterMetrics, HealthStats, Supervisor};
use prometheus::{Gauge, Registry};
use std::sync::Arc;
use std::time::Instant;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    pub telemetry: ExporterMetrics,
    pub scrape_duration: Gauge,
    pub supervisor: Arc<Supervisor<EurekaClient>>,
    /// Config the exporter was started with; reloads only change targets.
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
