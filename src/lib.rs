//! Eureka Exporter Library
//!
//! This library polls one or more Eureka service registries and publishes
//! the registration status of every instance as a Prometheus gauge. It is
//! framework-agnostic: the binary wires it to axum, but the supervisor and
//! pollers only need a [`RegistryFetch`] implementation and a
//! [`MetricSink`].
//!
//! # Features
//!
//! - **Per-instance status**: one `eureka_app_status` sample per instance
//! - **Metadata labels**: configured metadata keys become extra labels
//! - **Independent targets**: every registry endpoint is polled on its own interval
//! - **Live reload**: a new target set replaces the running one atomically
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use eureka_exporter::{
//!     EurekaClient, InstanceStatusGauge, LabelSchema, MonitorContext, Supervisor, Target,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = prometheus::Registry::new();
//! let schema = LabelSchema::new(&["zone".to_string()]);
//! let gauge = InstanceStatusGauge::new(&schema, &registry)?;
//!
//! let ctx = MonitorContext::new(Arc::new(gauge), schema);
//! let client = EurekaClient::new(std::time::Duration::from_secs(10))?;
//! let supervisor = Supervisor::new(client, ctx);
//!
//! supervisor
//!     .start(vec![Target::new("prod", "http://eureka:8761", None, None)])
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod diff;
pub mod health_stats;
pub mod metrics;
pub mod model;
pub mod poller;
pub mod registry;
pub mod reload;
pub mod supervisor;

// Re-export main types for convenience
pub use config::{Config, ConfigError};
pub use health_stats::HealthStats;
pub use metrics::{ExporterMetrics, InstanceStatusGauge, LabelSchema, LabelTuple, MetricSink};
pub use model::{BasicAuth, InstanceRecord, InstanceStatus, Snapshot, Target};
pub use poller::{MonitorContext, PollOutcome, Poller};
pub use registry::{EurekaClient, FetchError, RegistryFetch};
pub use reload::ConfigReloader;
pub use supervisor::Supervisor;
