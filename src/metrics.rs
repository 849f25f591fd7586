//! Prometheus metrics definitions for eureka-exporter.
//!
//! `eureka_app_status` carries one sample (value 1) per registered instance.
//! Status is part of the label set, so a status change is a delete of the
//! old series plus a set of the new one. Pollers only talk to the narrow
//! [`MetricSink`] interface; [`InstanceStatusGauge`] is the Prometheus
//! implementation of it.

use once_cell::sync::Lazy;
use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Opts, Registry};
use regex::Regex;
use tracing::{trace, warn};

use crate::model::{InstanceRecord, Target};

pub const STATUS_METRIC_NAME: &str = "eureka_app_status";

/// Labels every `eureka_app_status` sample carries, in order.
pub const FIXED_LABELS: [&str; 5] = [
    "eureka_instance",
    "eureka_application",
    "eureka_app_hostname",
    "eureka_app_status",
    "eureka_url",
];

const METADATA_LABEL_PREFIX: &str = "eureka_meta_";

static INVALID_LABEL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("static regex"));

/// Turns a metadata key into a valid, prefixed Prometheus label name.
pub fn metadata_label_name(key: &str) -> String {
    format!(
        "{}{}",
        METADATA_LABEL_PREFIX,
        INVALID_LABEL_CHARS.replace_all(key, "_")
    )
}

/// Externally visible identity of one `eureka_app_status` sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelTuple {
    pub target_name: String,
    pub application: String,
    pub host: String,
    pub status: String,
    pub endpoint: String,
    /// One value per configured metadata label, empty when the instance
    /// does not carry that key.
    pub extra: Vec<String>,
}

impl LabelTuple {
    /// Label values in schema order.
    pub fn values(&self) -> Vec<&str> {
        let mut values = vec![
            self.target_name.as_str(),
            self.application.as_str(),
            self.host.as_str(),
            self.status.as_str(),
            self.endpoint.as_str(),
        ];
        values.extend(self.extra.iter().map(String::as_str));
        values
    }
}

/// Label layout of `eureka_app_status`: the fixed labels followed by one
/// label per promoted metadata key.
#[derive(Debug, Clone, Default)]
pub struct LabelSchema {
    metadata_keys: Vec<String>,
    label_names: Vec<String>,
}

impl LabelSchema {
    /// Builds the schema. Keys that sanitize to an already used label name
    /// are skipped with a warning.
    pub fn new(metadata_keys: &[String]) -> Self {
        let mut label_names: Vec<String> = FIXED_LABELS.iter().map(|s| s.to_string()).collect();
        let mut keys = Vec::new();

        for key in metadata_keys {
            let name = metadata_label_name(key);
            if label_names.contains(&name) {
                warn!(
                    "Metadata key '{}' maps to duplicate label '{}', skipping",
                    key, name
                );
                continue;
            }
            label_names.push(name);
            keys.push(key.clone());
        }

        Self {
            metadata_keys: keys,
            label_names,
        }
    }

    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Derives the sample identity of `record` as seen through `target`.
    pub fn tuple(&self, target: &Target, record: &InstanceRecord) -> LabelTuple {
        LabelTuple {
            target_name: target.name.clone(),
            application: record.app.clone(),
            host: record.host_name.clone(),
            status: record.status.as_str().to_string(),
            endpoint: target.endpoint.clone(),
            extra: self
                .metadata_keys
                .iter()
                .map(|k| record.metadata.get(k).cloned().unwrap_or_default())
                .collect(),
        }
    }
}

/// Current-value store the pollers publish into.
pub trait MetricSink: Send + Sync {
    /// Sets the sample for `tuple` to 1, creating it if needed.
    fn set(&self, tuple: &LabelTuple);
    /// Removes the sample for `tuple`; absent tuples are ignored.
    fn delete(&self, tuple: &LabelTuple);
    /// Removes every sample.
    fn reset_all(&self);
}

/// `eureka_app_status` gauge registered in a Prometheus registry.
#[derive(Clone)]
pub struct InstanceStatusGauge {
    gauge: GaugeVec,
}

impl InstanceStatusGauge {
    pub fn new(schema: &LabelSchema, registry: &Registry) -> Result<Self, prometheus::Error> {
        let names: Vec<&str> = schema.label_names().iter().map(String::as_str).collect();
        let gauge = GaugeVec::new(
            Opts::new(STATUS_METRIC_NAME, "app register status on eureka"),
            &names,
        )?;
        registry.register(Box::new(gauge.clone()))?;
        Ok(Self { gauge })
    }
}

impl MetricSink for InstanceStatusGauge {
    fn set(&self, tuple: &LabelTuple) {
        self.gauge.with_label_values(&tuple.values()).set(1.0);
    }

    fn delete(&self, tuple: &LabelTuple) {
        if let Err(e) = self.gauge.remove_label_values(&tuple.values()) {
            trace!("Delete of absent sample {:?}: {}", tuple, e);
        }
    }

    fn reset_all(&self) {
        self.gauge.reset();
    }
}

/// Self-telemetry of the exporter.
#[derive(Clone)]
pub struct ExporterMetrics {
    pub targets: Gauge,
    pub instances: Gauge,
    pub reloads_total: Counter,
    pub polls_total: CounterVec, // labels: result
    pub poll_duration_seconds: Gauge,
}

impl ExporterMetrics {
    /// Creates and registers all exporter metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let targets = Gauge::new(
            "eureka_exporter_targets",
            "Number of registry targets currently polled",
        )?;
        let instances = Gauge::new(
            "eureka_exporter_instances",
            "Instances in the last successful snapshot of all targets",
        )?;
        let reloads_total = Counter::new(
            "eureka_exporter_reloads_total",
            "Number of applied configuration reloads",
        )?;
        let polls_total = CounterVec::new(
            Opts::new(
                "eureka_exporter_polls_total",
                "Registry poll cycles by result",
            ),
            &["result"],
        )?;
        let poll_duration_seconds = Gauge::new(
            "eureka_exporter_poll_duration_seconds",
            "Duration of the most recent registry poll cycle",
        )?;

        registry.register(Box::new(targets.clone()))?;
        registry.register(Box::new(instances.clone()))?;
        registry.register(Box::new(reloads_total.clone()))?;
        registry.register(Box::new(polls_total.clone()))?;
        registry.register(Box::new(poll_duration_seconds.clone()))?;

        Ok(Self {
            targets,
            instances,
            reloads_total,
            polls_total,
            poll_duration_seconds,
        })
    }

    pub fn record_poll(&self, success: bool, duration_seconds: f64) {
        let result = if success { "success" } else { "failure" };
        self.polls_total.with_label_values(&[result]).inc();
        self.poll_duration_seconds.set(duration_seconds);
    }
}
