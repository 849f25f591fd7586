//! Health statistics and monitoring for the exporter.
//!
//! This module provides types and functionality for tracking exporter health:
//! poll performance per cycle, per-target success/failure streaks, reload
//! counts and HTTP request rates. It backs the `/health` endpoint.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::model::Target;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.push_back(Instant::now());
            // Keep only last 10 minutes of timestamps to avoid unbounded growth
            let cutoff = Instant::now() - std::time::Duration::from_secs(600);
            while guard.front().is_some_and(|&t| t < cutoff) {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            let cutoff = Instant::now() - std::time::Duration::from_secs(60);
            guard.iter().filter(|&&t| t >= cutoff).count() as u64
        } else {
            0
        }
    }
}

/// Poll health of one target.
#[derive(Debug, Clone, Default)]
pub struct TargetHealth {
    pub name: String,
    pub endpoint: String,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
    pub instances: usize,
}

impl TargetHealth {
    /// A target is failing once its most recent poll failed.
    pub fn is_failing(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Comprehensive health statistics for the exporter.
pub struct HealthStats {
    pub poll_success_count: AtomicU64,
    pub poll_failure_count: AtomicU64,
    pub reload_count: AtomicU64,
    pub poll_duration_ms: Stat,
    pub instances_per_poll: Stat,
    pub http_request_timestamps: RequestTimestamps,
    pub start_time: Instant,
    targets: DashMap<String, TargetHealth>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            poll_success_count: AtomicU64::new(0),
            poll_failure_count: AtomicU64::new(0),
            reload_count: AtomicU64::new(0),
            poll_duration_ms: Stat::default(),
            instances_per_poll: Stat::default(),
            http_request_timestamps: RequestTimestamps::default(),
            start_time: Instant::now(),
            targets: DashMap::new(),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the tracked targets with a fresh, never-polled set.
    pub fn track_targets<'a>(&self, targets: impl IntoIterator<Item = &'a Target>) {
        self.targets.clear();
        for t in targets {
            self.targets.insert(
                t.key(),
                TargetHealth {
                    name: t.name.clone(),
                    endpoint: t.endpoint.clone(),
                    ..Default::default()
                },
            );
        }
    }

    pub fn record_poll_success(&self, key: &str, instances: usize, duration_ms: f64) {
        self.poll_success_count.fetch_add(1, Ordering::Relaxed);
        self.poll_duration_ms.add_sample(duration_ms);
        self.instances_per_poll.add_sample(instances as f64);
        if let Some(mut entry) = self.targets.get_mut(key) {
            entry.last_success = Some(Utc::now());
            entry.consecutive_failures = 0;
            entry.last_error = None;
            entry.instances = instances;
        }
    }

    pub fn record_poll_failure(&self, key: &str, error: &str, duration_ms: f64) {
        self.poll_failure_count.fetch_add(1, Ordering::Relaxed);
        self.poll_duration_ms.add_sample(duration_ms);
        if let Some(mut entry) = self.targets.get_mut(key) {
            entry.last_failure = Some(Utc::now());
            entry.consecutive_failures += 1;
            entry.last_error = Some(error.to_string());
        }
    }

    pub fn record_reload(&self) {
        self.reload_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn target(&self, key: &str) -> Option<TargetHealth> {
        self.targets.get(key).map(|e| e.value().clone())
    }

    /// All tracked targets sorted by key.
    pub fn targets(&self) -> Vec<(String, TargetHealth)> {
        let mut out: Vec<(String, TargetHealth)> = self
            .targets
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// True when targets are tracked and the latest poll of every one failed.
    pub fn all_targets_failing(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(|e| e.is_failing())
    }

    pub fn get_poll_success_rate(&self) -> f64 {
        let success = self.poll_success_count.load(Ordering::Relaxed);
        let failure = self.poll_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let (pd_cur, pd_avg, pd_max, pd_min, _) = self.poll_duration_ms.snapshot();
        let (ip_cur, ip_avg, ip_max, ip_min, _) = self.instances_per_poll.snapshot();
        let success = self.poll_success_count.load(Ordering::Relaxed);
        let failure = self.poll_failure_count.load(Ordering::Relaxed);
        let reloads = self.reload_count.load(Ordering::Relaxed);

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "POLL PERFORMANCE").ok();
        writeln!(out, "----------------").ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "poll_duration (ms)",
            format!("{:.1}", pd_cur),
            format!("{:.1}", pd_avg),
            format!("{:.1}", pd_max),
            format!("{:.1}", pd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "instances_per_poll",
            format!("{:.0}", ip_cur),
            format!("{:.1}", ip_avg),
            format!("{:.0}", ip_max),
            format!("{:.0}", ip_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(
            out,
            "polls: {} ok / {} failed ({:.1}% success), reloads: {}, http requests last minute: {}",
            success,
            failure,
            self.get_poll_success_rate(),
            reloads,
            self.http_request_timestamps.count_last_minute()
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "TARGETS").ok();
        writeln!(out, "-------").ok();
        for (_, t) in self.targets() {
            let last_success = t
                .last_success
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            writeln!(
                out,
                "{} {} | instances: {} | last success: {} | consecutive failures: {}",
                t.name, t.endpoint, t.instances, last_success, t.consecutive_failures
            )
            .ok();
            if let Some(err) = &t.last_error {
                writeln!(out, "    last error: {}", err).ok();
            }
        }

        out
    }
}
