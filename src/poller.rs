//! Per-target polling loop.
//!
//! A poller owns one target for the lifetime of one generation. On every
//! tick it fetches the registry, diffs the result against the cached
//! snapshot, publishes the resulting samples and commits the new snapshot.
//! A failed fetch leaves the cache and the published samples untouched.

use ahash::AHashSet as HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::diff;
use crate::health_stats::HealthStats;
use crate::metrics::{ExporterMetrics, LabelSchema, LabelTuple, MetricSink};
use crate::model::{InstanceRecord, Target};
use crate::registry::{FetchError, RegistryFetch};

/// State shared by the supervisor and all of its pollers.
pub struct MonitorContext {
    pub cache: SnapshotCache,
    pub sink: Arc<dyn MetricSink>,
    pub schema: LabelSchema,
    pub stats: Arc<HealthStats>,
    pub telemetry: Option<ExporterMetrics>,
}

impl MonitorContext {
    pub fn new(sink: Arc<dyn MetricSink>, schema: LabelSchema) -> Self {
        Self {
            cache: SnapshotCache::new(),
            sink,
            schema,
            stats: Arc::new(HealthStats::new()),
            telemetry: None,
        }
    }

    pub fn with_stats(mut self, stats: Arc<HealthStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_telemetry(mut self, telemetry: ExporterMetrics) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

/// Result of one poll cycle that did not report a fetch error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Samples were published and the snapshot committed.
    Published {
        instances: usize,
        appeared: usize,
        offline: usize,
    },
    /// A reload started a newer generation while the fetch was in flight;
    /// nothing was written, not even a failure.
    Superseded,
}

/// Polls one target on its interval until told to stop.
pub struct Poller<C> {
    target: Target,
    key: String,
    generation: u64,
    client: Arc<C>,
    ctx: Arc<MonitorContext>,
}

impl<C: RegistryFetch> Poller<C> {
    pub fn new(target: Target, generation: u64, client: Arc<C>, ctx: Arc<MonitorContext>) -> Self {
        let key = target.key();
        Self {
            target,
            key,
            generation,
            client,
            ctx,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Runs one fetch, diff, publish and commit cycle.
    pub async fn poll_once(&self) -> Result<PollOutcome, FetchError> {
        let start = Instant::now();

        let snapshot = match self.client.fetch(&self.target).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // A superseded poller must not touch the health entry that the
                // next generation registered under the same key.
                if self.ctx.cache.generation().await != self.generation {
                    debug!(
                        "Discarding failed poll of {} from superseded generation {}: {}",
                        self.key, self.generation, e
                    );
                    return Ok(PollOutcome::Superseded);
                }
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                warn!(
                    "eureka {}/{} get app status failed: {}",
                    self.target.name, self.target.endpoint, e
                );
                self.ctx
                    .stats
                    .record_poll_failure(&self.key, &e.to_string(), elapsed_ms);
                if let Some(t) = &self.ctx.telemetry {
                    t.record_poll(false, elapsed_ms / 1000.0);
                }
                return Err(e);
            }
        };

        // The read guard is released before the exclusive commit below; only
        // this poller writes this key within its generation.
        let previous = self.ctx.cache.get(&self.key).await;
        let old: &[InstanceRecord] = previous.as_deref().map(Vec::as_slice).unwrap_or(&[]);

        let offline = diff::offline(old, &snapshot);
        let appeared = diff::appeared(old, &snapshot);
        if !old.is_empty() {
            self.log_transitions(&appeared, &offline);
        }

        let schema = &self.ctx.schema;
        let live: Vec<LabelTuple> = snapshot
            .iter()
            .map(|r| schema.tuple(&self.target, r))
            .collect();
        // An offline record can share its tuple with a live one (e.g. only an
        // unlabelled metadata key changed); that sample must stay.
        let retired: Vec<LabelTuple> = {
            let live_set: HashSet<&LabelTuple> = live.iter().collect();
            offline
                .iter()
                .map(|r| schema.tuple(&self.target, r))
                .filter(|t| !live_set.contains(t))
                .collect()
        };

        let instances = snapshot.len();
        let sink = &self.ctx.sink;
        let committed = self
            .ctx
            .cache
            .commit(self.generation, &self.key, snapshot, || {
                for tuple in &live {
                    sink.set(tuple);
                }
                for tuple in &retired {
                    sink.delete(tuple);
                }
            })
            .await;

        if !committed {
            debug!(
                "Discarding poll result of {} from superseded generation {}",
                self.key, self.generation
            );
            return Ok(PollOutcome::Superseded);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.ctx
            .stats
            .record_poll_success(&self.key, instances, elapsed_ms);
        if let Some(t) = &self.ctx.telemetry {
            t.record_poll(true, elapsed_ms / 1000.0);
        }
        debug!(
            "Polled {}: {} instances, {} appeared, {} offline, {:.1}ms",
            self.key,
            instances,
            appeared.len(),
            offline.len(),
            elapsed_ms
        );

        Ok(PollOutcome::Published {
            instances,
            appeared: appeared.len(),
            offline: offline.len(),
        })
    }

    fn log_transitions(&self, appeared: &[InstanceRecord], offline: &[InstanceRecord]) {
        for r in offline {
            info!(
                "[{}] {}@{} left status {}",
                self.target.name, r.app, r.host_name, r.status
            );
        }
        for r in appeared {
            info!(
                "[{}] {}@{} now {}",
                self.target.name, r.app, r.host_name, r.status
            );
        }
    }

    /// Polls on every tick until `stop` fires or its sender is dropped.
    ///
    /// The first tick fires immediately. A stop signal that arrives while a
    /// fetch is in flight is observed once that cycle has finished.
    pub async fn run(self, mut stop: oneshot::Receiver<()>) {
        info!(
            "Starting poller for eureka {} at {} every {:?}",
            self.target.name, self.target.endpoint, self.target.interval
        );

        let mut ticker = interval(self.target.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    if let Ok(PollOutcome::Superseded) = self.poll_once().await {
                        break;
                    }
                }
            }
        }

        info!(
            "Poller for eureka {} at {} stopped",
            self.target.name, self.target.endpoint
        );
    }
}
