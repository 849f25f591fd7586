//! Ownership and changeover of the active pollers.
//!
//! The supervisor owns one poller per target key. A reload never diffs the
//! old and new target sets: it stops every poller, clears the snapshot
//! cache and the metric sink, waits briefly and starts a complete new
//! generation. Writes that an outgoing poller attempts after the reset are
//! rejected by the cache's generation check.

use ahash::AHashMap as HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::Target;
use crate::poller::{MonitorContext, Poller};
use crate::registry::RegistryFetch;

/// Pause between resetting shared state and starting the next generation,
/// giving outgoing pollers time to observe their stop signal.
pub const RELOAD_SETTLE: Duration = Duration::from_millis(100);

/// How long `shutdown` waits for a poller before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

struct PollerHandle {
    target: Target,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the set of running pollers and replaces it on reload.
pub struct Supervisor<C> {
    client: Arc<C>,
    ctx: Arc<MonitorContext>,
    pollers: Mutex<HashMap<String, PollerHandle>>,
}

impl<C: RegistryFetch> Supervisor<C> {
    pub fn new(client: C, ctx: MonitorContext) -> Self {
        Self {
            client: Arc::new(client),
            ctx: Arc::new(ctx),
            pollers: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &Arc<MonitorContext> {
        &self.ctx
    }

    /// Starts one poller per target. Intended for a cold start; if pollers
    /// are already running this behaves like [`Supervisor::reload`].
    pub async fn start(&self, targets: Vec<Target>) {
        let mut pollers = self.pollers.lock().await;
        if !pollers.is_empty() {
            warn!("start() called with {} pollers running, reloading instead", pollers.len());
            self.replace_generation(&mut pollers, targets).await;
            return;
        }

        let generation = self.ctx.cache.generation().await;
        self.spawn_generation(&mut pollers, targets, generation);
    }

    /// Replaces the whole generation with pollers for `targets`.
    ///
    /// The caller validates `targets`; an equal set still goes through a
    /// full stop, clear and restart.
    pub async fn reload(&self, targets: Vec<Target>) {
        let mut pollers = self.pollers.lock().await;
        self.replace_generation(&mut pollers, targets).await;
        self.ctx.stats.record_reload();
        if let Some(t) = &self.ctx.telemetry {
            t.reloads_total.inc();
        }
    }

    async fn replace_generation(
        &self,
        pollers: &mut HashMap<String, PollerHandle>,
        targets: Vec<Target>,
    ) {
        let outgoing: Vec<JoinHandle<()>> = pollers
            .drain()
            .map(|(_, handle)| {
                // A poller that already exited dropped its receiver.
                let _ = handle.stop.send(());
                handle.task
            })
            .collect();
        info!("Stopping {} pollers for reload", outgoing.len());

        let ctx = &self.ctx;
        let generation = ctx.cache.reset(|| ctx.sink.reset_all()).await;
        debug!("Snapshot cache and metric sink cleared, generation {}", generation);

        tokio::time::sleep(RELOAD_SETTLE).await;

        let lingering = outgoing.iter().filter(|t| !t.is_finished()).count();
        if lingering > 0 {
            debug!(
                "{} outgoing pollers still finishing a fetch; their results will be discarded",
                lingering
            );
        }

        self.spawn_generation(pollers, targets, generation);
    }

    fn spawn_generation(
        &self,
        pollers: &mut HashMap<String, PollerHandle>,
        targets: Vec<Target>,
        generation: u64,
    ) {
        // Duplicate keys should have been rejected upstream; last one wins.
        let mut unique: Vec<Target> = Vec::with_capacity(targets.len());
        for target in targets {
            if let Some(pos) = unique.iter().position(|t| t.key() == target.key()) {
                warn!("Duplicate target key {}, keeping the last definition", target.key());
                unique.remove(pos);
            }
            unique.push(target);
        }

        self.ctx.stats.track_targets(&unique);
        if let Some(t) = &self.ctx.telemetry {
            t.targets.set(unique.len() as f64);
        }

        for target in unique {
            let (stop_tx, stop_rx) = oneshot::channel();
            let poller = Poller::new(
                target.clone(),
                generation,
                Arc::clone(&self.client),
                Arc::clone(&self.ctx),
            );
            let task = tokio::spawn(poller.run(stop_rx));
            pollers.insert(
                target.key(),
                PollerHandle {
                    target,
                    stop: stop_tx,
                    task,
                },
            );
        }

        info!(
            "Started {} pollers (generation {})",
            pollers.len(),
            generation
        );
    }

    /// Targets of the running generation, sorted by key.
    pub async fn targets(&self) -> Vec<Target> {
        let pollers = self.pollers.lock().await;
        let mut targets: Vec<Target> = pollers.values().map(|h| h.target.clone()).collect();
        targets.sort_by_key(|t| t.key());
        targets
    }

    /// Stops every poller, aborting those that do not exit within a grace
    /// period. Published samples are left in place.
    pub async fn shutdown(&self) {
        let mut pollers = self.pollers.lock().await;
        let handles: Vec<PollerHandle> = pollers.drain().map(|(_, h)| h).collect();
        info!("Shutting down {} pollers", handles.len());

        for handle in handles {
            let _ = handle.stop.send(());
            let mut task = handle.task;
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                debug!("Poller for {} did not stop in time, aborting", handle.target.key());
                task.abort();
            }
        }
    }
}
