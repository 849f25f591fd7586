//! Live reconfiguration.
//!
//! `ConfigReloader` re-reads the config file, validates it and hands the
//! expanded targets to the supervisor. An invalid file never reaches the
//! supervisor; the running generation keeps polling. `watch` drives the
//! reloader from filesystem events on the config file.

use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{load_config, validate_effective_config, Config, ConfigError};
use crate::registry::RegistryFetch;
use crate::supervisor::Supervisor;

/// Quiet period after the first file event before reloading, so an
/// editor's write/rename burst yields a single reload.
const DEBOUNCE: Duration = Duration::from_millis(250);

pub struct ConfigReloader<C> {
    path: PathBuf,
    supervisor: Arc<Supervisor<C>>,
    /// Settings fixed at startup that a reload cannot change.
    metadata: Vec<String>,
    port: Option<u16>,
    /// Set when `--port` overrides the file, so the file value never applies.
    port_from_cli: bool,
}

impl<C: RegistryFetch> ConfigReloader<C> {
    pub fn new(path: PathBuf, supervisor: Arc<Supervisor<C>>, startup: &Config) -> Self {
        Self {
            path,
            supervisor,
            metadata: startup.metadata.clone(),
            port: startup.port,
            port_from_cli: false,
        }
    }

    /// Marks the listen port as given on the command line.
    pub fn with_cli_port(mut self, from_cli: bool) -> Self {
        self.port_from_cli = from_cli;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the config file and, if it is usable, replaces
    /// the supervisor's generation. Returns the number of new targets.
    ///
    /// A rejected file is logged and leaves the running generation alone.
    pub async fn reload_from_file(&self) -> Result<usize, ConfigError> {
        let result = self.try_reload().await;
        if let Err(e) = &result {
            warn!("eureka exporter config invalid, ignoring reload: {}", e);
        }
        result
    }

    async fn try_reload(&self) -> Result<usize, ConfigError> {
        let cfg = load_config(&self.path)?;
        validate_effective_config(&cfg)?;

        let targets = cfg.targets();
        if targets.is_empty() {
            return Err(ConfigError::Invalid(
                "no valid eureka instance in config".into(),
            ));
        }

        if cfg.metadata != self.metadata {
            warn!(
                "metadata labels changed ({:?} -> {:?}); label changes need a restart, keeping {:?}",
                self.metadata, cfg.metadata, self.metadata
            );
        }
        if self.port_changed(&cfg) {
            warn!("port changed in config; the listener is only bound at startup");
        }

        let count = targets.len();
        info!("Reloading with {} targets from {}", count, self.path.display());
        self.supervisor.reload(targets).await;
        Ok(count)
    }

    fn port_changed(&self, cfg: &Config) -> bool {
        !self.port_from_cli && cfg.port != self.port
    }

    fn is_relevant(&self, event: &Event) -> bool {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return false;
        }
        let Some(name) = self.path.file_name() else {
            return false;
        };
        event.paths.iter().any(|p| p.file_name() == Some(name))
    }

    /// Watches the config file and reloads on every create/modify event
    /// until the watcher shuts down.
    ///
    /// The parent directory is watched instead of the file itself, since
    /// many editors replace the file on save.
    pub async fn watch(self) -> Result<(), notify::Error> {
        let (tx, mut rx) = mpsc::channel::<notify::Result<Event>>(64);
        let mut watcher = notify::recommended_watcher(move |res| {
            // Runs on the watcher's own thread.
            let _ = tx.blocking_send(res);
        })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        info!("Watching {} for changes", self.path.display());

        while let Some(res) = rx.recv().await {
            match res {
                Ok(event) if self.is_relevant(&event) => {
                    debug!("Config file event: {:?}", event.kind);
                    tokio::time::sleep(DEBOUNCE).await;
                    while rx.try_recv().is_ok() {}

                    info!("config file created/written, reloading");
                    let _ = self.reload_from_file().await;
                }
                Ok(_) => {}
                Err(e) => warn!("config file watch error: {}", e),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{LabelSchema, LabelTuple, MetricSink};
    use crate::model::{Snapshot, Target};
    use crate::poller::MonitorContext;
    use crate::registry::FetchError;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};

    struct NoopSink;

    impl MetricSink for NoopSink {
        fn set(&self, _: &LabelTuple) {}
        fn delete(&self, _: &LabelTuple) {}
        fn reset_all(&self) {}
    }

    struct EmptyRegistry;

    impl RegistryFetch for EmptyRegistry {
        async fn fetch(&self, _: &Target) -> Result<Snapshot, FetchError> {
            Ok(Vec::new())
        }
    }

    fn reloader(path: &str) -> ConfigReloader<EmptyRegistry> {
        let ctx = MonitorContext::new(Arc::new(NoopSink), LabelSchema::new(&[]));
        let supervisor = Arc::new(Supervisor::new(EmptyRegistry, ctx));
        ConfigReloader::new(PathBuf::from(path), supervisor, &Config::default())
    }

    #[test]
    fn test_only_writes_to_the_config_file_are_relevant() {
        let r = reloader("/etc/eureka-exporter/config.yaml");
        let modify = || EventKind::Modify(ModifyKind::Data(DataChange::Content));

        let ev = Event::new(modify()).add_path("/etc/eureka-exporter/config.yaml".into());
        assert!(r.is_relevant(&ev));

        let ev = Event::new(EventKind::Create(CreateKind::File))
            .add_path("/etc/eureka-exporter/config.yaml".into());
        assert!(r.is_relevant(&ev));

        let ev = Event::new(modify()).add_path("/etc/eureka-exporter/other.yaml".into());
        assert!(!r.is_relevant(&ev));

        let ev = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path("/etc/eureka-exporter/config.yaml".into());
        assert!(!r.is_relevant(&ev));

        let ev = Event::new(EventKind::Access(AccessKind::Any))
            .add_path("/etc/eureka-exporter/config.yaml".into());
        assert!(!r.is_relevant(&ev));
    }

    #[test]
    fn test_port_change_ignored_when_set_on_command_line() {
        let file = Config {
            port: Some(9200),
            ..Config::default()
        };

        let r = reloader("/etc/eureka-exporter/config.yaml");
        assert!(r.port_changed(&file));

        // Startup config carries the CLI port; the file keeps its own.
        let ctx = MonitorContext::new(Arc::new(NoopSink), LabelSchema::new(&[]));
        let supervisor = Arc::new(Supervisor::new(EmptyRegistry, ctx));
        let startup = Config {
            port: Some(9300),
            ..Config::default()
        };
        let r = ConfigReloader::new(PathBuf::from("config.yaml"), supervisor, &startup)
            .with_cli_port(true);
        assert!(!r.port_changed(&file));
        assert!(!r.port_changed(&startup));
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let r = reloader("/nonexistent/eureka-exporter.yaml");
        assert!(matches!(
            r.reload_from_file().await,
            Err(ConfigError::Io { .. })
        ));
        assert!(r.supervisor.targets().await.is_empty());
    }
}
