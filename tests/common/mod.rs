//! Shared helpers for integration tests: an in-memory metric sink and a
//! registry whose answers the test controls.
#![allow(dead_code)]

use ahash::AHashMap as HashMap;
use ahash::AHashSet as HashSet;
use eureka_exporter::{
    FetchError, InstanceRecord, InstanceStatus, LabelTuple, MetricSink, RegistryFetch, Snapshot,
    Target,
};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sink that keeps the published tuples in a set.
#[derive(Default)]
pub struct MemorySink {
    samples: Mutex<HashSet<LabelTuple>>,
}

impl MemorySink {
    pub fn len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn tuples(&self) -> Vec<LabelTuple> {
        self.samples.lock().unwrap().iter().cloned().collect()
    }

    /// True when a sample exists for this target name, host and status.
    pub fn has(&self, target_name: &str, host: &str, status: &str) -> bool {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.target_name == target_name && t.host == host && t.status == status)
    }

    /// Number of samples published for a target name.
    pub fn count_for(&self, target_name: &str) -> usize {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.target_name == target_name)
            .count()
    }
}

impl MetricSink for MemorySink {
    fn set(&self, tuple: &LabelTuple) {
        self.samples.lock().unwrap().insert(tuple.clone());
    }

    fn delete(&self, tuple: &LabelTuple) {
        self.samples.lock().unwrap().remove(tuple);
    }

    fn reset_all(&self) {
        self.samples.lock().unwrap().clear();
    }
}

#[derive(Clone)]
enum Answer {
    Ok(Snapshot),
    Fail(StatusCode),
}

#[derive(Default)]
struct Script {
    answers: HashMap<String, Answer>,
    first: HashMap<String, Answer>,
    delays: HashMap<String, Duration>,
    calls: HashMap<String, usize>,
}

/// Registry double keyed by target key. Clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedRegistry {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, target: &Target, snapshot: Snapshot) {
        self.script
            .lock()
            .unwrap()
            .answers
            .insert(target.key(), Answer::Ok(snapshot));
    }

    pub fn fail(&self, target: &Target, status: StatusCode) {
        self.script
            .lock()
            .unwrap()
            .answers
            .insert(target.key(), Answer::Fail(status));
    }

    /// Makes only the next fetch of `target` fail; the answer is fixed when
    /// the fetch starts, so a delayed fetch still fails after the delay.
    pub fn fail_next(&self, target: &Target, status: StatusCode) {
        self.script
            .lock()
            .unwrap()
            .first
            .insert(target.key(), Answer::Fail(status));
    }

    /// Makes every fetch of `target` take `delay` before answering.
    pub fn delay(&self, target: &Target, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .delays
            .insert(target.key(), delay);
    }

    pub fn calls(&self, target: &Target) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .get(&target.key())
            .copied()
            .unwrap_or(0)
    }
}

impl RegistryFetch for ScriptedRegistry {
    async fn fetch(&self, target: &Target) -> Result<Snapshot, FetchError> {
        let key = target.key();
        let (delay, pinned) = {
            let mut script = self.script.lock().unwrap();
            *script.calls.entry(key.clone()).or_insert(0) += 1;
            (script.delays.get(&key).copied(), script.first.remove(&key))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let answer = match pinned {
            Some(answer) => Some(answer),
            None => self.script.lock().unwrap().answers.get(&key).cloned(),
        };
        match answer {
            Some(Answer::Ok(snapshot)) => Ok(snapshot),
            Some(Answer::Fail(status)) => Err(FetchError::Status(status)),
            None => Err(FetchError::Status(StatusCode::NOT_FOUND)),
        }
    }
}

pub fn target(name: &str, endpoint: &str) -> Target {
    Target::new(name, endpoint, Some(Duration::from_secs(1)), None)
}

pub fn up(app: &str, host: &str) -> InstanceRecord {
    InstanceRecord::new(app, host, InstanceStatus::Up)
}

pub fn down(app: &str, host: &str) -> InstanceRecord {
    InstanceRecord::new(app, host, InstanceStatus::Down)
}
