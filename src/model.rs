//! Core data model shared by the registry client, diff engine and pollers.
//!
//! A `Target` is one registry endpoint to poll, an `InstanceRecord` is one
//! registered service instance, and a `Snapshot` is everything one target
//! reported in one poll cycle.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Poll interval applied when a target has none (or a zero one) configured.
pub const DEFAULT_PULL_INTERVAL: Duration = Duration::from_secs(30);

/// All instances observed for one target in one poll cycle.
pub type Snapshot = Vec<InstanceRecord>;

/// HTTP Basic credentials for a registry.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BasicAuth {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One registry endpoint polled on a fixed interval.
///
/// Immutable once a poller runs against it; a reload replaces targets
/// wholesale instead of mutating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub endpoint: String,
    pub interval: Duration,
    pub credentials: Option<BasicAuth>,
}

impl Target {
    /// Builds a target, stripping a trailing slash from the endpoint and
    /// falling back to [`DEFAULT_PULL_INTERVAL`] for a zero interval.
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        interval: Option<Duration>,
        credentials: Option<BasicAuth>,
    ) -> Self {
        let endpoint = endpoint.trim();
        let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint).to_string();
        let interval = interval
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_PULL_INTERVAL);
        // An empty user means "no auth", same as leaving the block out.
        let credentials = credentials.filter(|c| !c.user.is_empty());

        Self {
            name: name.into(),
            endpoint,
            interval,
            credentials,
        }
    }

    /// Unique key of this target: name plus endpoint.
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.endpoint)
    }

    /// Full URL of the registry's application listing.
    pub fn apps_url(&self) -> String {
        format!("{}/eureka/apps", self.endpoint)
    }
}

/// Registration status reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    Unknown,
    /// Anything the registry sends that is not one of the known values.
    Unrecognized(String),
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceStatus::Up => "UP",
            InstanceStatus::Down => "DOWN",
            InstanceStatus::Starting => "STARTING",
            InstanceStatus::OutOfService => "OUT_OF_SERVICE",
            InstanceStatus::Unknown => "UNKNOWN",
            InstanceStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "UP" => InstanceStatus::Up,
            "DOWN" => InstanceStatus::Down,
            "STARTING" => InstanceStatus::Starting,
            "OUT_OF_SERVICE" => InstanceStatus::OutOfService,
            "UNKNOWN" => InstanceStatus::Unknown,
            _ => InstanceStatus::Unrecognized(raw),
        }
    }
}

impl From<&str> for InstanceStatus {
    fn from(raw: &str) -> Self {
        InstanceStatus::from(raw.to_string())
    }
}

impl From<InstanceStatus> for String {
    fn from(status: InstanceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered service instance as reported by the registry.
///
/// Equality and hashing cover every field. Metadata is kept in a `BTreeMap`
/// so two records that only differ in the order the registry listed their
/// metadata keys compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub app: String,
    #[serde(rename = "hostName")]
    pub host_name: String,
    #[serde(rename = "instanceId", default)]
    pub instance_id: String,
    #[serde(rename = "ipAddr", default)]
    pub ip_addr: String,
    pub status: InstanceStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Registries send `"metadata": null` for instances registered without any.
fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl InstanceRecord {
    pub fn new(app: &str, host_name: &str, status: InstanceStatus) -> Self {
        Self {
            app: app.to_string(),
            host_name: host_name.to_string(),
            instance_id: String::new(),
            ip_addr: String::new(),
            status,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}
