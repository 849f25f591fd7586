//! Registry client: one HTTP fetch against a Eureka server.
//!
//! The client is stateless. Every call fetches `{endpoint}/eureka/apps`,
//! checks the status code and flattens the application list into a
//! [`Snapshot`]. Any failure is reported as a [`FetchError`] and is
//! per-cycle only; callers keep their previous state.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::model::{InstanceRecord, Snapshot, Target};

/// Default upper bound for one registry request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for establishing the TCP/TLS connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from a single registry fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry answered with status {0}")]
    Status(StatusCode),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetches the current instance list of one registry target.
pub trait RegistryFetch: Send + Sync + 'static {
    fn fetch(&self, target: &Target) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    applications: Applications,
}

#[derive(Debug, Deserialize)]
struct Applications {
    #[serde(default)]
    application: Vec<Application>,
}

#[derive(Debug, Deserialize)]
struct Application {
    #[serde(default)]
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    instance: Vec<InstanceRecord>,
}

/// Parses a Eureka `/eureka/apps` JSON body into a flat snapshot.
///
/// Instances keep the order in which the registry listed them.
pub fn parse_apps_response(body: &[u8]) -> Result<Snapshot, FetchError> {
    let resp: AppsResponse = serde_json::from_slice(body)?;
    Ok(resp
        .applications
        .application
        .into_iter()
        .flat_map(|app| app.instance)
        .collect())
}

/// Eureka registry client backed by `reqwest`.
#[derive(Clone)]
pub struct EurekaClient {
    http: reqwest::Client,
}

impl EurekaClient {
    /// Creates a client whose requests never outlive `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(Self { http })
    }
}

impl RegistryFetch for EurekaClient {
    async fn fetch(&self, target: &Target) -> Result<Snapshot, FetchError> {
        let url = target.apps_url();

        let mut req = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(auth) = &target.credentials {
            req = req.basic_auth(&auth.user, Some(&auth.password));
        }

        let resp = req.send().await?;
        if resp.status() != StatusCode::OK {
            return Err(FetchError::Status(resp.status()));
        }

        let body = resp.bytes().await?;
        let snapshot = parse_apps_response(&body)?;
        debug!(
            "Fetched {} instances from {} ({} bytes)",
            snapshot.len(),
            url,
            body.len()
        );
        Ok(snapshot)
    }
}
