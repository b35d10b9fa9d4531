//! Collector delivery.
//!
//! The agent speaks plain HTTPS to the collector: one POST per cycle
//! with the assembled report, plus two small GETs for remote config
//! and the published agent version. Everything is synchronous; the
//! agent has no async runtime to keep alive between cycles.
//!
//! Delivery failure is the only transport outcome that propagates to
//! the caller. Config and version fetches absorb their failures, since
//! a cycle is still useful without them.

use std::time::Duration;

use pm_common::{AgentReport, AGENT_VERSION};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Timeout for posting a report.
pub const DELIVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the small config/version queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

const DATA_PATH: &str = "/api/agents/data";
const CONFIG_PATH: &str = "/api/agents/config";
const VERSION_PATH: &str = "/api/agents/version";

/// How much of a rejection body is kept for the log.
const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("collector unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("collector rejected report: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },
}

impl TransportError {
    /// Whether the rejection was an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Rejected {
                status: 401 | 403,
                ..
            }
        )
    }
}

/// Settings pushed down from the collector.
///
/// Unknown fields are ignored so older agents keep working against
/// newer collectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    /// Desired collection interval, in minutes.
    #[serde(default)]
    pub collection_interval_minutes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(default)]
    latest_version: Option<String>,
}

/// The collector as the agent sees it.
pub trait Collector {
    /// Post one report. The only transport call whose failure matters
    /// upward, for retry scheduling.
    fn deliver(&self, report: &AgentReport) -> Result<(), TransportError>;

    /// Fetch collector-pushed settings; `None` when unavailable.
    fn fetch_remote_config(&self) -> Option<RemoteConfig>;

    /// The newest published agent version, when the collector exposes one.
    fn latest_agent_version(&self) -> Option<String>;
}

/// Log when the collector publishes a newer agent than this one.
pub fn warn_if_outdated(collector: &dyn Collector) {
    if let Some(latest) = collector.latest_agent_version() {
        if latest != AGENT_VERSION {
            warn!(latest, current = AGENT_VERSION, "newer agent version available");
        } else {
            debug!(version = AGENT_VERSION, "agent is up to date");
        }
    }
}

/// HTTP collector client.
pub struct HttpCollector {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl HttpCollector {
    pub fn new(server_url: &str, token: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("patchmon-agent/{AGENT_VERSION}"))
            .build()?;

        Ok(HttpCollector {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(self.endpoint(path))
            .bearer_auth(&self.token)
            .timeout(QUERY_TIMEOUT)
    }
}

impl Collector for HttpCollector {
    fn deliver(&self, report: &AgentReport) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint(DATA_PATH))
            .bearer_auth(&self.token)
            .timeout(DELIVER_TIMEOUT)
            .json(report)
            .send()?;

        let status = response.status().as_u16();
        if status == 200 {
            info!("report delivered");
            return Ok(());
        }

        let body = snippet(response.text().unwrap_or_default());
        Err(TransportError::Rejected { status, body })
    }

    fn fetch_remote_config(&self) -> Option<RemoteConfig> {
        let response = match self.get(CONFIG_PATH).send() {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "network error fetching remote config");
                return None;
            }
        };
        if response.status().as_u16() != 200 {
            error!(status = response.status().as_u16(), "failed to fetch remote config");
            return None;
        }
        match response.json::<RemoteConfig>() {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "remote config payload malformed");
                None
            }
        }
    }

    fn latest_agent_version(&self) -> Option<String> {
        let response = match self.get(VERSION_PATH).send() {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "network error checking agent version");
                return None;
            }
        };
        if response.status().as_u16() != 200 {
            debug!(status = response.status().as_u16(), "could not check agent version");
            return None;
        }
        match response.json::<VersionInfo>() {
            Ok(info) => info.latest_version,
            Err(e) => {
                debug!(error = %e, "version payload malformed");
                None
            }
        }
    }
}

fn snippet(body: String) -> String {
    if body.len() <= BODY_SNIPPET_LEN {
        return body;
    }
    let mut end = BODY_SNIPPET_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
