//! HTTP client the delivery activity (H2) uses to push desired state to a
//! single node agent, and that the drift-ingest path (H3) can use to pull
//! a node's self-reported health on demand.
//!
//! One `NodeClient` per node; the convergence loop builds one per target
//! inside its bounded-fanout loop rather than sharing a single client
//! across differently-addressed nodes.

use crate::errors::NodeClientError;
use hosting_domain::{DesiredState, NodeHealthReport};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::instrument;

const DEFAULT_AGENT_PORT: u16 = 9443;

pub struct NodeClient {
    http: Client,
    node_base_url: String,
}

impl NodeClient {
    /// `shared_secret` authenticates the control plane to the agent; the
    /// agent's own authentication of inbound pushes is out of scope here.
    pub fn new(node_hostname: &str, shared_secret: &str) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {shared_secret}"))
            .expect("shared secret must be a valid header value");
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("hosting-orchestrator/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("node client http builder should never fail with static config");

        Self {
            http,
            node_base_url: format!("https://{node_hostname}:{DEFAULT_AGENT_PORT}"),
        }
    }

    #[instrument(skip(self, state), fields(node = %self.node_base_url))]
    pub async fn push_desired_state(&self, state: &DesiredState) -> Result<(), NodeClientError> {
        let url = format!("{}/v1/desired-state", self.node_base_url);
        let response = self.http.put(&url).json(state).send().await?;
        Self::expect_ok(response).await.map(|_| ())
    }

    #[instrument(skip(self), fields(node = %self.node_base_url))]
    pub async fn fetch_health(&self) -> Result<NodeHealthReport, NodeClientError> {
        let url = format!("{}/v1/health", self.node_base_url);
        let response = self.http.get(&url).send().await?;
        let body = Self::expect_ok(response).await?;
        serde_json::from_str(&body).map_err(NodeClientError::Decoding)
    }

    #[instrument(skip(self, outcome), fields(node = %self.node_base_url))]
    pub async fn report_cron_outcome(&self, cron_job_id: &str, outcome: &CronOutcome) -> Result<(), NodeClientError> {
        let url = format!(
            "{}/v1/cron-jobs/{cron_job_id}/outcome",
            self.node_base_url
        );
        let response = self.http.post(&url).json(outcome).send().await?;
        Self::expect_ok(response).await.map(|_| ())
    }

    async fn expect_ok(response: reqwest::Response) -> Result<String, NodeClientError> {
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::ACCEPTED {
            Ok(response.text().await.unwrap_or_default())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NodeClientError::Rejected { status: status.as_u16(), body })
        }
    }
}

/// One entry of the batch `POST /internal/v1/cron-jobs/{id}/outcome`
/// surface (spec §9 open question, resolved in favor of the batch form).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CronOutcome {
    pub ran_at: chrono::DateTime<chrono::Utc>,
    pub succeeded: bool,
    pub detail: Option<String>,
}
