//! HTTP client for the local automation agent.
//!
//! One client covers both contract variants; the `Contract` picks paths and payload shapes.

mod wire;

pub use wire::{OperationReply, StatusReply};
pub(crate) use wire::non_empty;

use crate::error::AgentError;
use crate::model::{AgentConfig, Contract, PageContext};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    inner: Arc<ClientCfg>,
}

struct ClientCfg {
    base_url: String,
    contract: Contract,
    probe_timeout: Duration,
    request_timeout: Duration,
    page: PageContext,
}

impl AgentClient {
    pub fn new(cfg: &AgentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build agent http client")?;
        Ok(Self {
            http,
            inner: Arc::new(ClientCfg {
                base_url: cfg.base_url.trim_end_matches('/').to_string(),
                contract: cfg.contract,
                probe_timeout: cfg.probe_timeout,
                request_timeout: cfg.request_timeout,
                page: cfg.page.clone(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Probe the status endpoint. `Ok` carries the agent's status message, if any.
    pub async fn probe(&self) -> Result<Option<String>, AgentError> {
        let url = self.url(self.inner.contract.status_path());
        let resp = self
            .http
            .get(&url)
            .timeout(self.inner.probe_timeout)
            .send()
            .await
            .map_err(|e| AgentError::transport(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AgentError::Unhealthy(status));
        }
        if !self.inner.contract.reports_readiness() {
            return Ok(None);
        }

        let body: StatusReply = resp
            .json()
            .await
            .map_err(|e| AgentError::transport(&url, e))?;
        match body.ready {
            Some(false) => Err(AgentError::NotReady(non_empty(body.message))),
            _ => Ok(non_empty(body.message)),
        }
    }

    /// Ask the agent to save the configured page.
    pub async fn save_page(&self) -> Result<OperationReply, AgentError> {
        let url = self.url(self.inner.contract.save_path());
        let mut req = self.http.post(&url).timeout(self.inner.request_timeout);
        if self.inner.contract.sends_page() {
            req = req.json(&wire::SaveRequest::from(&self.inner.page));
        }
        self.send_operation(&url, req).await
    }

    /// Ask the agent to search memory and extract the AI answer.
    pub async fn search(&self, query: &str) -> Result<OperationReply, AgentError> {
        let url = self.url(self.inner.contract.search_path());
        let req = self
            .http
            .post(&url)
            .timeout(self.inner.request_timeout)
            .json(&wire::SearchRequest { query });
        self.send_operation(&url, req).await
    }

    // The agent reports failures as JSON with a 5xx status, so the status code is not consulted.
    async fn send_operation(
        &self,
        url: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<OperationReply, AgentError> {
        let resp = req.send().await.map_err(|e| AgentError::transport(url, e))?;
        tracing::debug!(url, status = %resp.status(), "agent replied");
        resp.json::<OperationReply>()
            .await
            .map_err(|e| AgentError::transport(url, e))
    }
}
