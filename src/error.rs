use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong talking to the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The request never produced a usable reply: refused connection, DNS,
    /// timeout, or a body that is not the expected JSON.
    #[error("{url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The status endpoint answered with a non-success code.
    #[error("agent status endpoint returned {0}")]
    Unhealthy(StatusCode),

    /// The status endpoint answered but reported `ready: false`.
    #[error("agent not ready{}", .0.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    NotReady(Option<String>),

    /// The agent ran the operation and reported `success: false`.
    #[error("{message}")]
    Application {
        message: String,
        suggestion: Option<String>,
    },
}

impl AgentError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        AgentError::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Transport { source, .. } if source.is_timeout())
    }
}
