use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page content is capped before it is sent to the agent.
pub const PAGE_CONTENT_LIMIT: usize = 1000;

/// Which HTTP contract the agent speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Contract {
    /// Bare agent API: `/`, `/save`, `/search-ai-extract`
    Simple,
    /// Desktop agent API under `/api`, with a readiness flag on the status endpoint
    Desktop,
}

impl Contract {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Contract::Simple => "http://localhost:5006",
            Contract::Desktop => "http://localhost:5007",
        }
    }

    pub fn status_path(self) -> &'static str {
        match self {
            Contract::Simple => "/",
            Contract::Desktop => "/api/status",
        }
    }

    pub fn save_path(self) -> &'static str {
        match self {
            Contract::Simple => "/save",
            Contract::Desktop => "/api/kinic/save",
        }
    }

    pub fn search_path(self) -> &'static str {
        match self {
            Contract::Simple => "/search-ai-extract",
            Contract::Desktop => "/api/kinic/search-extract",
        }
    }

    /// Whether the status endpoint reports a `ready` flag.
    pub fn reports_readiness(self) -> bool {
        matches!(self, Contract::Desktop)
    }

    /// Whether the save request carries the page being saved.
    pub fn sends_page(self) -> bool {
        matches!(self, Contract::Desktop)
    }
}

/// The page a save operation refers to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContext {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl PageContext {
    pub fn new(url: String, title: String, content: String) -> Self {
        let content = content.chars().take(PAGE_CONTENT_LIMIT).collect();
        Self {
            url,
            title,
            content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub contract: Contract,
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub page: PageContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Checking,
    Connected,
    Disconnected,
}

impl ConnectivityState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectivityState::Checking => "Checking Desktop Agent...",
            ConnectivityState::Connected => "Desktop Agent Connected",
            ConnectivityState::Disconnected => "Desktop Agent Disconnected",
        }
    }
}

/// Latest probe verdict plus whatever the agent (or the failure) said about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub state: ConnectivityState,
    #[serde(default)]
    pub detail: Option<String>,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            state: ConnectivityState::Checking,
            detail: None,
        }
    }
}

/// The two user-triggered operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Save,
    Search,
}

impl Operation {
    pub fn verb(self) -> &'static str {
        match self {
            Operation::Save => "Save",
            Operation::Search => "Search",
        }
    }
}

/// One completed search, kept for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

/// Events emitted by the controller and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Notice(crate::notice::Notice),
    RecordAppended { record: MemoryRecord },
    Info(InfoEvent),
}

/// Short status-line messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoEvent {
    Message(String),
    Busy { requested: Operation, running: Operation },
    EmptyQuery,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Busy { requested, running } => format!(
                "{} ignored: {} still in progress",
                requested.verb(),
                running.verb().to_lowercase()
            ),
            InfoEvent::EmptyQuery => "Type a query first".to_string(),
        }
    }
}
