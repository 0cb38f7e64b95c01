//! JSON bodies exchanged with the agent.

use crate::error::AgentError;
use crate::model::PageContext;
use serde::{Deserialize, Deserializer, Serialize};

/// Body of the desktop status endpoint. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveRequest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a PageContext> for SaveRequest<'a> {
    fn from(page: &'a PageContext) -> Self {
        Self {
            url: &page.url,
            title: &page.title,
            content: &page.content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
}

/// Reply shared by the save and search endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationReply {
    pub success: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub ai_response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl OperationReply {
    /// Split a reply into its success payload or the agent-reported failure.
    pub fn into_result(self) -> Result<Self, AgentError> {
        if self.success {
            return Ok(self);
        }
        Err(AgentError::Application {
            message: non_empty(self.error).unwrap_or_else(|| "unknown error".to_string()),
            suggestion: non_empty(self.suggestion),
        })
    }
}

pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
