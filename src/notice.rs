//! User-facing notifications produced by dispatched operations.

use crate::error::AgentError;
use crate::model::Operation;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    ApplicationError,
    ConnectionError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn saved(agent_message: Option<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Page saved".into(),
            body: agent_message
                .unwrap_or_else(|| "Page saved to Kinic memory via Chrome extension!".into()),
        }
    }

    /// The agent ran the operation and said no.
    pub fn rejected(op: Operation, message: &str, suggestion: Option<&str>) -> Self {
        let mut body = format!("{} failed: {message}", op.verb());
        if let Some(s) = suggestion {
            body.push_str("\n\n");
            body.push_str(s);
        }
        Self {
            kind: NoticeKind::ApplicationError,
            title: format!("{} failed", op.verb()),
            body,
        }
    }

    /// The call itself failed; lists what to check on the agent side.
    pub fn unreachable(err: &AgentError, base_url: &str) -> Self {
        let cause = if err.is_timeout() {
            format!("timed out waiting for the agent ({err})")
        } else {
            err.to_string()
        };
        Self {
            kind: NoticeKind::ConnectionError,
            title: "Connection error".into(),
            body: format!(
                "Connection error: {cause}\n\nPlease ensure:\n\
                 • Desktop agent running on {base_url}\n\
                 • Chrome browser open\n\
                 • Kinic extension installed"
            ),
        }
    }

    pub fn from_error(op: Operation, err: &AgentError, base_url: &str) -> Self {
        match err {
            AgentError::Application {
                message,
                suggestion,
            } => Self::rejected(op, message, suggestion.as_deref()),
            other => Self::unreachable(other, base_url),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind != NoticeKind::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_error_and_suggestion() {
        let n = Notice::from_error(
            Operation::Search,
            &AgentError::Application {
                message: "no extension".into(),
                suggestion: Some("install it".into()),
            },
            "http://localhost:5007",
        );
        assert_eq!(n.kind, NoticeKind::ApplicationError);
        assert!(n.body.contains("no extension"));
        assert!(n.body.contains("install it"));
    }

    #[test]
    fn rejection_without_suggestion_has_no_trailing_block() {
        let n = Notice::rejected(Operation::Save, "boom", None);
        assert_eq!(n.body, "Save failed: boom");
    }

    #[test]
    fn unreachable_lists_remediation_steps() {
        let n = Notice::unreachable(
            &AgentError::Unhealthy(reqwest::StatusCode::BAD_GATEWAY),
            "http://localhost:5006",
        );
        assert_eq!(n.kind, NoticeKind::ConnectionError);
        assert!(n.body.contains("Desktop agent running on http://localhost:5006"));
        assert!(n.body.contains("Chrome browser open"));
        assert!(n.body.contains("Kinic extension installed"));
        assert!(n.is_error());
    }
}
