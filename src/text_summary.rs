//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for the one-shot commands.

use crate::model::{AgentStatus, ConnectivityState, MemoryRecord};
use crate::notice::Notice;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_status_summary(status: &AgentStatus, base_url: &str) -> TextSummary {
    let mut lines = vec![format!("{} ({base_url})", status.state.label())];
    if let Some(detail) = status.detail.as_deref() {
        lines.push(format!("  {detail}"));
    }
    if status.state == ConnectivityState::Disconnected {
        lines.extend(setup_steps().iter().map(|s| format!("  - {s}")));
    }
    TextSummary { lines }
}

pub(crate) fn build_record_summary(record: &MemoryRecord) -> TextSummary {
    let mut lines = vec![
        format!("Query: {}", record.query),
        format!("At: {} (id {})", record.timestamp, record.id),
        String::new(),
    ];
    lines.extend(record.response.lines().map(str::to_string));
    TextSummary { lines }
}

pub(crate) fn build_notice_summary(notice: &Notice) -> TextSummary {
    TextSummary {
        lines: notice.body.lines().map(str::to_string).collect(),
    }
}

/// What a user has to do before the agent answers.
pub(crate) fn setup_steps() -> &'static [&'static str] {
    &[
        "Start the desktop agent (python kinic-base-agent.py)",
        "Open Chrome with the Kinic extension installed",
        "Run the coordinate setup tools if the extension is not found",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operation;

    #[test]
    fn disconnected_status_lists_setup_steps() {
        let s = build_status_summary(
            &AgentStatus {
                state: ConnectivityState::Disconnected,
                detail: Some("agent not ready".into()),
            },
            "http://localhost:5007",
        );
        assert_eq!(s.lines[0], "Desktop Agent Disconnected (http://localhost:5007)");
        assert_eq!(s.lines[1], "  agent not ready");
        assert_eq!(s.lines.len(), 2 + setup_steps().len());
    }

    #[test]
    fn connected_status_is_one_line() {
        let s = build_status_summary(
            &AgentStatus {
                state: ConnectivityState::Connected,
                detail: None,
            },
            "http://localhost:5006",
        );
        assert_eq!(s.lines, vec!["Desktop Agent Connected (http://localhost:5006)"]);
    }

    #[test]
    fn record_keeps_multiline_answers() {
        let r = MemoryRecord {
            id: "7".into(),
            query: "rust".into(),
            response: "line one\nline two".into(),
            timestamp: "2025-01-01 10:00:00".into(),
        };
        let s = build_record_summary(&r);
        assert_eq!(s.lines[0], "Query: rust");
        assert_eq!(&s.lines[3..], ["line one", "line two"]);
    }

    #[test]
    fn notice_body_is_split_into_lines() {
        let n = Notice::rejected(Operation::Search, "no extension", Some("install it"));
        let s = build_notice_summary(&n);
        assert_eq!(s.lines, vec!["Search failed: no extension", "", "install it"]);
    }
}
