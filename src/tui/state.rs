use crate::dispatcher::FlightGate;
use crate::memory_log::ResultLog;
use crate::model::{AgentStatus, AppEvent, ConnectivityState, MemoryRecord, Operation};
use crate::notice::Notice;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::collections::VecDeque;
use tokio::sync::watch;

pub struct UiState {
    pub tab: usize,
    pub info: String,

    // Search input
    pub input: String,
    pub input_focused: bool,

    // Mirrors of core state, refreshed every loop iteration
    pub status: AgentStatus,
    pub busy: Option<Operation>,
    pub records: Vec<MemoryRecord>,
    pub selected: usize, // Index into records (last = most recent)

    // Pending notices, oldest first; the front one is shown
    pub notices: VecDeque<Notice>,

    pub base_url: String,
    pub page_url: String,
    pub log_path: Option<String>,
    pub last_copied: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            input: String::new(),
            input_focused: false,
            status: AgentStatus::default(),
            busy: None,
            records: Vec::new(),
            selected: 0,
            notices: VecDeque::new(),
            base_url: String::new(),
            page_url: String::new(),
            log_path: None,
            last_copied: None,
        }
    }
}

/// Read-only views of the core that the UI thread polls.
pub struct CoreView {
    pub status_rx: watch::Receiver<AgentStatus>,
    pub gate: FlightGate,
    pub log: ResultLog,
}

impl UiState {
    pub fn is_connected(&self) -> bool {
        self.status.state == ConnectivityState::Connected
    }

    /// Triggers are enabled only while idle and connected.
    pub fn can_trigger(&self) -> bool {
        self.busy.is_none() && self.is_connected()
    }

    /// Why triggers are disabled, if they are.
    pub fn trigger_block_reason(&self) -> Option<String> {
        if let Some(op) = self.busy {
            return Some(format!("{} in progress…", op.verb()));
        }
        match self.status.state {
            ConnectivityState::Connected => None,
            ConnectivityState::Checking => Some("Still checking the desktop agent…".into()),
            ConnectivityState::Disconnected => Some("Desktop agent not connected".into()),
        }
    }

    pub fn selected_record(&self) -> Option<&MemoryRecord> {
        self.records.get(self.selected)
    }

    /// Pull the latest core state. The log only grows, so a length check is enough.
    pub fn refresh(&mut self, core: &CoreView) {
        self.status = core.status_rx.borrow().clone();
        self.busy = core.gate.current();
        if core.log.len() != self.records.len() {
            let was_at_end = self.records.is_empty() || self.selected + 1 == self.records.len();
            self.records = core.log.snapshot();
            if was_at_end {
                self.selected = self.records.len().saturating_sub(1);
            }
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.records.len() {
            self.selected += 1;
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }
}

pub fn apply_event(state: &mut UiState, ev: AppEvent) {
    match ev {
        AppEvent::Notice(n) => {
            state.info = n.title.clone();
            state.notices.push_back(n);
        }
        AppEvent::RecordAppended { record } => {
            // The query that produced this record is done; clear the box for the next one.
            state.input.clear();
            state.info = format!("Memory retrieved: {}", record.query);
        }
        AppEvent::Info(info) => state.info = info.to_message(),
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}
