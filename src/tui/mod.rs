mod clipboard;
mod help;
mod input;
mod state;

use crate::agent::AgentClient;
use crate::dispatcher::Dispatcher;
use crate::memory_log::ResultLog;
use crate::model::{AgentConfig, AppEvent, ConnectivityState};
use crate::monitor::ConnectivityMonitor;
use crate::notice::NoticeKind;
use crate::orchestrator::{self, UiCommand};
use crate::text_summary::setup_steps;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use input::KeyAction;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{apply_event, push_wrapped_status_kv, CoreView, UiState};
use std::path::PathBuf;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: AgentConfig, log_path: Option<PathBuf>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let client = AgentClient::new(&cfg)?;
    let monitor = ConnectivityMonitor::new(client.clone(), cfg.poll_interval);
    let dispatcher = Dispatcher::new(client, ResultLog::new());

    let core = CoreView {
        status_rx: monitor.subscribe(),
        gate: dispatcher.gate(),
        log: dispatcher.log(),
    };
    let initial = UiState {
        base_url: cfg.base_url.clone(),
        page_url: cfg.page.url.clone(),
        log_path: log_path.map(|p| p.display().to_string()),
        ..Default::default()
    };

    // The terminal loop blocks, so it gets its own thread; the runtime serves the agent calls.
    let ui_handle = std::thread::spawn(move || run_threaded(initial, core, event_rx, cmd_tx));

    let res = orchestrator::run_controller(monitor, dispatcher, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    core: CoreView,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }
        state.refresh(&core);

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match input::handle_key(&mut state, k) {
                    KeyAction::Nothing => {}
                    KeyAction::Send(cmd) => {
                        // Controller gone means the session is over.
                        if cmd_tx.send(cmd).is_err() {
                            break Ok(());
                        }
                    }
                    KeyAction::CopySelected => copy_selected(&mut state),
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn copy_selected(state: &mut UiState) {
    let Some(record) = state.selected_record() else {
        return;
    };
    let id = record.id.clone();
    match clipboard::copy_to_clipboard(&record.response) {
        Ok(()) => {
            state.info = format!("Copied answer {id} to clipboard");
            state.last_copied = Some(id);
        }
        Err(e) => state.info = format!("Copy failed: {e:#}"),
    }
}

fn state_color(state: ConnectivityState) -> Color {
    match state {
        ConnectivityState::Connected => Color::Green,
        ConnectivityState::Disconnected => Color::Red,
        ConnectivityState::Checking => Color::Yellow,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Memory"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("kinic-console"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_status_bar(chunks[1], f, state);

    match state.tab {
        0 => draw_memory(chunks[2], f, state),
        _ => help::draw_help(chunks[2], f, &state.base_url, state.log_path.as_deref()),
    }

    let info = Paragraph::new(Line::from(Span::styled(
        state.info.clone(),
        Style::default().fg(Color::Gray),
    )));
    f.render_widget(info, chunks[3]);

    if let Some(notice) = state.notices.front() {
        draw_notice(area, f, notice, state.notices.len());
    }
}

fn draw_status_bar(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let color = state_color(state.status.state);
    let mut spans = vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(
            state.status.state.label(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(detail) = state.status.detail.as_deref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(detail.to_string(), Style::default().fg(Color::Gray)));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(state.base_url.clone()));
    f.render_widget(p, area);
}

fn draw_memory(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(area);

    draw_operations(cols[0], f, state);
    draw_results(cols[1], f, state);
}

fn draw_operations(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let enabled = state.can_trigger();
    let key_style = if enabled {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut lines: Vec<Line<'static>> = Vec::new();
    lines.push(Line::from(vec![
        Span::styled("[s]", key_style),
        Span::raw(" Save current page"),
    ]));
    push_wrapped_status_kv(&mut lines, "Page", &state.page_url, area.width);
    lines.push(Line::from(""));

    lines.push(Line::from(vec![
        Span::styled("[/]", key_style),
        Span::raw(" Search memory"),
    ]));
    let (cursor, border) = if state.input_focused {
        ("▏", Color::Yellow)
    } else {
        ("", Color::DarkGray)
    };
    let shown = if state.input.is_empty() && !state.input_focused {
        Span::styled("type a query…", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(format!("{}{cursor}", state.input))
    };
    lines.push(Line::from(vec![
        Span::styled("> ", Style::default().fg(border)),
        shown,
    ]));
    lines.push(Line::from(""));

    if let Some(op) = state.busy {
        lines.push(Line::from(Span::styled(
            format!("{} in progress…", op.verb()),
            Style::default().fg(Color::Yellow),
        )));
    } else if !state.is_connected() {
        lines.push(Line::from(Span::styled(
            "Desktop Agent Required",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        for step in setup_steps() {
            push_wrapped_status_kv(&mut lines, "-", step, area.width);
        }
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Operations"));
    f.render_widget(p, area);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Results ({})", state.records.len()));

    let Some(selected) = state.selected_record() else {
        let mut lines = vec![Line::from(Span::styled(
            "No memories retrieved yet",
            Style::default().fg(Color::Gray),
        ))];
        if !state.is_connected() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Desktop Agent Required",
                Style::default().fg(Color::Red),
            )));
        }
        f.render_widget(Paragraph::new(lines).block(block), area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let list_height = (state.records.len() as u16).min(inner.height / 3).max(1);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(list_height), Constraint::Min(0)].as_ref())
        .split(inner);

    // Keep the selection visible when the list is taller than its slot.
    let visible = list_height as usize;
    let start = state.selected.saturating_sub(visible.saturating_sub(1));
    let items: Vec<Line> = state
        .records
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, r)| {
            let style = if i == state.selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!("[{}] {}", r.timestamp, r.query), style))
        })
        .collect();
    f.render_widget(Paragraph::new(items), rows[0]);

    let mut body = vec![
        Line::from(Span::styled(
            format!("Query: {}", selected.query),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            if state.last_copied.as_deref() == Some(selected.id.as_str()) {
                format!("id {} (copied)", selected.id)
            } else {
                format!("id {}", selected.id)
            },
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    body.extend(selected.response.lines().map(|l| Line::from(l.to_string())));
    let response = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(response, rows[1]);
}

fn draw_notice(area: Rect, f: &mut ratatui::Frame, notice: &crate::notice::Notice, pending: usize) {
    let color = match notice.kind {
        NoticeKind::Success => Color::Green,
        NoticeKind::ApplicationError => Color::Yellow,
        NoticeKind::ConnectionError => Color::Red,
    };

    let width = area.width.saturating_sub(4).min(70);
    let height = (notice.body.lines().count() as u16 + 5).min(area.height);
    let rect = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let mut lines: Vec<Line> = notice
        .body
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    lines.push(Line::from(""));
    let hint = if pending > 1 {
        format!("Esc/Enter to dismiss ({} more)", pending - 1)
    } else {
        "Esc/Enter to dismiss".to_string()
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));

    f.render_widget(Clear, rect);
    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(notice.title.clone()),
    );
    f.render_widget(p, rect);
}
