use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn keybind(key: &str, pad: usize, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("{}{what}", " ".repeat(pad))),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, base_url: &str, log_path: Option<&str>) {
    let mut lines = vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        keybind("s", 11, "Save current page to memory"),
        keybind("/", 11, "Type a search query (Enter to search, Esc to leave)"),
        keybind("↑/↓", 9, "Browse retrieved memories"),
        keybind("y", 11, "Copy selected answer to clipboard"),
        keybind("tab", 9, "Switch tabs"),
        keybind("?", 11, "Show this help"),
        keybind("Esc", 9, "Dismiss a notice"),
        Line::from(""),
        Line::from("Save and search stay disabled until the desktop agent answers its"),
        Line::from("status check, and only one operation runs at a time."),
        Line::from(""),
        Line::from("Agent:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(base_url.to_string(), Style::default().fg(Color::Cyan)),
        ]),
    ];
    if let Some(path) = log_path {
        lines.push(Line::from(""));
        lines.push(Line::from("Log file:"));
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(path.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
