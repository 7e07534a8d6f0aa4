// Scrollable activity-log panel.
// - Renders title, content lines, and scroll offset in a consistent style.
// - Colors section headers and error lines so failures stand out.
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::pane_border_style;

pub struct LogPanelView<'a> {
    pub title: &'a str,
    pub lines: &'a [String],
    pub focused: bool,
    pub accent_color: Color,
}

/// `scroll` is the first visible line, already clamped to the viewport.
pub fn render_log_panel(frame: &mut Frame, area: Rect, panel: LogPanelView<'_>, scroll: usize) {
    let lines = panel
        .lines
        .iter()
        .map(|line| styled_line(line))
        .collect::<Vec<_>>();

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(pane_border_style(panel.focused, panel.accent_color))
                .title(panel.title),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));

    frame.render_widget(widget, area);
}

fn styled_line(line: &str) -> Line<'_> {
    if line.starts_with("error: ") {
        Line::styled(line, Style::default().fg(Color::LightRed))
    } else if line.starts_with("== ") {
        Line::styled(
            line,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Line::from(line)
    }
}
