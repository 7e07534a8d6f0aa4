// Root UI composition and shared visual components.
// - Stacks the download form, progress bar + status line, and activity log.
// - Renders shared chrome: footer hint and the keybinds popup.
// - Holds width-aware truncation helpers used by the panels.
mod form;
mod output_panel;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{app::App, model::Focus};

use self::output_panel::{LogPanelView, render_log_panel};

const FORM_HEIGHT: u16 = 16;
const PROGRESS_HEIGHT: u16 = 4;

pub fn render(frame: &mut Frame, app: &App, focus: Focus) {
    let [form_area, progress_area, log_area, footer] = Layout::vertical([
        Constraint::Length(FORM_HEIGHT),
        Constraint::Length(PROGRESS_HEIGHT),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    form::render_form(frame, app, focus == Focus::Form, form_area);
    render_progress(frame, app, progress_area);
    render_activity(frame, app, focus, log_area);
    render_footer_hint(frame, footer);

    if app.show_keybinds {
        render_keybinds_popup(frame, app);
    }
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title("Progress");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [gauge_area, status_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::LightGreen).bg(Color::Black))
        .percent(u16::from(app.progress.min(100)))
        .label(format!("{}%", app.progress));
    frame.render_widget(gauge, gauge_area);

    let status_style = if app.status_message.starts_with("Error") {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default().fg(Color::White)
    };
    let status = truncate_middle_with_ellipsis(&app.status_message, status_area.width as usize);
    frame.render_widget(Paragraph::new(Line::styled(status, status_style)), status_area);
}

fn render_activity(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    // Borders take one row at the top and one at the bottom.
    let visible_rows = area.height.saturating_sub(2) as usize;
    let scroll = app.activity.clamped_scroll_for_viewport(visible_rows);
    let title = format!("Activity (scroll: {scroll})");

    render_log_panel(
        frame,
        area,
        LogPanelView {
            title: &title,
            lines: app.activity_lines(),
            focused: focus == Focus::Log,
            accent_color: Color::LightBlue,
        },
        scroll,
    );
}

fn render_keybinds_popup(frame: &mut Frame, app: &App) {
    let outer = frame.area();
    let [vertical] = Layout::vertical([Constraint::Percentage(70)])
        .flex(Flex::Center)
        .areas(outer);
    let [popup] = Layout::horizontal([Constraint::Percentage(70)])
        .flex(Flex::Center)
        .areas(vertical);

    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::from("Press F1 or Esc to close this window."),
        Line::from(""),
        keybind_section("GLOBAL"),
        keybind_row("F1 / ?", "toggle keybinds popup (? outside text fields)"),
        keybind_row("Ctrl+c / Ctrl+q", "quit app"),
        keybind_row("Ctrl+o", "switch focus between form and activity log"),
        keybind_row("Ctrl+l", "load video from the URL field"),
        keybind_row("Ctrl+s", "start download"),
        keybind_row("Ctrl+e", "open destination folder"),
        Line::from(""),
        keybind_section("FORM"),
        keybind_row("Tab / Shift+Tab", "next / previous field"),
        keybind_row("Enter", "load (URL field) or start download"),
        keybind_row("Left/Right", "move cursor or change selection"),
        keybind_row("Space", "change selection"),
        keybind_row("Home/End", "jump to start / end of field"),
        keybind_row("Backspace", "delete character"),
        keybind_row("Ctrl+u", "clear field"),
        Line::from(""),
        keybind_section("ACTIVITY LOG"),
        keybind_row("j/k or Up/Down", "scroll log"),
        keybind_row("PgUp/PgDn", "page up / page down"),
        keybind_row("Esc", "back to form"),
    ];

    let block = Block::default().borders(Borders::ALL).title("Keybinds");
    let inner = block.inner(popup);
    let visible_line_count = inner.height.max(1) as usize;
    let max_scroll_top = lines.len().saturating_sub(visible_line_count);
    let scroll_top = app.clamp_keybinds_scroll(max_scroll_top);
    let popup_widget = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Left)
        .scroll((scroll_top.min(u16::MAX as usize) as u16, 0));

    frame.render_widget(popup_widget, popup);
}

fn keybind_section(title: &str) -> Line<'static> {
    Line::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn keybind_row(keys: &str, action: &str) -> Line<'static> {
    const KEY_COL_WIDTH: usize = 18;
    let keys_padded = format!("{keys:<KEY_COL_WIDTH$}");
    Line::from(vec![
        Span::styled(
            keys_padded,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(action.to_string()),
    ])
}

fn render_footer_hint(frame: &mut Frame, area: Rect) {
    let hint = Paragraph::new(Line::styled(
        "Press F1 to see keyboard shortcuts",
        Style::default().fg(Color::DarkGray),
    ))
    .alignment(Alignment::Left);
    frame.render_widget(hint, area);
}

pub(super) fn pane_border_style(is_focused: bool, focused_color: Color) -> Style {
    if is_focused {
        Style::default()
            .fg(focused_color)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn truncate_middle_with_ellipsis(value: &str, max_width: usize) -> String {
    let width = display_width(value);
    if width <= max_width {
        return value.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let keep_total = max_width.saturating_sub(3);
    let keep_left = keep_total / 2;
    let keep_right = keep_total.saturating_sub(keep_left);
    let left = truncate_to_width(value, keep_left);
    let right = take_suffix_width(value, keep_right);

    truncate_to_width(&format!("{left}...{right}"), max_width)
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn truncate_to_width(value: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let mut result = String::new();
    let mut width = 0;
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > 0 && width + ch_width > max_width {
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

fn take_suffix_width(value: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let mut suffix = Vec::new();
    let mut width = 0;
    for ch in value.chars().rev() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > 0 && width + ch_width > max_width {
            break;
        }
        suffix.push(ch);
        width += ch_width;
    }
    suffix.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::{
        app::tests::{app_with, settle},
        workflow::tests::{FakeSource, FakeTool},
    };

    #[test]
    fn short_values_are_untouched() {
        assert_eq!(truncate_middle_with_ellipsis("Sample", 10), "Sample");
    }

    #[test]
    fn long_values_keep_both_ends() {
        assert_eq!(
            truncate_middle_with_ellipsis("Rick Astley - Never Gonna Give You Up", 15),
            "Rick A...You Up"
        );
        assert_eq!(truncate_middle_with_ellipsis("abcdef", 2), "..");
    }

    #[test]
    fn wide_characters_count_double() {
        assert_eq!(display_width("日本"), 4);
        assert_eq!(truncate_to_width("日本語", 5), "日本");
        assert_eq!(take_suffix_width("日本語", 3), "語");
    }

    #[test]
    fn renders_loaded_form_and_activity() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), FakeSource::default(), FakeTool::default());
        app.start_load();
        settle(&mut app);

        let mut terminal = Terminal::new(TestBackend::new(100, 36)).unwrap();
        terminal
            .draw(|frame| render(frame, &app, Focus::Form))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(text.contains("1: 1080p - 60fps"));
        assert!(text.contains("Loaded video: Sample"));
        assert!(text.contains("loaded \"Sample\" (4 streams)"));
    }
}
