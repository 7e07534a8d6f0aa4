// Download form rendering.
// - Shows the URL/folder inputs and the mode, quality, and conversion selectors.
// - Greys out options that do not apply to the current mode.
// - Warns up front when yt-dlp or ffmpeg did not answer the startup probe.
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{app::App, model::InputField, progress::DownloadMode};

use super::{pane_border_style, truncate_middle_with_ellipsis};

const LABEL_COL_WIDTH: usize = 9;

pub fn render_form(frame: &mut Frame, app: &App, focused: bool, area: Rect) {
    let value_width = (area.width as usize).saturating_sub(LABEL_COL_WIDTH + 6);
    let active = |field: InputField| focused && app.active_input == field;

    let mut lines = Vec::new();

    if !app.source_available() {
        lines.push(warning("yt-dlp was not found. Loading and downloading are disabled."));
    }
    if !app.tool_available() {
        lines.push(warning("ffmpeg was not found. Merging and conversion are disabled."));
    }
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }

    lines.push(input_line(
        InputField::Url.label(),
        &app.url,
        active(InputField::Url).then_some(app.url_cursor),
    ));
    lines.push(input_line(
        InputField::Destination.label(),
        &app.destination,
        active(InputField::Destination).then_some(app.destination_cursor),
    ));
    lines.push(row(
        "Video",
        app.loaded_title()
            .map(|title| truncate_middle_with_ellipsis(title, value_width))
            .unwrap_or_else(|| "(not loaded)".to_string()),
    ));
    lines.push(Line::from(""));

    lines.push(selector_line(
        InputField::Mode.label(),
        app.mode.label(),
        active(InputField::Mode),
        true,
    ));

    let quality = match app.mode {
        DownloadMode::AudioOnly => "best audio stream".to_string(),
        DownloadMode::Combined => app
            .selected_quality_label()
            .map(|label| format!("{label}  ({} options)", app.catalog().len()))
            .unwrap_or_else(|| "load a video first".to_string()),
    };
    lines.push(selector_line(
        InputField::Quality.label(),
        &quality,
        active(InputField::Quality),
        app.mode == DownloadMode::Combined && !app.catalog().is_empty(),
    ));

    let conversion_enabled = app.conversion_enabled();
    lines.push(selector_line(
        InputField::AudioFormat.label(),
        app.audio_format.map(|format| format.label()).unwrap_or("None"),
        active(InputField::AudioFormat),
        conversion_enabled,
    ));
    lines.push(selector_line(
        InputField::Bitrate.label(),
        app.bitrate.label(),
        active(InputField::Bitrate),
        conversion_enabled && app.audio_format.is_some(),
    ));

    lines.push(Line::from(""));
    lines.push(hint(
        "Enter on URL loads the video. Ctrl+s starts the download. Ctrl+e opens the folder.",
    ));

    let title = if app.is_busy() {
        format!("Tubesaver {} {}", app.spinner_glyph(), app.run_state_label())
    } else {
        "Tubesaver".to_string()
    };

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(pane_border_style(focused, Color::LightYellow))
                .title_top(Line::from(title).left_aligned())
                .title_top(
                    Line::styled("(tab / shift+tab)", Style::default().fg(Color::DarkGray))
                        .right_aligned(),
                ),
        )
        .alignment(Alignment::Left);

    frame.render_widget(panel, area);
}

fn label_cell(label: &str, active: bool) -> Span<'static> {
    let cell = format!("{label:<LABEL_COL_WIDTH$}");
    if active {
        Span::styled(
            cell,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            cell,
            Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        )
    }
}

fn warning(message: &str) -> Line<'static> {
    Line::styled(
        message.to_string(),
        Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
    )
}

fn hint(message: &str) -> Line<'static> {
    Line::styled(message.to_string(), Style::default().fg(Color::DarkGray))
}

fn row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label:<LABEL_COL_WIDTH$}"),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(value),
    ])
}

fn selector_line(label: &str, value: &str, active: bool, enabled: bool) -> Line<'static> {
    let value_style = if !enabled {
        Style::default().fg(Color::DarkGray)
    } else if active {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    Line::from(vec![
        label_cell(label, active),
        Span::raw("  "),
        Span::styled(format!("< {value} >"), value_style),
    ])
}

fn input_line(label: &str, value: &str, active_cursor: Option<usize>) -> Line<'static> {
    let active = active_cursor.is_some();
    let mut spans = vec![label_cell(label, active), Span::raw("  ")];

    let chars = value.chars().collect::<Vec<_>>();
    let cursor = active_cursor.unwrap_or(0).min(chars.len());
    let value_style = if active {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor_style = Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD);

    for (index, ch) in chars.iter().enumerate() {
        let style = if active && index == cursor {
            cursor_style
        } else {
            value_style
        };
        spans.push(Span::styled(ch.to_string(), style));
    }

    if active && cursor == chars.len() {
        spans.push(Span::styled(" ".to_string(), cursor_style));
    }

    Line::from(spans)
}
