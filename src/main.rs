mod app;
mod catalog;
mod config;
mod error;
mod media;
mod model;
mod platform;
mod process;
mod progress;
mod ui;
mod workflow;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::{
    app::{App, Services},
    config::{Cli, Config},
    media::Ffmpeg,
    model::{Focus, InputField},
    platform::YtDlp,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    init_logging(&config.log_file);
    log::info!("starting with {config:?}");

    let services = Services {
        source_available: media::tool_available(&config.yt_dlp, "--version"),
        tool_available: media::tool_available(&config.ffmpeg, "-version"),
        source: Arc::new(YtDlp::new(&config.yt_dlp)),
        tool: Arc::new(Ffmpeg::new(&config.ffmpeg)),
    };
    if !services.source_available {
        log::warn!("{} did not run; loading is disabled", config.yt_dlp.display());
    }
    if !services.tool_available {
        log::warn!("{} did not run; merging is disabled", config.ffmpeg.display());
    }

    let mut app = App::new(&config, services);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();
    result?;
    Ok(())
}

/// Logs go to a file because the terminal belongs to the UI. Without a
/// writable log file logging stays off.
fn init_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}

fn run(terminal: &mut ratatui::DefaultTerminal, app: &mut App) -> std::io::Result<()> {
    let mut focus = Focus::Form;

    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app, focus))?;

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(app, &mut focus, key)
        {
            break Ok(());
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, focus: &mut Focus, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return true,
            KeyCode::Char('o') => *focus = focus.toggled(),
            KeyCode::Char('l') => app.start_load(),
            KeyCode::Char('s') => app.start_download(),
            KeyCode::Char('e') => app.open_destination(),
            KeyCode::Char('u') if *focus == Focus::Form => app.clear_active_input(),
            KeyCode::Char('u') => app.page_activity_up(),
            KeyCode::Char('d') if *focus == Focus::Log => app.page_activity_down(),
            _ => {}
        }
        return false;
    }

    if app.show_keybinds {
        match key.code {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') => app.hide_keybinds(),
            KeyCode::Down | KeyCode::Char('j') => app.scroll_keybinds(1),
            KeyCode::Up | KeyCode::Char('k') => app.scroll_keybinds(-1),
            KeyCode::PageDown => app.scroll_keybinds(12),
            KeyCode::PageUp => app.scroll_keybinds(-12),
            _ => {}
        }
        return false;
    }

    let typing_text = *focus == Focus::Form && app.active_input.is_text();
    match key.code {
        KeyCode::F(1) => app.toggle_keybinds(),
        KeyCode::Char('?') if !typing_text => app.toggle_keybinds(),
        KeyCode::Esc => *focus = Focus::Form,
        _ if *focus == Focus::Log => match key.code {
            KeyCode::Down | KeyCode::Char('j') => app.scroll_activity_down(),
            KeyCode::Up | KeyCode::Char('k') => app.scroll_activity_up(),
            KeyCode::PageDown => app.page_activity_down(),
            KeyCode::PageUp => app.page_activity_up(),
            KeyCode::Tab | KeyCode::BackTab => *focus = Focus::Form,
            _ => {}
        },
        KeyCode::Tab => app.next_input(),
        KeyCode::BackTab => app.previous_input(),
        KeyCode::Down => app.next_input(),
        KeyCode::Up => app.previous_input(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Backspace => app.backspace_active_input(),
        KeyCode::Enter if app.active_input == InputField::Url => app.start_load(),
        KeyCode::Enter => app.start_download(),
        KeyCode::Char(ch) => app.push_active_input_char(ch),
        _ => {}
    }

    false
}
