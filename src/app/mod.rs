// Central application state shared by the app submodules.
// - Stores the download form (URL, folder, mode, quality, conversion).
// - Holds the loaded video and its quality catalog between load and download.
// - Tracks the single running operation and the progress/status display.
mod activity_log;
mod input;
mod session;

use std::{
    cell::Cell,
    path::PathBuf,
    sync::{Arc, mpsc::Receiver},
    time::{Duration, Instant},
};

use crate::{
    catalog::{Catalog, Selection, VideoHandle},
    config::Config,
    media::{AudioBitrate, AudioFormat, MediaTool},
    model::InputField,
    platform::VideoSource,
    progress::DownloadMode,
    workflow::{LoadEvent, RunEvent},
};

use self::activity_log::ActivityLog;

/// External tools the app drives, plus whether they answered the startup probe.
pub struct Services {
    pub source: Arc<dyn VideoSource>,
    pub tool: Arc<dyn MediaTool>,
    pub source_available: bool,
    pub tool_available: bool,
}

/// At most one load or download runs at a time.
enum RunState {
    Idle,
    Loading(Receiver<LoadEvent>),
    Downloading(Receiver<RunEvent>),
}

pub struct App {
    pub(crate) url: String,
    pub(crate) url_cursor: usize,
    pub(crate) destination: String,
    pub(crate) destination_cursor: usize,
    pub(crate) mode: DownloadMode,
    pub(crate) audio_format: Option<AudioFormat>,
    pub(crate) bitrate: AudioBitrate,
    pub(crate) active_input: InputField,
    handle: Option<VideoHandle>,
    catalog: Catalog,
    selection: Option<Selection>,
    pub(crate) progress: u8,
    pub(crate) status_message: String,
    pub(crate) activity: ActivityLog,
    pub(crate) show_keybinds: bool,
    keybinds_scroll: Cell<usize>,
    spinner_frame: usize,
    run_state: RunState,
    reset_delay: Duration,
    reset_deadline: Option<Instant>,
    services: Services,
}

impl App {
    pub fn new(config: &Config, services: Services) -> Self {
        let url = config.initial_url.clone().unwrap_or_default();
        let destination = config.destination.display().to_string();

        let mut activity = ActivityLog::empty();
        activity.push(format!("yt-dlp: {}", services.source_status()));
        activity.push(format!("ffmpeg: {}", services.tool_status()));

        Self {
            url_cursor: url.chars().count(),
            url,
            destination_cursor: destination.chars().count(),
            destination,
            mode: config.default_mode,
            audio_format: None,
            bitrate: AudioBitrate::Default,
            active_input: InputField::Url,
            handle: None,
            catalog: Catalog::empty(),
            selection: None,
            progress: 0,
            status_message: "Paste a video URL and press Enter to load it.".to_string(),
            activity,
            show_keybinds: false,
            keybinds_scroll: Cell::new(0),
            spinner_frame: 0,
            run_state: RunState::Idle,
            reset_delay: config.reset_delay,
            reset_deadline: None,
            services,
        }
    }

    pub fn toggle_keybinds(&mut self) {
        self.show_keybinds = !self.show_keybinds;
        self.keybinds_scroll.set(0);
    }

    pub fn hide_keybinds(&mut self) {
        self.show_keybinds = false;
    }

    pub fn scroll_keybinds(&mut self, delta: isize) {
        let current = self.keybinds_scroll.get();
        self.keybinds_scroll
            .set(current.saturating_add_signed(delta));
    }

    pub fn clamp_keybinds_scroll(&self, max_scroll_top: usize) -> usize {
        let clamped = self.keybinds_scroll.get().min(max_scroll_top);
        self.keybinds_scroll.set(clamped);
        clamped
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Drains worker events and fires the delayed progress reset. `now` is a
    /// parameter so the reset can be driven without sleeping.
    pub fn tick_at(&mut self, now: Instant) {
        if self.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % spinner_frames().len();
        }

        self.pump_load_events();
        self.pump_run_events(now);

        if let Some(deadline) = self.reset_deadline
            && now >= deadline
        {
            self.reset_deadline = None;
            self.progress = 0;
            self.status_message.clear();
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.run_state, RunState::Idle)
    }

    pub fn run_state_label(&self) -> &'static str {
        match self.run_state {
            RunState::Idle => "idle",
            RunState::Loading(_) => "loading",
            RunState::Downloading(_) => "downloading",
        }
    }

    pub fn spinner_glyph(&self) -> char {
        spinner_frames()[self.spinner_frame % spinner_frames().len()]
    }

    pub fn loaded_title(&self) -> Option<&str> {
        self.handle.as_ref().map(|handle| handle.title.as_str())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_quality_label(&self) -> Option<&str> {
        let selection = self.selection?;
        self.catalog
            .entries()
            .iter()
            .find(|entry| entry.index == selection.index())
            .map(|entry| entry.label.as_str())
    }

    pub fn source_available(&self) -> bool {
        self.services.source_available
    }

    pub fn tool_available(&self) -> bool {
        self.services.tool_available
    }

    /// Conversion options only apply to audio-only downloads.
    pub fn conversion_enabled(&self) -> bool {
        self.mode == DownloadMode::AudioOnly
    }

    pub fn destination_path(&self) -> PathBuf {
        PathBuf::from(self.destination.trim())
    }

    pub fn activity_lines(&self) -> &[String] {
        self.activity.lines()
    }

    pub fn scroll_activity_down(&mut self) {
        self.activity.scroll_down();
    }

    pub fn scroll_activity_up(&mut self) {
        self.activity.scroll_up();
    }

    pub fn page_activity_down(&mut self) {
        self.activity.page_down();
    }

    pub fn page_activity_up(&mut self) {
        self.activity.page_up();
    }
}

impl Services {
    fn source_status(&self) -> &'static str {
        if self.source_available { "ready" } else { "not found" }
    }

    fn tool_status(&self) -> &'static str {
        if self.tool_available { "ready" } else { "not found" }
    }
}

fn spinner_frames() -> &'static [char] {
    &['|', '/', '-', '\\']
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{path::Path, thread};

    use super::*;
    use crate::workflow::tests::{FakeSource, FakeTool};

    pub(crate) fn config(dest: &Path) -> Config {
        Config {
            destination: dest.to_path_buf(),
            ffmpeg: PathBuf::from("ffmpeg"),
            yt_dlp: PathBuf::from("yt-dlp"),
            reset_delay: Duration::from_millis(3000),
            log_file: dest.join("tubesaver.log"),
            default_mode: DownloadMode::Combined,
            initial_url: Some("https://youtu.be/abc123".to_string()),
        }
    }

    pub(crate) fn app_with(dest: &Path, source: FakeSource, tool: FakeTool) -> App {
        App::new(
            &config(dest),
            Services {
                source: Arc::new(source),
                tool: Arc::new(tool),
                source_available: true,
                tool_available: true,
            },
        )
    }

    /// Ticks until the running operation reports back.
    pub(crate) fn settle(app: &mut App) {
        let give_up = Instant::now() + Duration::from_secs(5);
        while app.is_busy() && Instant::now() < give_up {
            app.tick_at(Instant::now());
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!app.is_busy(), "worker did not finish");
    }

    #[test]
    fn new_app_prefills_form_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(dir.path(), FakeSource::default(), FakeTool::default());

        assert_eq!(app.url, "https://youtu.be/abc123");
        assert_eq!(app.url_cursor, app.url.chars().count());
        assert_eq!(app.destination_path(), dir.path());
        assert_eq!(app.run_state_label(), "idle");
        assert_eq!(app.activity_lines(), ["yt-dlp: ready", "ffmpeg: ready"]);
    }

    #[test]
    fn keybinds_scroll_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), FakeSource::default(), FakeTool::default());

        app.toggle_keybinds();
        app.scroll_keybinds(50);
        assert_eq!(app.clamp_keybinds_scroll(10), 10);
        app.scroll_keybinds(-20);
        assert_eq!(app.clamp_keybinds_scroll(10), 0);
    }
}
