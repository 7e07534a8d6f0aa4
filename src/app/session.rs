// Load and download actions driven from the form.
// - Starts the metadata load and the download run on worker threads.
// - Applies worker events to the progress bar, status line, and activity log.
// - Schedules the progress reset after a successful run.
use std::{
    sync::{Arc, mpsc::TryRecvError},
    time::Instant,
};

use crate::{
    error::{Error, RunFailure, Stage},
    media::{self, Conversion},
    progress::DownloadMode,
    workflow::{LoadEvent, RunEvent, RunOutcome, prepare_run, spawn_load, spawn_run},
};

use super::{App, RunState};

const BUSY_MESSAGE: &str = "Another operation is still running. Wait for it to finish.";

impl App {
    pub fn start_load(&mut self) {
        if self.is_busy() {
            self.status_message = BUSY_MESSAGE.to_string();
            return;
        }
        if !self.services.source_available {
            self.status_message = "yt-dlp was not found. Install it or pass --yt-dlp.".to_string();
            return;
        }

        let url = self.url.trim().to_string();
        if url.is_empty() {
            let error = Error::Input("Please enter a URL.".to_string());
            self.refuse(RunFailure::new(Stage::Prepare, error));
            return;
        }

        self.handle = None;
        self.rebuild_catalog();
        self.reset_deadline = None;
        self.progress = 0;
        self.status_message = "Loading video...".to_string();
        self.activity.begin_section(&format!("load {url}"));

        let rx = spawn_load(Arc::clone(&self.services.source), url);
        self.run_state = RunState::Loading(rx);
    }

    pub fn start_download(&mut self) {
        if self.is_busy() {
            self.status_message = BUSY_MESSAGE.to_string();
            return;
        }
        if !self.services.source_available {
            self.status_message = "yt-dlp was not found. Install it or pass --yt-dlp.".to_string();
            return;
        }

        let conversion = self.audio_format.map(|format| Conversion {
            format,
            bitrate: self.bitrate,
        });
        let needs_ffmpeg = self.mode == DownloadMode::Combined || conversion.is_some();
        if needs_ffmpeg && !self.services.tool_available {
            self.status_message = "ffmpeg was not found. Install it or pass --ffmpeg.".to_string();
            return;
        }

        let request = match prepare_run(
            self.handle.as_ref(),
            &self.catalog,
            self.selection,
            self.mode,
            &self.destination_path(),
            conversion,
        ) {
            Ok(request) => request,
            Err(failure) => {
                self.refuse(failure);
                return;
            }
        };

        self.reset_deadline = None;
        self.progress = 0;
        self.status_message = "Starting download...".to_string();
        self.activity.begin_section(&format!(
            "download \"{}\" ({}) -> {}",
            request.handle.title,
            request.mode.label(),
            request.dest_dir.display()
        ));

        let rx = spawn_run(
            request,
            Arc::clone(&self.services.source),
            Arc::clone(&self.services.tool),
        );
        self.run_state = RunState::Downloading(rx);
    }

    pub fn open_destination(&mut self) {
        let path = self.destination_path();
        match media::reveal_folder(&path) {
            Ok(()) => {
                self.status_message = format!("Opened {}", path.display());
            }
            Err(err) => {
                log::warn!("could not open {}: {err}", path.display());
                self.status_message = format!("Could not open folder: {err}");
            }
        }
    }

    fn refuse(&mut self, failure: RunFailure) {
        log::warn!("refused: {failure}");
        self.status_message = failure_message(&failure);
        self.activity.push_error(&failure.to_string());
    }

    pub(super) fn pump_load_events(&mut self) {
        let received = match &self.run_state {
            RunState::Loading(rx) => rx.try_recv(),
            _ => return,
        };

        match received {
            Ok(LoadEvent::Loaded(handle)) => {
                self.run_state = RunState::Idle;
                let kind = match self.mode {
                    DownloadMode::Combined => "video",
                    DownloadMode::AudioOnly => "audio",
                };
                self.status_message = format!("Loaded {kind}: {}", handle.title);
                self.activity.push(format!(
                    "loaded \"{}\" ({} streams)",
                    handle.title,
                    handle.streams.len()
                ));
                self.handle = Some(handle);
                self.rebuild_catalog();

                if self.mode == DownloadMode::Combined {
                    if self.catalog.is_empty() {
                        self.activity.push_error("no mp4 video streams for this video");
                    }
                    for label in self.catalog.labels() {
                        self.activity.push(format!("  {label}"));
                    }
                }
            }
            Ok(LoadEvent::Failed(failure)) => {
                self.run_state = RunState::Idle;
                self.status_message = "Failed to load video.".to_string();
                self.activity.push_error(&failure.error.to_string());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.run_state = RunState::Idle;
                self.status_message = "Failed to load video.".to_string();
                self.activity.push_error("metadata worker stopped unexpectedly");
            }
        }
    }

    pub(super) fn pump_run_events(&mut self, now: Instant) {
        loop {
            let received = match &self.run_state {
                RunState::Downloading(rx) => rx.try_recv(),
                _ => return,
            };

            match received {
                Ok(RunEvent::Progress(percent)) => {
                    self.progress = percent;
                    self.status_message = format!("Progress: {percent}%");
                }
                Ok(RunEvent::Status(message)) => {
                    self.status_message = message;
                }
                Ok(RunEvent::Log(line)) => self.activity.push(line),
                Ok(RunEvent::Finished(result)) => {
                    self.run_state = RunState::Idle;
                    self.finish_run(result, now);
                    return;
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.run_state = RunState::Idle;
                    self.status_message = "Download worker stopped unexpectedly.".to_string();
                    self.activity.push_error("download worker stopped unexpectedly");
                    return;
                }
            }
        }
    }

    fn finish_run(&mut self, result: Result<RunOutcome, RunFailure>, now: Instant) {
        match result {
            Ok(outcome) => {
                self.progress = 100;
                self.status_message = outcome.message.to_string();
                self.activity.push(outcome.message);
                self.reset_deadline = Some(now + self.reset_delay);
            }
            Err(failure) => {
                // Progress keeps its last value.
                self.status_message = failure_message(&failure);
                self.activity.push_error(&failure.to_string());
                if matches!(failure.stage, Stage::Merge | Stage::Convert) {
                    self.activity
                        .push("downloaded files were kept in the destination folder");
                }
            }
        }
    }
}

fn failure_message(failure: &RunFailure) -> String {
    match failure.stage {
        Stage::Prepare => failure.error.to_string(),
        _ => format!("Error: {failure}"),
    }
}
