// Load and download workflows run off the UI thread.
// - `spawn_load` fetches metadata and reports one `LoadEvent`.
// - `prepare_run` validates the form state on the UI thread and freezes it
//   into a `RunRequest`.
// - `spawn_run` downloads video then audio, merges or converts, removes the
//   intermediate files and reports `RunEvent`s as it goes.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread,
};

use crate::{
    catalog::{Catalog, Selection, StreamVariant, VideoHandle, best_audio},
    error::{Error, RunFailure, Stage},
    media::{Conversion, MediaTool, converted_output_path, merged_output_path},
    platform::VideoSource,
    progress::{DownloadMode, Phase, ProgressTracker},
};

pub const VIDEO_PREFIX: &str = "video_";
pub const AUDIO_PREFIX: &str = "audio_";

#[derive(Debug)]
pub enum LoadEvent {
    Loaded(VideoHandle),
    Failed(RunFailure),
}

#[derive(Debug)]
pub enum RunEvent {
    Progress(u8),
    Status(String),
    Log(String),
    Finished(Result<RunOutcome, RunFailure>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub output: PathBuf,
    pub message: &'static str,
}

/// Everything a worker needs, copied out of the UI state.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub handle: VideoHandle,
    pub mode: DownloadMode,
    pub video_stream: Option<StreamVariant>,
    pub audio_stream: StreamVariant,
    pub dest_dir: PathBuf,
    pub conversion: Option<Conversion>,
}

pub fn spawn_load(source: Arc<dyn VideoSource>, url: String) -> Receiver<LoadEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        log::info!("loading metadata for {url}");
        let event = match source.fetch_video(&url) {
            Ok(handle) => {
                log::info!("loaded \"{}\" with {} streams", handle.title, handle.streams.len());
                LoadEvent::Loaded(handle)
            }
            Err(err) => {
                log::warn!("metadata load failed for {url}: {err}");
                LoadEvent::Failed(RunFailure::new(Stage::Load, err))
            }
        };
        let _ = tx.send(event);
    });

    rx
}

pub fn prepare_run(
    handle: Option<&VideoHandle>,
    catalog: &Catalog,
    selection: Option<Selection>,
    mode: DownloadMode,
    dest_dir: &Path,
    conversion: Option<Conversion>,
) -> Result<RunRequest, RunFailure> {
    let fail = |error| RunFailure::new(Stage::Prepare, error);

    let handle =
        handle.ok_or_else(|| fail(Error::Input("Please load a video first.".to_string())))?;

    if dest_dir.as_os_str().is_empty() {
        return Err(fail(Error::Input(
            "Please choose a destination folder.".to_string(),
        )));
    }
    if !dest_dir.is_dir() {
        log::info!("creating destination {}", dest_dir.display());
        fs::create_dir_all(dest_dir)
            .map_err(|err| fail(Error::filesystem("failed to create", dest_dir, err)))?;
    }

    let video_stream = match mode {
        DownloadMode::Combined => {
            let selection = selection
                .ok_or_else(|| fail(Error::Input("Please select a quality.".to_string())))?;
            Some(catalog.resolve_selection(&selection).map_err(fail)?.clone())
        }
        DownloadMode::AudioOnly => None,
    };
    let audio_stream = best_audio(handle).map_err(fail)?.clone();

    Ok(RunRequest {
        handle: handle.clone(),
        mode,
        video_stream,
        audio_stream,
        dest_dir: dest_dir.to_path_buf(),
        conversion: match mode {
            DownloadMode::Combined => None,
            DownloadMode::AudioOnly => conversion,
        },
    })
}

pub fn spawn_run(
    request: RunRequest,
    source: Arc<dyn VideoSource>,
    tool: Arc<dyn MediaTool>,
) -> Receiver<RunEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let result = run_download(&request, source.as_ref(), tool.as_ref(), &tx);
        match &result {
            Ok(outcome) => log::info!("run finished: {}", outcome.output.display()),
            Err(failure) => log::warn!("run failed: {failure}"),
        }
        let _ = tx.send(RunEvent::Finished(result));
    });

    rx
}

/// Blocking body of one run. Events are sent as they happen; the terminal
/// result is returned to the caller instead of being sent.
pub fn run_download(
    request: &RunRequest,
    source: &dyn VideoSource,
    tool: &dyn MediaTool,
    events: &Sender<RunEvent>,
) -> Result<RunOutcome, RunFailure> {
    let mut tracker = ProgressTracker::new(request.mode);

    let outcome = match &request.video_stream {
        Some(video_stream) => {
            let video_path = download_phase(
                request,
                source,
                video_stream,
                VIDEO_PREFIX,
                Phase::Video,
                &mut tracker,
                events,
            )?;
            let audio_path = download_phase(
                request,
                source,
                &request.audio_stream,
                AUDIO_PREFIX,
                Phase::Audio,
                &mut tracker,
                events,
            )?;

            let output = merged_output_path(&request.dest_dir, &request.handle.title);
            status(events, "Merging video and audio...");
            log_line(events, tool.describe_merge(&video_path, &audio_path, &output));
            tool.merge(&video_path, &audio_path, &output)
                .map_err(|err| RunFailure::new(Stage::Merge, err))?;

            remove_intermediate(&video_path, events)?;
            remove_intermediate(&audio_path, events)?;

            RunOutcome {
                output,
                message: "Download and merge complete!",
            }
        }
        None => {
            let audio_path = download_phase(
                request,
                source,
                &request.audio_stream,
                AUDIO_PREFIX,
                Phase::Audio,
                &mut tracker,
                events,
            )?;

            let output = match request.conversion {
                Some(conversion) => {
                    let output = converted_output_path(
                        &request.dest_dir,
                        &request.handle.title,
                        conversion.format,
                    );
                    status(
                        events,
                        format!("Converting audio to {}...", conversion.format.label()),
                    );
                    log_line(
                        events,
                        tool.describe_transcode(&audio_path, &output, conversion.bitrate),
                    );
                    tool.transcode(&audio_path, &output, conversion.bitrate)
                        .map_err(|err| RunFailure::new(Stage::Convert, err))?;

                    remove_intermediate(&audio_path, events)?;
                    output
                }
                None => audio_path,
            };

            RunOutcome {
                output,
                message: "Download complete!",
            }
        }
    };

    if let Some(percent) = tracker.complete() {
        let _ = events.send(RunEvent::Progress(percent));
    }
    log_line(events, format!("saved {}", outcome.output.display()));
    status(events, outcome.message);

    Ok(outcome)
}

fn download_phase(
    request: &RunRequest,
    source: &dyn VideoSource,
    stream: &StreamVariant,
    prefix: &str,
    phase: Phase,
    tracker: &mut ProgressTracker,
    events: &Sender<RunEvent>,
) -> Result<PathBuf, RunFailure> {
    tracker.enter_phase(phase);
    status(events, format!("Downloading {} stream...", stream.kind));
    log_line(
        events,
        format!(
            "downloading {} format {} ({})",
            stream.kind,
            stream.format_id,
            stream.resolution.as_deref().unwrap_or(&stream.container)
        ),
    );

    let path = source
        .download(&request.handle, stream, &request.dest_dir, prefix, &mut |progress| {
            let observed =
                tracker.observe_remaining(progress.total_bytes, progress.bytes_remaining);
            if let Some(percent) = observed {
                let _ = events.send(RunEvent::Progress(percent));
            }
        })
        .map_err(|err| RunFailure::new(Stage::Download, err))?;

    log_line(
        events,
        format!("downloaded {} ({}% overall)", path.display(), tracker.last_reported()),
    );
    Ok(path)
}

fn remove_intermediate(path: &Path, events: &Sender<RunEvent>) -> Result<(), RunFailure> {
    fs::remove_file(path).map_err(|err| {
        RunFailure::new(Stage::Cleanup, Error::filesystem("failed to remove", path, err))
    })?;
    log_line(events, format!("removed {}", path.display()));
    Ok(())
}

fn status(events: &Sender<RunEvent>, message: impl Into<String>) {
    let _ = events.send(RunEvent::Status(message.into()));
}

fn log_line(events: &Sender<RunEvent>, line: String) {
    log::info!("{line}");
    let _ = events.send(RunEvent::Log(line));
}
