// ffmpeg-facing helpers.
// - Builds the merge and audio-transcode argument lists.
// - Runs ffmpeg through the blocking tool runner and maps exit codes to errors.
// - Owns output naming (title sanitizing) and the "reveal folder" action.
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    error::{Error, Result},
    process,
};

/// Characters that are not allowed in the final output file name.
const FORBIDDEN_TITLE_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    /// Selector order; `None` in the selector means "keep the download as is".
    pub const CHOICES: [Option<Self>; 3] = [None, Some(Self::Mp3), Some(Self::Wav)];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Wav => "WAV",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBitrate {
    Default,
    K64,
    K128,
    K192,
    K320,
}

impl AudioBitrate {
    pub const ALL: [Self; 5] = [Self::Default, Self::K64, Self::K128, Self::K192, Self::K320];

    pub fn ffmpeg_value(self) -> &'static str {
        match self {
            Self::Default | Self::K128 => "128k",
            Self::K64 => "64k",
            Self::K192 => "192k",
            Self::K320 => "320k",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "Default",
            other => other.ffmpeg_value(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub format: AudioFormat,
    pub bitrate: AudioBitrate,
}

pub trait MediaTool: Send + Sync {
    /// Copies the video stream and re-encodes audio to AAC into `output`.
    fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Stereo 44.1 kHz audio at `bitrate`; container follows `output`'s extension.
    fn transcode(&self, input: &Path, output: &Path, bitrate: AudioBitrate) -> Result<()>;

    fn describe_merge(&self, video: &Path, audio: &Path, output: &Path) -> String;

    fn describe_transcode(&self, input: &Path, output: &Path, bitrate: AudioBitrate) -> String;
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    path: PathBuf,
}

impl Ffmpeg {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn run(&self, args: &[OsString]) -> Result<()> {
        let command_line = process::command_line(&self.path, args);
        log::info!("running {command_line}");

        let run = process::run_streaming(&self.path, args, |stream, line| {
            log::debug!("ffmpeg {}: {line}", stream.label());
        })
        .map_err(|err| Error::ExternalTool {
            tool: self.path.display().to_string(),
            code: None,
            detail: format!("failed to start: {err}"),
        })?;

        if run.status.success() {
            return Ok(());
        }

        let detail = process::summarize_stderr(&run.stderr, "unknown ffmpeg error");
        log::warn!("ffmpeg failed ({:?}): {detail}", run.status.code());
        Err(Error::ExternalTool {
            tool: "ffmpeg".to_string(),
            code: run.status.code(),
            detail,
        })
    }
}

impl MediaTool for Ffmpeg {
    fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.run(&merge_args(video, audio, output))
    }

    fn transcode(&self, input: &Path, output: &Path, bitrate: AudioBitrate) -> Result<()> {
        self.run(&transcode_args(input, output, bitrate))
    }

    fn describe_merge(&self, video: &Path, audio: &Path, output: &Path) -> String {
        process::command_line(&self.path, &merge_args(video, audio, output))
    }

    fn describe_transcode(&self, input: &Path, output: &Path, bitrate: AudioBitrate) -> String {
        process::command_line(&self.path, &transcode_args(input, output, bitrate))
    }
}

pub fn merge_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        video.into(),
        "-i".into(),
        audio.into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        output.into(),
    ]
}

pub fn transcode_args(input: &Path, output: &Path, bitrate: AudioBitrate) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.into(),
        "-vn".into(),
        "-ar".into(),
        "44100".into(),
        "-ac".into(),
        "2".into(),
        "-b:a".into(),
        bitrate.ffmpeg_value().into(),
        output.into(),
    ]
}

pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|ch| !FORBIDDEN_TITLE_CHARS.contains(ch))
        .collect()
}

pub fn merged_output_path(dest_dir: &Path, title: &str) -> PathBuf {
    dest_dir.join(format!("{}.mp4", sanitize_title(title)))
}

pub fn converted_output_path(dest_dir: &Path, title: &str, format: AudioFormat) -> PathBuf {
    dest_dir.join(format!("{}.{}", sanitize_title(title), format.extension()))
}

/// Checks once at startup whether `program` runs at all.
pub fn tool_available(program: &Path, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn reveal_folder(path: &Path) -> io::Result<()> {
    if !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("folder not found: {}", path.display()),
        ));
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        return Ok(());
    }

    #[cfg(target_os = "windows")]
    {
        Command::new("explorer")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        return Ok(());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        return Ok(());
    }

    #[allow(unreachable_code)]
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "opening folders is not supported on this platform",
    ))
}
