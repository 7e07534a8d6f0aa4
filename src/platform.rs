// Video platform access through yt-dlp.
// - `yt-dlp -J` gives the title and the format list for a URL.
// - Single formats are downloaded with a machine-readable progress template,
//   which is turned into "bytes remaining" callbacks.
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;

use crate::{
    catalog::{StreamKind, StreamVariant, VideoHandle},
    error::{Error, Result},
    media::sanitize_title,
    process::{self, ToolStream},
};

const PROGRESS_MARKER: &str = "tubesaver-progress";

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tubesaver-progress (\d+|NA) (\d+|NA) (\d+(?:\.\d+)?|NA)$")
        .expect("progress pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub total_bytes: u64,
    pub bytes_remaining: u64,
}

pub trait VideoSource: Send + Sync {
    fn fetch_video(&self, url: &str) -> Result<VideoHandle>;

    /// Downloads `stream` into `dest_dir` as `<prefix><title>.<ext>` and
    /// returns the written path. `on_progress` runs on the calling thread.
    fn download(
        &self,
        handle: &VideoHandle,
        stream: &StreamVariant,
        dest_dir: &Path,
        filename_prefix: &str,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    path: PathBuf,
}

impl YtDlp {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VideoSource for YtDlp {
    fn fetch_video(&self, url: &str) -> Result<VideoHandle> {
        let args = ["-J", "--no-playlist", "--no-warnings", url];
        log::info!("fetching metadata: {}", process::command_line(&self.path, &args));

        // stdout is the JSON document; only stderr is worth logging.
        let run = process::run_streaming(&self.path, &args, |stream, line| {
            if stream == ToolStream::Stderr {
                log::debug!("yt-dlp {}: {line}", stream.label());
            }
        })
        .map_err(|err| {
            Error::MetadataFetch(format!("failed to start {}: {err}", self.path.display()))
        })?;

        if !run.status.success() {
            return Err(Error::MetadataFetch(process::summarize_stderr(
                &run.stderr,
                "unknown yt-dlp error",
            )));
        }

        parse_video_json(&run.stdout, url)
    }

    fn download(
        &self,
        handle: &VideoHandle,
        stream: &StreamVariant,
        dest_dir: &Path,
        filename_prefix: &str,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<PathBuf> {
        let file_name = download_file_name(filename_prefix, &handle.title, &stream.container);
        let output = dest_dir.join(&file_name);
        let args = download_args(&stream.format_id, dest_dir, &file_name, &handle.url);
        log::info!(
            "downloading {} stream: {}",
            stream.kind,
            process::command_line(&self.path, &args)
        );

        let expected_total = stream.size_bytes.unwrap_or(0);
        let run = process::run_streaming(&self.path, &args, |source, line| {
            if let Some(progress) = parse_progress_line(line, expected_total) {
                on_progress(progress);
            } else {
                log::debug!("yt-dlp {}: {line}", source.label());
            }
        })
        .map_err(|err| Error::Download {
            kind: stream.kind,
            detail: format!("failed to start {}: {err}", self.path.display()),
        })?;

        if !run.status.success() {
            return Err(Error::Download {
                kind: stream.kind,
                detail: process::summarize_stderr(&run.stderr, "unknown yt-dlp error"),
            });
        }

        if !output.exists() {
            return Err(Error::Download {
                kind: stream.kind,
                detail: format!("yt-dlp finished but {} was not written", output.display()),
            });
        }

        Ok(output)
    }
}

pub fn download_file_name(prefix: &str, title: &str, container: &str) -> String {
    format!("{prefix}{}.{container}", sanitize_title(title))
}

/// The folder goes through `-P` untouched; only the file name is an output
/// template.
pub fn download_args(
    format_id: &str,
    dest_dir: &Path,
    file_name: &str,
    url: &str,
) -> Vec<OsString> {
    vec![
        "-f".into(),
        format_id.into(),
        "--newline".into(),
        "--no-playlist".into(),
        "--no-part".into(),
        "--force-overwrites".into(),
        "--progress-template".into(),
        format!(
            "download:{PROGRESS_MARKER} %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
        )
        .into(),
        "-P".into(),
        dest_dir.into(),
        "-o".into(),
        // `%` starts an output-template field in yt-dlp.
        file_name.replace('%', "%%").into(),
        url.into(),
    ]
}

/// Parses one line printed by the progress template. The total falls back to
/// yt-dlp's estimate, then to the size known from the metadata.
pub fn parse_progress_line(line: &str, expected_total: u64) -> Option<DownloadProgress> {
    let captures = PROGRESS_LINE.captures(line.trim())?;
    let downloaded = captures[1].parse::<u64>().ok()?;
    let total = captures[2]
        .parse::<u64>()
        .ok()
        .or_else(|| captures[3].parse::<f64>().ok().map(|estimate| estimate as u64))
        .filter(|total| *total > 0)
        .unwrap_or(expected_total);

    if total == 0 {
        return None;
    }

    Some(DownloadProgress {
        total_bytes: total,
        bytes_remaining: total.saturating_sub(downloaded),
    })
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    title: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    fps: Option<f64>,
    abr: Option<f64>,
    tbr: Option<f64>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
}

impl RawFormat {
    fn into_variant(self) -> Option<StreamVariant> {
        let format_id = self.format_id?;
        let has_video = self.vcodec.as_deref().is_some_and(|codec| codec != "none");
        let has_audio = self.acodec.as_deref().is_some_and(|codec| codec != "none");

        let kind = match (has_video, has_audio) {
            (true, false) => StreamKind::VideoOnly,
            (false, true) => StreamKind::AudioOnly,
            (true, true) => StreamKind::Muxed,
            // storyboards and other image-only entries
            (false, false) => return None,
        };

        Some(StreamVariant {
            format_id,
            kind,
            container: self.ext.unwrap_or_else(|| "unknown".to_string()),
            resolution: has_video
                .then_some(self.height)
                .flatten()
                .map(|height| format!("{height}p")),
            fps: self.fps.map(|fps| fps.round() as u32),
            bitrate_kbps: self.abr.or(self.tbr),
            size_bytes: self
                .filesize
                .or_else(|| self.filesize_approx.map(|approx| approx as u64)),
        })
    }
}

pub fn parse_video_json(json: &[u8], url: &str) -> Result<VideoHandle> {
    let raw: RawVideo = serde_json::from_slice(json)
        .map_err(|err| Error::MetadataFetch(format!("unreadable yt-dlp output: {err}")))?;

    let streams = raw
        .formats
        .into_iter()
        .filter_map(RawFormat::into_variant)
        .collect::<Vec<_>>();

    Ok(VideoHandle {
        url: url.to_string(),
        title: raw.title.unwrap_or_else(|| "untitled".to_string()),
        streams,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fixture() -> Vec<u8> {
        json!({
            "id": "abc123",
            "title": "Big: Buck/Bunny?",
            "formats": [
                {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
                 "abr": 129.478, "filesize": 3_400_000},
                {"format_id": "251", "ext": "webm", "vcodec": "none", "acodec": "opus",
                 "abr": 135.2, "filesize_approx": 3_500_000.0},
                {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2",
                 "height": 360, "fps": 30},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none",
                 "height": 1080, "fps": 29.97, "tbr": 4400.1, "filesize": null}
            ]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn parses_yt_dlp_metadata() {
        let handle = parse_video_json(&fixture(), "https://youtu.be/abc123").unwrap();

        assert_eq!(handle.title, "Big: Buck/Bunny?");
        assert_eq!(handle.url, "https://youtu.be/abc123");
        assert_eq!(handle.streams.len(), 4);

        let audio = &handle.streams[0];
        assert_eq!(audio.kind, StreamKind::AudioOnly);
        assert_eq!(audio.resolution, None);
        assert_eq!(audio.size_bytes, Some(3_400_000));

        let opus = &handle.streams[1];
        assert_eq!(opus.size_bytes, Some(3_500_000));

        assert_eq!(handle.streams[2].kind, StreamKind::Muxed);

        let video = &handle.streams[3];
        assert_eq!(video.kind, StreamKind::VideoOnly);
        assert_eq!(video.resolution.as_deref(), Some("1080p"));
        assert_eq!(video.fps, Some(30));
        assert_eq!(video.container, "mp4");
        assert_eq!(video.size_bytes, None);
    }

    #[test]
    fn unreadable_metadata_is_a_fetch_error() {
        assert!(matches!(
            parse_video_json(b"ERROR: not json", "u"),
            Err(Error::MetadataFetch(_))
        ));
    }

    #[test]
    fn missing_title_and_formats_are_tolerated() {
        let handle = parse_video_json(br#"{"id": "x"}"#, "u").unwrap();
        assert_eq!(handle.title, "untitled");
        assert!(handle.streams.is_empty());
    }

    #[test]
    fn progress_lines_become_remaining_bytes() {
        assert_eq!(
            parse_progress_line("tubesaver-progress 250 1000 NA", 0),
            Some(DownloadProgress {
                total_bytes: 1000,
                bytes_remaining: 750
            })
        );
        assert_eq!(
            parse_progress_line("tubesaver-progress 250 NA 2000.5", 0),
            Some(DownloadProgress {
                total_bytes: 2000,
                bytes_remaining: 1750
            })
        );
        assert_eq!(
            parse_progress_line("tubesaver-progress 100 NA NA", 400),
            Some(DownloadProgress {
                total_bytes: 400,
                bytes_remaining: 300
            })
        );
        assert_eq!(parse_progress_line("tubesaver-progress 100 NA NA", 0), None);
        assert_eq!(parse_progress_line("[download] Destination: x.mp4", 10), None);
        assert_eq!(parse_progress_line("tubesaver-progress NA 100 NA", 10), None);
    }

    #[test]
    fn download_file_name_and_args() {
        let file_name = download_file_name("video_", "100% Real: Clip", "mp4");
        assert_eq!(file_name, "video_100% Real Clip.mp4");

        let args = download_args("137", Path::new("/dl"), &file_name, "https://youtu.be/abc123");
        assert_eq!(&args[..2], ["-f", "137"]);
        let dir_flag = args.iter().position(|arg| arg == "-P").unwrap();
        assert_eq!(args[dir_flag + 1], "/dl");
        let output_flag = args.iter().position(|arg| arg == "-o").unwrap();
        assert_eq!(args[output_flag + 1], "video_100%% Real Clip.mp4");
        assert_eq!(args.last().and_then(|arg| arg.to_str()), Some("https://youtu.be/abc123"));
        assert!(
            args.iter()
                .any(|arg| arg.to_string_lossy().starts_with("download:tubesaver-progress "))
        );
    }

    #[cfg(unix)]
    #[test]
    fn download_args_keep_non_utf8_folder_intact() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dest = Path::new(OsStr::from_bytes(b"/dl/\xff\xfe"));
        let args = download_args("140", dest, "audio_Clip.m4a", "https://youtu.be/abc123");

        let dir_flag = args.iter().position(|arg| arg == "-P").unwrap();
        assert_eq!(args[dir_flag + 1].as_os_str().as_bytes(), b"/dl/\xff\xfe");
    }

    #[cfg(unix)]
    #[test]
    fn download_reports_progress_from_fake_yt_dlp() {
        use std::{fs, os::unix::fs::PermissionsExt};

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-yt-dlp");
        // Writes the file named by -P and -o and prints two progress lines.
        fs::write(
            &tool,
            "#!/bin/sh\ndir=''\nout=''\n\
             while [ $# -gt 0 ]; do\n\
             case \"$1\" in -P) dir=\"$2\";; -o) out=\"$2\";; esac\n\
             shift\n\
             done\n\
             echo 'tubesaver-progress 0 200 NA'\necho 'tubesaver-progress 200 200 NA'\n\
             : > \"$dir/$out\"\n",
        )
        .unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let handle = VideoHandle {
            url: "https://youtu.be/abc123".to_string(),
            title: "Clip".to_string(),
            streams: Vec::new(),
        };
        let stream = StreamVariant {
            format_id: "140".to_string(),
            kind: StreamKind::AudioOnly,
            container: "m4a".to_string(),
            resolution: None,
            fps: None,
            bitrate_kbps: Some(129.0),
            size_bytes: None,
        };

        let mut seen = Vec::new();
        let path = YtDlp::new(&tool)
            .download(&handle, &stream, dir.path(), "audio_", &mut |progress| {
                seen.push(progress.bytes_remaining)
            })
            .unwrap();

        assert_eq!(path, dir.path().join("audio_Clip.m4a"));
        assert!(path.exists());
        assert_eq!(seen, [200, 0]);
    }
}
