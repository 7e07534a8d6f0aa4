// Startup configuration.
// - Layers defaults, an optional TOML file, TUBESAVER_* environment variables
//   and command-line flags, in that order.
// - Resolved once in `main`; the rest of the app only sees `Config`.
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::progress::DownloadMode;

const APP_DIR: &str = "tubesaver";
const DEFAULT_RESET_DELAY_MS: u64 = 3000;

#[derive(Debug, Parser)]
#[command(name = "tubesaver")]
#[command(version)]
#[command(about = "Download a video and its best audio track, then merge or convert them with ffmpeg")]
pub struct Cli {
    /// Video URL to pre-fill in the form
    pub url: Option<String>,

    /// Destination folder for finished files
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// yt-dlp executable
    #[arg(long)]
    pub yt_dlp: Option<PathBuf>,

    /// Config file (default: <config dir>/tubesaver/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start in audio-only mode
    #[arg(short, long, default_value_t = false)]
    pub audio_only: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ModeSetting {
    Video,
    Audio,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    destination: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
    yt_dlp: Option<PathBuf>,
    reset_delay_ms: Option<u64>,
    log_file: Option<PathBuf>,
    default_mode: Option<ModeSetting>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub destination: PathBuf,
    pub ffmpeg: PathBuf,
    pub yt_dlp: PathBuf,
    pub reset_delay: Duration,
    pub log_file: PathBuf,
    pub default_mode: DownloadMode,
    pub initial_url: Option<String>,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cwd = env::current_dir().map_err(ConfigError::CurrentDir)?;
        let file = match cli.config.clone().or_else(default_config_path) {
            Some(path) if cli.config.is_some() || path.is_file() => read_file_config(&path)?,
            _ => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file, |key| env::var_os(key).map(PathBuf::from), &cwd))
    }

    fn resolve(
        cli: &Cli,
        file: FileConfig,
        env_var: impl Fn(&str) -> Option<PathBuf>,
        cwd: &Path,
    ) -> Self {
        let absolute = |path: PathBuf| if path.is_absolute() { path } else { cwd.join(path) };

        let destination = cli
            .dest
            .clone()
            .or_else(|| env_var("TUBESAVER_DEST"))
            .or(file.destination)
            .map(absolute)
            .unwrap_or_else(|| cwd.to_path_buf());

        let ffmpeg = cli
            .ffmpeg
            .clone()
            .or_else(|| env_var("TUBESAVER_FFMPEG"))
            .or(file.ffmpeg)
            .or_else(bundled_ffmpeg)
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));

        let yt_dlp = cli
            .yt_dlp
            .clone()
            .or_else(|| env_var("TUBESAVER_YT_DLP"))
            .or(file.yt_dlp)
            .unwrap_or_else(|| PathBuf::from("yt-dlp"));

        let default_mode = if cli.audio_only {
            DownloadMode::AudioOnly
        } else {
            match file.default_mode {
                Some(ModeSetting::Audio) => DownloadMode::AudioOnly,
                Some(ModeSetting::Video) | None => DownloadMode::Combined,
            }
        };

        Self {
            destination,
            ffmpeg,
            yt_dlp,
            reset_delay: Duration::from_millis(
                file.reset_delay_ms.unwrap_or(DEFAULT_RESET_DELAY_MS),
            ),
            log_file: file.log_file.unwrap_or_else(|| default_log_path(cwd)),
            default_mode,
            initial_url: cli.url.clone(),
        }
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_file_config(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_log_path(cwd: &Path) -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| cwd.to_path_buf())
        .join("tubesaver.log")
}

/// `ffmpeg/ffmpeg[.exe]` shipped next to the executable.
fn bundled_ffmpeg() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    bundled_ffmpeg_in(exe.parent()?)
}

fn bundled_ffmpeg_in(dir: &Path) -> Option<PathBuf> {
    let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    let candidate = dir.join("ffmpeg").join(name);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("tubesaver").chain(args.iter().copied()))
    }

    fn no_env(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn defaults_apply_without_file_env_or_flags() {
        let config = Config::resolve(&cli(&[]), FileConfig::default(), no_env, Path::new("/work"));

        assert_eq!(config.destination, PathBuf::from("/work"));
        assert_eq!(config.yt_dlp, PathBuf::from("yt-dlp"));
        assert_eq!(config.reset_delay, Duration::from_secs(3));
        assert_eq!(config.default_mode, DownloadMode::Combined);
        assert_eq!(config.initial_url, None);
        assert!(config.log_file.ends_with("tubesaver.log"));
    }

    #[test]
    fn file_then_env_then_flags_take_precedence() {
        let file = parse_file_config(
            r#"
                destination = "/from-file"
                ffmpeg = "/opt/file/ffmpeg"
                yt_dlp = "/opt/file/yt-dlp"
                reset_delay_ms = 500
                default_mode = "audio"
            "#,
        )
        .unwrap();
        let env = HashMap::from([
            ("TUBESAVER_DEST", PathBuf::from("/from-env")),
            ("TUBESAVER_FFMPEG", PathBuf::from("/opt/env/ffmpeg")),
        ]);
        let lookup = |key: &str| env.get(key).cloned();

        let config = Config::resolve(
            &cli(&["--ffmpeg", "/opt/cli/ffmpeg", "https://youtu.be/abc123"]),
            file,
            lookup,
            Path::new("/work"),
        );

        assert_eq!(config.destination, PathBuf::from("/from-env"));
        assert_eq!(config.ffmpeg, PathBuf::from("/opt/cli/ffmpeg"));
        assert_eq!(config.yt_dlp, PathBuf::from("/opt/file/yt-dlp"));
        assert_eq!(config.reset_delay, Duration::from_millis(500));
        assert_eq!(config.default_mode, DownloadMode::AudioOnly);
        assert_eq!(config.initial_url.as_deref(), Some("https://youtu.be/abc123"));
    }

    #[test]
    fn relative_destination_is_anchored_to_cwd() {
        let config = Config::resolve(
            &cli(&["--dest", "downloads"]),
            FileConfig::default(),
            no_env,
            Path::new("/work"),
        );
        assert_eq!(config.destination, PathBuf::from("/work/downloads"));
    }

    #[test]
    fn audio_only_flag_overrides_file_mode() {
        let file = parse_file_config("default_mode = \"video\"").unwrap();
        let config = Config::resolve(&cli(&["--audio-only"]), file, no_env, Path::new("/work"));
        assert_eq!(config.default_mode, DownloadMode::AudioOnly);
    }

    #[test]
    fn unknown_keys_and_modes_are_rejected() {
        assert!(parse_file_config("colour = \"blue\"").is_err());
        assert!(parse_file_config("default_mode = \"both\"").is_err());
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bundled_ffmpeg_is_found_next_to_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(bundled_ffmpeg_in(dir.path()), None);

        let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        fs::create_dir(dir.path().join("ffmpeg")).unwrap();
        fs::write(dir.path().join("ffmpeg").join(name), b"").unwrap();
        assert_eq!(bundled_ffmpeg_in(dir.path()), Some(dir.path().join("ffmpeg").join(name)));
    }
}
