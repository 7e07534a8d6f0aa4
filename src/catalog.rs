// Stream catalog for a loaded video.
// - Holds the immutable video handle and its stream variants.
// - Builds the numbered quality list shown in video+audio mode.
// - Resolves a user choice (or a stale one) back to a concrete stream.
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    error::{Error, Result},
    progress::DownloadMode,
};

pub const VIDEO_CONTAINER: &str = "mp4";
pub const MIN_RESOLUTION: u32 = 360;
pub const MAX_RESOLUTION: u32 = 2160;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    VideoOnly,
    AudioOnly,
    Muxed,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VideoOnly => "video",
            Self::AudioOnly => "audio",
            Self::Muxed => "muxed",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamVariant {
    /// Passed back to the platform collaborator to download this stream.
    pub format_id: String,
    pub kind: StreamKind,
    pub container: String,
    /// e.g. `1080p`; absent for audio.
    pub resolution: Option<String>,
    pub fps: Option<u32>,
    pub bitrate_kbps: Option<f64>,
    pub size_bytes: Option<u64>,
}

impl StreamVariant {
    pub fn resolution_height(&self) -> Option<u32> {
        parse_resolution(self.resolution.as_deref()?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoHandle {
    pub url: String,
    pub title: String,
    pub streams: Vec<StreamVariant>,
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub index: usize,
    pub label: String,
    pub stream: StreamVariant,
}

/// A quality choice tied to the catalog it was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    generation: u64,
    index: usize,
}

impl Selection {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    generation: u64,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::from_streams(Vec::new())
    }

    fn from_streams(streams: Vec<StreamVariant>) -> Self {
        let entries = streams
            .into_iter()
            .enumerate()
            .map(|(position, stream)| {
                let index = position + 1;
                let label = format!(
                    "{index}: {} - {}fps",
                    stream.resolution.as_deref().unwrap_or("unknown"),
                    stream
                        .fps
                        .map(|fps| fps.to_string())
                        .unwrap_or_else(|| "?".to_string())
                );
                CatalogEntry {
                    index,
                    label,
                    stream,
                }
            })
            .collect();

        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            entries,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    pub fn resolve(&self, index: usize) -> Result<&StreamVariant> {
        index
            .checked_sub(1)
            .and_then(|position| self.entries.get(position))
            .map(|entry| &entry.stream)
            .ok_or(Error::Selection { index })
    }

    pub fn select(&self, index: usize) -> Result<Selection> {
        self.resolve(index)?;
        Ok(Selection {
            generation: self.generation,
            index,
        })
    }

    pub fn resolve_selection(&self, selection: &Selection) -> Result<&StreamVariant> {
        if selection.generation != self.generation {
            return Err(Error::Selection {
                index: selection.index,
            });
        }
        self.resolve(selection.index)
    }
}

pub fn load_catalog(handle: &VideoHandle, mode: DownloadMode) -> Catalog {
    if mode == DownloadMode::AudioOnly {
        return Catalog::empty();
    }

    let mut video_streams = handle
        .streams
        .iter()
        .filter(|stream| {
            stream.kind == StreamKind::VideoOnly
                && stream.container.eq_ignore_ascii_case(VIDEO_CONTAINER)
        })
        .cloned()
        .collect::<Vec<_>>();
    video_streams.sort_by(|a, b| b.resolution_height().cmp(&a.resolution_height()));

    let filtered = video_streams
        .iter()
        .filter(|stream| match stream.resolution_height() {
            Some(height) => (MIN_RESOLUTION..=MAX_RESOLUTION).contains(&height),
            None => {
                log::warn!(
                    "skipping stream {} with unreadable resolution {:?}",
                    stream.format_id,
                    stream.resolution
                );
                false
            }
        })
        .cloned()
        .collect::<Vec<_>>();

    if filtered.is_empty() {
        if !video_streams.is_empty() {
            log::info!(
                "no {VIDEO_CONTAINER} stream between {MIN_RESOLUTION}p and {MAX_RESOLUTION}p; listing all {} variants",
                video_streams.len()
            );
        }
        Catalog::from_streams(video_streams)
    } else {
        Catalog::from_streams(filtered)
    }
}

pub fn best_audio(handle: &VideoHandle) -> Result<&StreamVariant> {
    handle
        .streams
        .iter()
        .filter(|stream| stream.kind == StreamKind::AudioOnly)
        .max_by(|a, b| {
            a.bitrate_kbps
                .unwrap_or(0.0)
                .total_cmp(&b.bitrate_kbps.unwrap_or(0.0))
        })
        .ok_or(Error::NoStream(StreamKind::AudioOnly))
}

fn parse_resolution(resolution: &str) -> Option<u32> {
    resolution.trim().trim_end_matches('p').parse::<u32>().ok()
}
