// Error kinds shared by the collaborators and the download workflow.
// - `Error` is what a single step can fail with.
// - `RunFailure` pins an error to the workflow stage it happened in, so the
//   UI can say which part of a run broke.
use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::catalog::StreamKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Input(String),

    #[error("could not load video metadata: {0}")]
    MetadataFetch(String),

    #[error("quality selection {index} is not in the current list (reload the video and pick again)")]
    Selection { index: usize },

    #[error("no {0} stream available for this video")]
    NoStream(StreamKind),

    #[error("{kind} download failed: {detail}")]
    Download { kind: StreamKind, detail: String },

    #[error("{tool} exited with code {}: {detail}", exit_code_label(.code))]
    ExternalTool {
        tool: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("{action} {}: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map(|code| code.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Prepare,
    Download,
    Merge,
    Convert,
    Cleanup,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Prepare => "prepare",
            Self::Download => "download",
            Self::Merge => "merge",
            Self::Convert => "convert",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl RunFailure {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }
}
