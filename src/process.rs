// Blocking subprocess runner used on worker threads.
// - Spawns a tool with piped stdout/stderr and one reader thread per pipe.
// - Splits the byte chunks into lines (on \n or \r, so progress redraws count)
//   and hands each line to the caller as soon as it arrives.
// - Keeps the raw stderr so failures can be summarized afterwards.
use std::{
    ffi::OsStr,
    io::{self, BufReader, Read},
    path::Path,
    process::{Command, ExitStatus, Stdio},
    sync::mpsc,
    thread,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolStream {
    Stdout,
    Stderr,
}

impl ToolStream {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

enum ToolEvent {
    Chunk { stream: ToolStream, data: Vec<u8> },
    ReaderError { stream: ToolStream, error: String },
}

#[derive(Debug)]
pub struct ToolRun {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Default)]
struct LineBuffers {
    stdout_raw: Vec<u8>,
    stderr_raw: Vec<u8>,
    stdout_pending: Vec<u8>,
    stderr_pending: Vec<u8>,
}

pub fn command_line<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(|arg| -> &OsStr { arg.as_ref() }))
        .map(|arg| shell_quote(&arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` to completion, calling `on_line` for every output line.
/// Blocks the calling thread; never call this from the UI thread.
pub fn run_streaming<S, F>(program: &Path, args: &[S], mut on_line: F) -> io::Result<ToolRun>
where
    S: AsRef<OsStr>,
    F: FnMut(ToolStream, &str),
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("failed to capture stderr"))?;

    let (tx, rx) = mpsc::channel();
    spawn_reader(stdout, ToolStream::Stdout, tx.clone());
    spawn_reader(stderr, ToolStream::Stderr, tx);

    let mut buffers = LineBuffers::default();

    // The channel closes once both readers hit EOF.
    for event in rx {
        match event {
            ToolEvent::Chunk { stream, data } => {
                for line in consume_stream_chunk(&mut buffers, stream, &data) {
                    on_line(stream, &line);
                }
            }
            ToolEvent::ReaderError { stream, error } => {
                on_line(stream, &format!("reader error: {error}"));
            }
        }
    }

    if let Some(line) = flush_pending_line(&mut buffers.stderr_pending) {
        on_line(ToolStream::Stderr, &line);
    }
    if let Some(line) = flush_pending_line(&mut buffers.stdout_pending) {
        on_line(ToolStream::Stdout, &line);
    }

    let status = child.wait()?;
    Ok(ToolRun {
        status,
        stdout: buffers.stdout_raw,
        stderr: buffers.stderr_raw,
    })
}

/// Last meaningful stderr line, skipping ffmpeg's generic trailer.
pub fn summarize_stderr(stderr: &[u8], fallback: &str) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "Conversion failed!")
        .next_back()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        "''".to_string()
    } else if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || "-_./:+@=?".contains(ch))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

fn spawn_reader<R>(reader: R, stream: ToolStream, tx: mpsc::Sender<ToolEvent>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = [0_u8; 4096];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => {
                    if tx
                        .send(ToolEvent::Chunk {
                            stream,
                            data: buf[..read].to_vec(),
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(ToolEvent::ReaderError {
                        stream,
                        error: err.to_string(),
                    });
                    break;
                }
            }
        }
    });
}

fn consume_stream_chunk(buffers: &mut LineBuffers, stream: ToolStream, data: &[u8]) -> Vec<String> {
    let (raw, pending) = match stream {
        ToolStream::Stdout => (&mut buffers.stdout_raw, &mut buffers.stdout_pending),
        ToolStream::Stderr => (&mut buffers.stderr_raw, &mut buffers.stderr_pending),
    };

    raw.extend_from_slice(data);

    let mut lines = Vec::new();
    for &byte in data {
        if byte == b'\n' || byte == b'\r' {
            if let Some(line) = flush_pending_line(pending) {
                lines.push(line);
            }
        } else {
            pending.push(byte);
        }
    }

    lines
}

fn flush_pending_line(pending: &mut Vec<u8>) -> Option<String> {
    if pending.is_empty() {
        return None;
    }

    let line = String::from_utf8_lossy(pending)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    pending.clear();

    if line.is_empty() { None } else { Some(line) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_split_on_newlines_and_carriage_returns() {
        let mut buffers = LineBuffers::default();

        let first =
            consume_stream_chunk(&mut buffers, ToolStream::Stdout, b"[download]  1.0%\r[down");
        assert_eq!(first, ["[download]  1.0%"]);

        let second = consume_stream_chunk(&mut buffers, ToolStream::Stdout, b"load]  2.0%\n\n");
        assert_eq!(second, ["[download]  2.0%"]);

        assert_eq!(buffers.stdout_raw, b"[download]  1.0%\r[download]  2.0%\n\n");
        assert!(buffers.stderr_raw.is_empty());
    }

    #[test]
    fn trailing_partial_line_is_flushed() {
        let mut buffers = LineBuffers::default();
        assert!(consume_stream_chunk(&mut buffers, ToolStream::Stderr, b"no newline").is_empty());
        assert_eq!(
            flush_pending_line(&mut buffers.stderr_pending).as_deref(),
            Some("no newline")
        );
        assert_eq!(flush_pending_line(&mut buffers.stderr_pending), None);
    }

    #[test]
    fn stderr_summary_skips_generic_trailer() {
        let stderr = b"Input #0, mov\nvideo.mp4: Invalid data found when processing input\nConversion failed!\n";
        assert_eq!(
            summarize_stderr(stderr, "unknown"),
            "video.mp4: Invalid data found when processing input"
        );
        assert_eq!(summarize_stderr(b"\n  \n", "unknown ffmpeg error"), "unknown ffmpeg error");
    }

    #[test]
    fn shell_quote_only_wraps_when_needed() {
        assert_eq!(shell_quote("-c:v"), "-c:v");
        assert_eq!(shell_quote("My Video.mp4"), "'My Video.mp4'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn command_line_quotes_every_argument() {
        let line = command_line(Path::new("/opt/ffmpeg/ffmpeg"), &["-i", "a b.mp4"]);
        assert_eq!(line, "/opt/ffmpeg/ffmpeg -i 'a b.mp4'");
    }

    #[cfg(unix)]
    #[test]
    fn run_streaming_collects_lines_and_status() {
        let mut lines = Vec::new();
        let run = run_streaming(
            Path::new("/bin/sh"),
            &["-c", "printf 'one\\ntwo\\r'; printf 'oops\\n' >&2; exit 3"],
            |stream, line| lines.push((stream, line.to_string())),
        )
        .unwrap();

        assert_eq!(run.status.code(), Some(3));
        assert!(lines.contains(&(ToolStream::Stdout, "one".to_string())));
        assert!(lines.contains(&(ToolStream::Stdout, "two".to_string())));
        assert!(lines.contains(&(ToolStream::Stderr, "oops".to_string())));
        assert_eq!(run.stderr, b"oops\n");
    }
}
