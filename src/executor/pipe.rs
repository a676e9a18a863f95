//! Internal utilities for draining command output pipes.
//!
//! stdout is captured so the command channel can hand it back to callers;
//! stderr is streamed to the log as it arrives.

use std::io::{BufRead, BufReader, Read};

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads a pipe line by line, handing every line (without its newline) to `sink`.
///
/// Binary data uses lossy UTF-8 conversion and a trailing CR is trimmed.
/// I/O errors stop reading but don't fail command execution; success is
/// determined by the exit status.
fn for_each_line<R: Read>(pipe: Option<R>, stream_type: StreamType, mut sink: impl FnMut(&str)) {
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                let text = String::from_utf8_lossy(content);
                sink(text.trim_end_matches('\r'));
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

/// Reads stdout into a string, echoing each line at TRACE level.
pub(super) fn read_pipe_to_string<R: Read>(pipe: Option<R>) -> String {
    let mut captured = String::new();
    for_each_line(pipe, StreamType::Stdout, |line| {
        tracing::trace!(stream = %StreamType::Stdout, "{}", line);
        captured.push_str(line);
        captured.push('\n');
    });
    captured
}

/// Streams stderr to the log at DEBUG level.
///
/// Remote probes fail on purpose (e.g. "package is not installed"), so
/// stderr is not promoted to WARN.
pub(super) fn read_pipe_to_log<R: Read>(pipe: Option<R>) {
    for_each_line(pipe, StreamType::Stderr, |line| {
        tracing::debug!(stream = %StreamType::Stderr, "{}", line);
    });
}
