//! Stdio transport: one JSON request per input line, one JSON response per
//! output line.
//!
//! The transport only frames lines; request semantics live in the handler.
//! Stdout carries responses exclusively, so logging must go elsewhere.

use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

/// Counters reported when the input stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: u64,
    pub skipped: u64,
}

/// Strip leading and trailing ASCII whitespace from a raw line.
fn trim_line(mut line: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = line {
        if !first.is_ascii_whitespace() {
            break;
        }
        line = rest;
    }
    while let [rest @ .., last] = line {
        if !last.is_ascii_whitespace() {
            break;
        }
        line = rest;
    }
    line
}

/// Serve requests from `input` until EOF, writing each response to `output`.
///
/// Lines are handed to `handle` as raw bytes so that a line which is not
/// valid UTF-8 still gets a response from the handler instead of ending the
/// stream. Blank lines are skipped. Responses are flushed per line so a
/// driving process can work interactively.
///
/// # Errors
/// Returns an I/O error if reading input or writing a response fails.
pub fn serve<R, W, F>(mut input: R, mut output: W, mut handle: F) -> std::io::Result<ServeStats>
where
    R: BufRead,
    W: Write,
    F: FnMut(&[u8]) -> String,
{
    let mut stats = ServeStats::default();
    let mut buf = Vec::new();
    info!("stdio transport: serving requests");

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("stdio transport read error: {e}");
                return Err(e);
            }
        }
        let line = trim_line(&buf);
        if line.is_empty() {
            stats.skipped += 1;
            continue;
        }

        stats.requests += 1;
        let response = handle(line);
        debug!(request = stats.requests, "stdio transport: responding");
        writeln!(output, "{response}")?;
        output.flush()?;
    }

    info!(
        requests = stats.requests,
        "stdio transport: input closed"
    );
    Ok(stats)
}
