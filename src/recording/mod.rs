//! Session recording model and input parsers.
//!
//! A recording is an ordered sequence of timestamped output byte chunks plus
//! optional header metadata (terminal geometry, title). Two on-disk formats
//! are supported:
//!
//! - `ttyrec`: binary `sec/usec/len` records followed by payload bytes
//! - `asciicast`: the asciinema JSON-lines format, versions 2 and 3
//!
//! Both parse into the same [`Recording`] value. Parsing is strict about
//! framing (a truncated record or unparseable event line is fatal) and
//! happens in full before the encoder produces a single output byte.

mod asciicast;
mod ttyrec;

use std::time::Duration;

use crate::error::Result;

/// One timestamped run of terminal output bytes.
///
/// `time` is the offset from the start of the session; chunks are ordered
/// and non-decreasing in time once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub time: Duration,
    pub data: Vec<u8>,
}

/// A loaded session recording. Immutable once parsed.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// Terminal width in cells, when the format carries it (asciicast).
    pub cols: Option<u16>,
    /// Terminal height in cells, when the format carries it (asciicast).
    pub rows: Option<u16>,
    /// Session title, when the format carries it.
    pub title: Option<String>,
    pub chunks: Vec<Chunk>,
}

/// Input format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Sniff the format from the first byte: asciicast files start with the
    /// header object's `{`, ttyrec records never do.
    #[default]
    Auto,
    Ttyrec,
    Asciicast,
}

/// Parse a recording from a pre-loaded byte buffer.
pub fn load(data: &[u8], format: Format) -> Result<Recording> {
    let format = match format {
        Format::Auto => detect(data),
        other => other,
    };

    match format {
        Format::Asciicast => asciicast::parse(data),
        Format::Ttyrec => ttyrec::parse(data),
        Format::Auto => unreachable!("auto resolved above"),
    }
}

fn detect(data: &[u8]) -> Format {
    match data.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Format::Asciicast,
        _ => Format::Ttyrec,
    }
}

/// Reject times that would break the monotonic-chunk invariant.
///
/// Recordings from wall clocks can step backwards; instead of failing the
/// whole encode we clamp to the previous chunk's time.
fn monotonic(prev: Duration, time: Duration) -> Duration {
    time.max(prev)
}
