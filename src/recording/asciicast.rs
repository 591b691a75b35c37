//! asciicast parser (versions 2 and 3).
//!
//! Reference: https://docs.asciinema.org/manual/asciicast/v2/
//!            https://docs.asciinema.org/manual/asciicast/v3/
//!
//! The file is JSON lines: a header object first, then one `[time, code,
//! data]` array per event. v2 event times are absolute offsets from session
//! start; v3 times are intervals since the previous event. Both normalize to
//! absolute times here. Only output (`"o"`) events carry bytes for the
//! emulator; resizes are skipped because grid dimensions are fixed for the
//! lifetime of one recording.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::{monotonic, Chunk, Recording};

#[derive(Debug, Deserialize)]
struct RawHeader {
    version: u8,
    // v2 geometry
    width: Option<u16>,
    height: Option<u16>,
    // v3 geometry
    term: Option<RawTerm>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTerm {
    cols: u16,
    rows: u16,
}

pub(super) fn parse(data: &[u8]) -> Result<Recording> {
    let text = std::str::from_utf8(data)
        .map_err(|_| Error::malformed("asciicast input is not valid UTF-8"))?;

    let mut lines = text.lines().enumerate();
    let (_, header_line) = lines
        .next()
        .ok_or_else(|| Error::malformed("asciicast input is empty"))?;

    let header: RawHeader = serde_json::from_str(header_line)
        .map_err(|e| Error::malformed_at(1, format!("unparseable header: {e}")))?;

    let relative_times = match header.version {
        2 => false,
        3 => true,
        other => {
            return Err(Error::malformed(format!(
                "unsupported asciicast version {other}"
            )))
        }
    };

    let (cols, rows) = match (&header.term, header.width, header.height) {
        (Some(term), _, _) => (Some(term.cols), Some(term.rows)),
        (None, Some(w), Some(h)) => (Some(w), Some(h)),
        _ => (None, None),
    };

    let mut chunks = Vec::new();
    let mut clock = Duration::ZERO;

    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;

        let (seconds, code, payload) = parse_event(line, line_no)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(Error::malformed_at(
                line_no,
                format!("event time must be a finite non-negative number, got {seconds}"),
            ));
        }
        let offset = Duration::from_secs_f64(seconds);

        clock = if relative_times {
            clock + offset
        } else {
            monotonic(clock, offset)
        };

        match code.as_str() {
            "o" => chunks.push(Chunk {
                time: clock,
                data: payload.into_bytes(),
            }),
            "r" => debug!(line = line_no, "skipping resize event, grid is fixed"),
            other => debug!(line = line_no, code = other, "skipping event"),
        }
    }

    Ok(Recording {
        cols,
        rows,
        title: header.title,
        chunks,
    })
}

fn parse_event(line: &str, line_no: usize) -> Result<(f64, String, String)> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| Error::malformed_at(line_no, format!("unparseable event: {e}")))?;

    let arr = value
        .as_array()
        .ok_or_else(|| Error::malformed_at(line_no, "event must be a JSON array"))?;
    if arr.len() < 3 {
        return Err(Error::malformed_at(
            line_no,
            "event array must have at least 3 elements",
        ));
    }

    let time = arr[0]
        .as_f64()
        .ok_or_else(|| Error::malformed_at(line_no, "event time must be a number"))?;
    let code = arr[1]
        .as_str()
        .ok_or_else(|| Error::malformed_at(line_no, "event code must be a string"))?;
    let data = arr[2]
        .as_str()
        .ok_or_else(|| Error::malformed_at(line_no, "event data must be a string"))?;

    Ok((time, code.to_string(), data.to_string()))
}
