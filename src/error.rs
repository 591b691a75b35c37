//! Error types for the encoding pipeline.
//!
//! Fatal errors are the ones that abort an encode: an unparseable recording
//! (raised before any output byte is produced), a failed write to the output
//! sink, or cancellation. Per-frame interpretation problems (unknown escape
//! sequences, palettes that need reduction) are recovered locally and logged,
//! never surfaced here.

use std::io;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal encoding errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The recording header or framing could not be parsed.
    ///
    /// Always raised before any output byte is written, so a malformed
    /// input never produces a partial GIF.
    #[error("malformed recording: {reason}")]
    MalformedRecording { reason: String },

    /// Writing the finished GIF stream to the output sink failed.
    #[error("failed to write GIF output")]
    Sink(#[source] io::Error),

    /// The encode was canceled between frames (user interrupt).
    #[error("encoding canceled")]
    Canceled,

    /// Rejected configuration (zero geometry, palette bound out of range).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Build a [`Error::MalformedRecording`] from any printable reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedRecording {
            reason: reason.into(),
        }
    }

    /// Same, tagged with the 1-based input line the problem was found on.
    pub fn malformed_at(line: usize, reason: impl std::fmt::Display) -> Self {
        Error::MalformedRecording {
            reason: format!("{} (line {})", reason, line),
        }
    }
}
