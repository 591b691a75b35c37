//! Encoder configuration.
//!
//! One [`Config`] value scopes a single encode invocation; nothing here is
//! process-global. Defaults follow the classic seq2gif tool: 80x24 cells,
//! foreground palette 7 on background 0, green cursor, 8-column tab stops,
//! 300 ms tail on the last frame, infinite looping.

use std::time::Duration;

use crate::error::{Error, Result};

/// Largest palette a GIF color table can hold.
pub const MAX_PALETTE: usize = 256;

/// Theme colors, given as indices into the standard 256-color table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Default foreground (SGR 39).
    pub foreground: u8,
    /// Default background (SGR 49).
    pub background: u8,
    /// Cursor cell color.
    pub cursor: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            foreground: 7,
            background: 0,
            cursor: 2,
        }
    }
}

/// Options recognized by one encode invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Terminal width in cells, used when the recording carries no geometry.
    pub cols: u16,
    /// Terminal height in cells, used when the recording carries no geometry.
    pub rows: u16,
    /// Minimum interval between emitted frames. Updates arriving inside the
    /// window coalesce into one frame. Zero means one frame per timestamped
    /// update, with same-instant updates still coalesced.
    pub frame_rate_cap: Duration,
    /// Extra display time appended to the final frame.
    pub last_frame_delay: Duration,
    /// Palette size bound, 2..=256. Streams with more distinct colors are
    /// reduced by median cut.
    pub max_colors: u16,
    /// Emit the Netscape looping extension.
    pub loop_enabled: bool,
    /// Animation repeat count for the looping extension; 0 loops forever.
    pub repeat: u16,
    /// One global color table for the whole stream, instead of a local
    /// table per frame.
    pub global_palette: bool,
    /// Output canvas width in pixels. Defaults to one pixel per cell.
    pub width_override: Option<u16>,
    /// Output canvas height in pixels. Defaults to one pixel per cell.
    pub height_override: Option<u16>,
    /// Default foreground/background/cursor colors.
    pub theme: Theme,
    /// Hardware tab stop width.
    pub tab_width: u16,
    /// Treat East Asian Ambiguous characters (UAX #11) as wide.
    pub cjk_width: bool,
    /// When the changed fraction of the grid exceeds this, the whole grid
    /// becomes the frame delta.
    pub full_redraw_fraction: f32,
    /// Optional wall-clock budget for the whole encode. When exhausted the
    /// remaining chunks are dropped and the GIF is finalized from the frames
    /// emitted so far.
    pub time_limit: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            frame_rate_cap: Duration::ZERO,
            last_frame_delay: Duration::from_millis(300),
            max_colors: MAX_PALETTE as u16,
            loop_enabled: true,
            repeat: 0,
            global_palette: true,
            width_override: None,
            height_override: None,
            theme: Theme::default(),
            tab_width: 8,
            cjk_width: false,
            full_redraw_fraction: 0.8,
            time_limit: None,
        }
    }
}

impl Config {
    /// Reject configurations the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 || self.rows == 0 {
            return Err(Error::InvalidConfig(format!(
                "terminal geometry must be nonzero, got {}x{}",
                self.cols, self.rows
            )));
        }
        if !(2..=MAX_PALETTE as u16).contains(&self.max_colors) {
            return Err(Error::InvalidConfig(format!(
                "max_colors must be in 2..=256, got {}",
                self.max_colors
            )));
        }
        if self.width_override == Some(0) || self.height_override == Some(0) {
            return Err(Error::InvalidConfig(
                "output canvas override must be nonzero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.full_redraw_fraction) {
            return Err(Error::InvalidConfig(format!(
                "full_redraw_fraction must be in 0.0..=1.0, got {}",
                self.full_redraw_fraction
            )));
        }
        Ok(())
    }
}
