//! The encoding pipeline.
//!
//! Single-threaded and synchronous: chunks feed the emulator in timestamp
//! order, timed snapshots come out, consecutive snapshots are diffed into
//! dirty rectangles, rectangles are rasterized and quantized, and the
//! frames serialize into a GIF89a stream. The whole stream is built in
//! memory before the first byte reaches the sink, so no failure mode can
//! leave a partial GIF behind.
//!
//! Frame timing: a snapshot is emitted when the elapsed time since the
//! last one reaches the configured cap and the update will be visible for
//! a nonzero interval; same-instant updates coalesce into one frame.
//! Delays are rounded to hundredths of a second and clamped to >= 1 cs,
//! and frames whose delta is empty fold their time into the previous
//! frame. The final frame always gets `last_frame_delay`.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diff::{diff, DirtyRect};
use crate::error::{Error, Result};
use crate::gif::{EncodedFrame, GifWriter};
use crate::palette::Palette;
use crate::recording::Recording;
use crate::render::{PixelRect, Rasterizer};
use crate::term::{Screen, Snapshot};

/// Summary of one finished encode.
#[derive(Debug, Clone, Copy)]
pub struct EncodeStats {
    pub frames: usize,
    /// Global palette size, or the largest per-frame palette.
    pub palette_colors: usize,
    pub bytes_written: usize,
    /// Control sequences consumed without effect.
    pub unsupported_sequences: u64,
}

/// Encode a recording to `sink` with no cancellation hook.
pub fn encode<W: Write>(recording: &Recording, config: &Config, sink: &mut W) -> Result<EncodeStats> {
    encode_with_cancel(recording, config, sink, None)
}

/// Encode a recording to `sink`.
///
/// `cancel` is polled between snapshot emissions; once it reads true the
/// encode stops with [`Error::Canceled`] before anything is written.
pub fn encode_with_cancel<W: Write>(
    recording: &Recording,
    config: &Config,
    sink: &mut W,
    cancel: Option<&AtomicBool>,
) -> Result<EncodeStats> {
    config.validate()?;

    let cols = recording.cols.unwrap_or(config.cols) as usize;
    let rows = recording.rows.unwrap_or(config.rows) as usize;

    let (snapshots, unsupported) = run_emulator(recording, config, cols, rows, cancel)?;
    let frames = build_frames(&snapshots, config, cols, rows);
    let frame_count = frames.len();
    let (bytes, palette_colors) = serialize(frames, config, cols, rows)?;

    sink.write_all(&bytes).map_err(Error::Sink)?;
    sink.flush().map_err(Error::Sink)?;

    let stats = EncodeStats {
        frames: frame_count,
        palette_colors,
        bytes_written: bytes.len(),
        unsupported_sequences: unsupported,
    };
    info!(
        frames = stats.frames,
        colors = stats.palette_colors,
        bytes = stats.bytes_written,
        "encode finished"
    );
    Ok(stats)
}

/// A snapshot paired with its emission time.
struct TimedSnapshot {
    snap: Snapshot,
    time: Duration,
}

fn run_emulator(
    recording: &Recording,
    config: &Config,
    cols: usize,
    rows: usize,
    cancel: Option<&AtomicBool>,
) -> Result<(Vec<TimedSnapshot>, u64)> {
    let mut screen = Screen::new(cols, rows, config.tab_width as usize, config.cjk_width);
    let mut snapshots: Vec<TimedSnapshot> = Vec::new();
    let started = Instant::now();
    let mut budget_spent = false;

    for (i, chunk) in recording.chunks.iter().enumerate() {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Canceled);
            }
        }
        if let Some(limit) = config.time_limit {
            if started.elapsed() > limit {
                warn!(
                    consumed = i,
                    total = recording.chunks.len(),
                    "wall-clock budget exhausted, dropping remaining chunks"
                );
                budget_spent = true;
                break;
            }
        }

        screen.feed(&chunk.data);

        let next_time = match recording.chunks.get(i + 1) {
            Some(next) => next.time,
            None => break, // final state is captured below
        };

        // A snapshot is worth a frame only when it will be visible for a
        // nonzero interval, the cap window has elapsed, and the parser is
        // not inside a partially-consumed sequence.
        if screen.mid_sequence() || next_time <= chunk.time {
            continue;
        }
        let since_last = match snapshots.last() {
            Some(last) => chunk.time.saturating_sub(last.time),
            None => Duration::MAX, // first frame is always eligible
        };
        if since_last >= config.frame_rate_cap && since_last > Duration::ZERO {
            snapshots.push(TimedSnapshot {
                snap: screen.snapshot(),
                time: chunk.time,
            });
        }
    }

    // End of stream: capture the final state, unless the budget cut the
    // stream short (its tail would misrepresent the timeline).
    if !budget_spent || snapshots.is_empty() {
        let time = recording.chunks.last().map_or(Duration::ZERO, |c| c.time);
        let time = snapshots.last().map_or(time, |s| time.max(s.time));
        snapshots.push(TimedSnapshot {
            snap: screen.snapshot(),
            time,
        });
    }

    debug!(snapshots = snapshots.len(), "emulation finished");
    Ok((snapshots, screen.unsupported_count()))
}

/// A rasterized frame before quantization.
struct PixelFrame {
    rect: PixelRect,
    pixels: Vec<rgb::RGB8>,
    duration: Duration,
}

fn build_frames(
    snapshots: &[TimedSnapshot],
    config: &Config,
    cols: usize,
    rows: usize,
) -> Vec<PixelFrame> {
    let raster = Rasterizer::new(cols, rows, config);
    let mut frames: Vec<PixelFrame> = Vec::new();
    let mut prev: Option<&Snapshot> = None;

    for (i, timed) in snapshots.iter().enumerate() {
        let duration = match snapshots.get(i + 1) {
            Some(next) => next.time.saturating_sub(timed.time),
            None => config.last_frame_delay,
        };

        // The first frame covers the whole canvas; the GIF background is
        // undefined until something is painted everywhere.
        let rect = match prev {
            None => Some(DirtyRect::full(&timed.snap)),
            Some(p) => diff(p, &timed.snap, config.full_redraw_fraction),
        };
        prev = Some(&timed.snap);

        let rect = rect.map(|r| raster.pixel_rect(r));
        match rect {
            Some(rect) if rect.w > 0 && rect.h > 0 => {
                let pixels = raster.render(&timed.snap, rect);
                frames.push(PixelFrame {
                    rect,
                    pixels,
                    duration,
                });
            }
            // Nothing visible changed: the time belongs to the previous
            // frame.
            _ => {
                if let Some(last) = frames.last_mut() {
                    last.duration += duration;
                }
            }
        }
    }

    frames
}

fn serialize(
    frames: Vec<PixelFrame>,
    config: &Config,
    cols: usize,
    rows: usize,
) -> Result<(Vec<u8>, usize)> {
    let raster = Rasterizer::new(cols, rows, config);
    let (canvas_w, canvas_h) = raster.canvas();
    let max_colors = config.max_colors as usize;

    let mut palette_colors = 0usize;
    let mut encoded = Vec::with_capacity(frames.len());
    let global = if config.global_palette {
        let mut palette = Palette::build(
            frames.iter().flat_map(|f| f.pixels.iter().copied()),
            max_colors,
        );
        palette_colors = palette.len();
        for frame in &frames {
            let indices = frame.pixels.iter().map(|&p| palette.map(p)).collect();
            encoded.push(with_indices(frame, indices, None));
        }
        Some(palette)
    } else {
        for frame in &frames {
            let mut palette = Palette::build(frame.pixels.iter().copied(), max_colors);
            palette_colors = palette_colors.max(palette.len());
            let indices: Vec<u8> = frame.pixels.iter().map(|&p| palette.map(p)).collect();
            encoded.push(with_indices(frame, indices, Some(palette)));
        }
        None
    };

    let mut writer = GifWriter::new(
        Vec::new(),
        canvas_w as u16,
        canvas_h as u16,
        global.as_ref(),
    )
    .map_err(Error::Sink)?;
    if config.loop_enabled {
        writer.write_loop(config.repeat).map_err(Error::Sink)?;
    }
    for frame in &encoded {
        writer.write_frame(frame).map_err(Error::Sink)?;
    }
    let bytes = writer.finish().map_err(Error::Sink)?;
    Ok((bytes, palette_colors))
}

fn with_indices(frame: &PixelFrame, indices: Vec<u8>, palette: Option<Palette>) -> EncodedFrame {
    EncodedFrame {
        x: frame.rect.x as u16,
        y: frame.rect.y as u16,
        w: frame.rect.w as u16,
        h: frame.rect.h as u16,
        delay_cs: duration_to_cs(frame.duration),
        indices,
        palette,
    }
}

/// Round a duration to GIF hundredths of a second, clamped to >= 1 so a
/// zero-duration frame cannot exist.
fn duration_to_cs(duration: Duration) -> u16 {
    let cs = (duration.as_millis() + 5) / 10;
    cs.clamp(1, u16::MAX as u128) as u16
}
