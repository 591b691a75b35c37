//! seqgif command-line interface.
//!
//! Reads a terminal session recording (ttyrec or asciicast) from a file or
//! stdin and writes an animated GIF to a file or stdout. Option names
//! follow the classic seq2gif tool, including `-h` for height; help is on
//! `-H`/`--help`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use seqgif::recording::Format;
use seqgif::{encode_with_cancel, Config, Error, Theme};

#[derive(Debug, Parser)]
#[command(
    name = "seqgif",
    version,
    about = "Convert recorded terminal sessions (ttyrec, asciicast) to animated GIF",
    disable_help_flag = true
)]
struct Cli {
    /// Terminal width in cells (used when the recording has no geometry)
    #[arg(short = 'w', long, default_value_t = 80)]
    width: u16,

    /// Terminal height in cells (used when the recording has no geometry)
    #[arg(short = 'h', long, default_value_t = 24)]
    height: u16,

    /// Delay in msec added to the last frame
    #[arg(short = 'l', long, default_value_t = 300)]
    last_frame_delay: u64,

    /// Foreground color palette number
    #[arg(short = 'f', long, default_value_t = 7)]
    foreground_color: u8,

    /// Background color palette number
    #[arg(short = 'b', long, default_value_t = 0)]
    background_color: u8,

    /// Cursor color palette number
    #[arg(short = 'c', long, default_value_t = 2)]
    cursor_color: u8,

    /// Hardware tabstop width
    #[arg(short = 't', long, default_value_t = 8)]
    tabstop: u16,

    /// Treat East Asian Ambiguous width characters (UAX#11) as wide
    #[arg(short = 'j', long)]
    cjkwidth: bool,

    /// Animation repeat count; 0 loops forever
    #[arg(short = 'r', long, default_value_t = 0)]
    repeat: u16,

    /// Disable looping entirely
    #[arg(long)]
    no_loop: bool,

    /// Minimum interval between frames, in msec; closer updates coalesce
    #[arg(long, default_value_t = 0)]
    frame_rate_cap: u64,

    /// Palette size bound (2-256)
    #[arg(long, default_value_t = 256)]
    max_colors: u16,

    /// Use one color table per frame instead of a global one
    #[arg(long)]
    per_frame_palette: bool,

    /// Output canvas width in pixels (default: one pixel per cell)
    #[arg(long)]
    out_width: Option<u16>,

    /// Output canvas height in pixels (default: one pixel per cell)
    #[arg(long)]
    out_height: Option<u16>,

    /// Input format (auto-detected by default)
    #[arg(long, value_parser = parse_format, default_value = "auto")]
    format: Format,

    /// Overall wall-clock budget for the encode, in seconds
    #[arg(long)]
    time_limit: Option<u64>,

    /// Input file name; '-' reads stdin
    #[arg(short = 'i', long, default_value = "-")]
    input: String,

    /// Output file name; '-' writes stdout
    #[arg(short = 'o', long, default_value = "-")]
    output: String,

    /// Print help
    #[arg(short = 'H', long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn parse_format(s: &str) -> std::result::Result<Format, String> {
    match s {
        "auto" => Ok(Format::Auto),
        "ttyrec" => Ok(Format::Ttyrec),
        "asciicast" => Ok(Format::Asciicast),
        other => Err(format!(
            "unknown format '{other}' (expected auto, ttyrec, or asciicast)"
        )),
    }
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            cols: self.width,
            rows: self.height,
            frame_rate_cap: Duration::from_millis(self.frame_rate_cap),
            last_frame_delay: Duration::from_millis(self.last_frame_delay),
            max_colors: self.max_colors,
            loop_enabled: !self.no_loop,
            repeat: self.repeat,
            global_palette: !self.per_frame_palette,
            width_override: self.out_width,
            height_override: self.out_height,
            theme: Theme {
                foreground: self.foreground_color,
                background: self.background_color,
                cursor: self.cursor_color,
            },
            tab_width: self.tabstop,
            cjk_width: self.cjkwidth,
            time_limit: self.time_limit.map(Duration::from_secs),
            ..Config::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();

    let data = read_input(&cli.input)
        .with_context(|| format!("failed to read input '{}'", cli.input))?;
    let recording = seqgif::recording::load(&data, cli.format)?;
    debug!(
        chunks = recording.chunks.len(),
        cols = ?recording.cols,
        rows = ?recording.rows,
        "recording loaded"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("failed to install interrupt handler")?;

    write_output(&recording, &config, &cli.output, &cancel)
}

fn read_input(path: &str) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    if path == "-" {
        io::stdin().lock().read_to_end(&mut data)?;
    } else {
        data = fs::read(path)?;
    }
    Ok(data)
}

fn write_output(
    recording: &seqgif::Recording,
    config: &Config,
    path: &str,
    cancel: &AtomicBool,
) -> Result<()> {
    if path == "-" {
        let stdout = io::stdout();
        let mut sink = stdout.lock();
        let stats = encode_with_cancel(recording, config, &mut sink, Some(cancel))?;
        sink.flush().map_err(Error::Sink)?;
        debug!(frames = stats.frames, bytes = stats.bytes_written, "done");
        return Ok(());
    }

    let path = PathBuf::from(path);
    let mut file = fs::File::create(&path)
        .with_context(|| format!("failed to create output '{}'", path.display()))?;
    match encode_with_cancel(recording, config, &mut file, Some(cancel)) {
        Ok(stats) => {
            debug!(frames = stats.frames, bytes = stats.bytes_written, "done");
            Ok(())
        }
        Err(err) => {
            // Never leave a truncated GIF on disk.
            drop(file);
            let _ = fs::remove_file(&path);
            Err(err.into())
        }
    }
}
