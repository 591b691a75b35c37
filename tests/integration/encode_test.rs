//! End-to-end pipeline tests over the library API, including a reference
//! GIF decode of the encoder's own output.

use std::time::Duration;

use seqgif::recording::{Chunk, Recording};
use seqgif::{encode, Config};

fn chunk(ms: u64, data: &[u8]) -> Chunk {
    Chunk {
        time: Duration::from_millis(ms),
        data: data.to_vec(),
    }
}

fn encode_to_vec(recording: &Recording, config: &Config) -> Vec<u8> {
    let mut out = Vec::new();
    encode(recording, config, &mut out).unwrap();
    out
}

#[test]
fn single_color_session_roundtrips() {
    // A 6x3 session painted entirely red, cursor hidden.
    let mut data = b"\x1b[?25l\x1b[41m".to_vec();
    for row in 1..=3 {
        data.extend_from_slice(format!("\x1b[{row};1H      ").as_bytes());
    }
    let recording = Recording {
        chunks: vec![chunk(0, &data)],
        ..Recording::default()
    };
    let config = Config {
        cols: 6,
        rows: 3,
        ..Config::default()
    };

    let bytes = encode_to_vec(&recording, &config);
    let gif = DecodedGif::parse(&bytes);

    assert_eq!((gif.width, gif.height), (6, 3));
    assert_eq!(gif.frames.len(), 1);
    let frame = &gif.frames[0];
    assert_eq!((frame.w, frame.h), (6, 3));
    // Named red resolves to the xterm palette value.
    assert!(frame.pixels.iter().all(|&rgb| rgb == (205, 0, 0)));
}

#[test]
fn delta_frame_decodes_over_previous() {
    let recording = Recording {
        chunks: vec![
            chunk(0, b"\x1b[?25l\x1b[41m "),
            chunk(500, b"\x1b[H\x1b[44m "),
        ],
        ..Recording::default()
    };
    let config = Config {
        cols: 4,
        rows: 2,
        ..Config::default()
    };

    let gif = DecodedGif::parse(&encode_to_vec(&recording, &config));
    assert_eq!(gif.frames.len(), 2);

    // Second frame is the 1x1 repaint at the origin.
    let second = &gif.frames[1];
    assert_eq!((second.x, second.y, second.w, second.h), (0, 0, 1, 1));
    assert_eq!(second.pixels[0], (0, 0, 238)); // named blue

    // Composited with "do not dispose", the rest of the canvas still shows
    // frame one.
    let composite = gif.composite();
    assert_eq!(composite[0], (0, 0, 238));
    assert_eq!(composite[1], (0, 0, 0)); // untouched background
}

#[test]
fn grid_dimensions_hold_across_every_frame() {
    let recording = Recording {
        chunks: vec![
            chunk(0, b"one\r\n"),
            chunk(100, b"\x1b[2Jtwo"),
            chunk(300, b"\x1bcthree\r\nmore"),
        ],
        ..Recording::default()
    };
    let config = Config {
        cols: 12,
        rows: 5,
        frame_rate_cap: Duration::from_millis(50),
        ..Config::default()
    };

    let gif = DecodedGif::parse(&encode_to_vec(&recording, &config));
    assert_eq!((gif.width, gif.height), (12, 5));
    for frame in &gif.frames {
        assert!(frame.x + frame.w <= gif.width);
        assert!(frame.y + frame.h <= gif.height);
        assert!(frame.delay_cs >= 1);
    }
}

#[test]
fn idempotent_byte_for_byte() {
    let mut data = Vec::new();
    for i in 0u32..400 {
        let (r, g, b) = (i % 256, (i * 3) % 256, (i * 11) % 256);
        data.extend_from_slice(format!("\x1b[48;2;{r};{g};{b}m.").as_bytes());
    }
    let recording = Recording {
        chunks: vec![chunk(0, &data), chunk(250, b"\x1b[2Jdone")],
        ..Recording::default()
    };
    let config = Config {
        cols: 40,
        rows: 12,
        max_colors: 64,
        ..Config::default()
    };

    assert_eq!(
        encode_to_vec(&recording, &config),
        encode_to_vec(&recording, &config)
    );
}

#[test]
fn palette_bound_survives_color_explosion() {
    let mut data = b"\x1b[?25l".to_vec();
    for i in 0u32..300 {
        let (r, g, b) = ((i * 5) % 256, (i * 17) % 256, (i * 23) % 256);
        data.extend_from_slice(format!("\x1b[48;2;{r};{g};{b}m ").as_bytes());
    }
    let recording = Recording {
        chunks: vec![chunk(0, &data)],
        ..Recording::default()
    };
    let config = Config {
        cols: 40,
        rows: 10,
        ..Config::default()
    };

    // Must decode cleanly with a <= 256 color table.
    let gif = DecodedGif::parse(&encode_to_vec(&recording, &config));
    assert_eq!(gif.frames.len(), 1);
    assert!(gif.global_table_len <= 256);
}

#[test]
fn per_frame_palettes_decode_with_local_tables() {
    let recording = Recording {
        chunks: vec![
            chunk(0, b"\x1b[?25l\x1b[41m "),
            chunk(200, b"\x1b[H\x1b[42m "),
        ],
        ..Recording::default()
    };
    let config = Config {
        cols: 3,
        rows: 2,
        global_palette: false,
        ..Config::default()
    };

    let gif = DecodedGif::parse(&encode_to_vec(&recording, &config));
    assert_eq!(gif.global_table_len, 0);
    assert_eq!(gif.frames.len(), 2);
    assert_eq!(gif.frames[1].pixels[0], (0, 205, 0));
}

#[test]
fn empty_recording_decodes_to_blank_frame() {
    let recording = Recording::default();
    let config = Config {
        cols: 5,
        rows: 2,
        ..Config::default()
    };

    let gif = DecodedGif::parse(&encode_to_vec(&recording, &config));
    assert_eq!(gif.frames.len(), 1);
    // Blank background everywhere except the visible cursor cell.
    let black = gif
        .frames[0]
        .pixels
        .iter()
        .filter(|&&p| p == (0, 0, 0))
        .count();
    assert_eq!(black, 9);
}

// ── reference GIF decoder ─────────────────────────────────────────────

struct DecodedFrame {
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    delay_cs: u16,
    pixels: Vec<(u8, u8, u8)>,
}

struct DecodedGif {
    width: u16,
    height: u16,
    global_table_len: usize,
    frames: Vec<DecodedFrame>,
}

impl DecodedGif {
    fn parse(bytes: &[u8]) -> Self {
        assert_eq!(&bytes[..6], b"GIF89a", "header magic");
        let width = u16::from_le_bytes([bytes[6], bytes[7]]);
        let height = u16::from_le_bytes([bytes[8], bytes[9]]);
        let packed = bytes[10];

        let mut i = 13;
        let mut global = Vec::new();
        if packed & 0x80 != 0 {
            let entries = 2usize << (packed & 0x07);
            for _ in 0..entries {
                global.push((bytes[i], bytes[i + 1], bytes[i + 2]));
                i += 3;
            }
        }

        let mut frames = Vec::new();
        let mut delay_cs = 0u16;
        loop {
            match bytes[i] {
                0x21 => {
                    if bytes[i + 1] == 0xF9 {
                        delay_cs = u16::from_le_bytes([bytes[i + 4], bytes[i + 5]]);
                    }
                    i += 2;
                    while bytes[i] != 0 {
                        i += 1 + bytes[i] as usize;
                    }
                    i += 1;
                }
                0x2C => {
                    let x = u16::from_le_bytes([bytes[i + 1], bytes[i + 2]]);
                    let y = u16::from_le_bytes([bytes[i + 3], bytes[i + 4]]);
                    let w = u16::from_le_bytes([bytes[i + 5], bytes[i + 6]]);
                    let h = u16::from_le_bytes([bytes[i + 7], bytes[i + 8]]);
                    let local_packed = bytes[i + 9];
                    i += 10;

                    let mut local = Vec::new();
                    if local_packed & 0x80 != 0 {
                        let entries = 2usize << (local_packed & 0x07);
                        for _ in 0..entries {
                            local.push((bytes[i], bytes[i + 1], bytes[i + 2]));
                            i += 3;
                        }
                    }

                    let min_code_size = bytes[i];
                    i += 1;
                    let mut data = Vec::new();
                    while bytes[i] != 0 {
                        let len = bytes[i] as usize;
                        data.extend_from_slice(&bytes[i + 1..i + 1 + len]);
                        i += 1 + len;
                    }
                    i += 1;

                    let table = if local.is_empty() { &global } else { &local };
                    let indices = lzw_decompress(&data, min_code_size);
                    assert_eq!(indices.len(), usize::from(w) * usize::from(h));
                    let pixels = indices
                        .iter()
                        .map(|&idx| table[idx as usize])
                        .collect();
                    frames.push(DecodedFrame {
                        x,
                        y,
                        w,
                        h,
                        delay_cs,
                        pixels,
                    });
                }
                0x3B => break,
                other => panic!("unexpected block 0x{other:02X}"),
            }
        }

        Self {
            width,
            height,
            global_table_len: global.len(),
            frames,
        }
    }

    /// Composite every frame with "do not dispose" semantics.
    fn composite(&self) -> Vec<(u8, u8, u8)> {
        let (w, h) = (usize::from(self.width), usize::from(self.height));
        let mut canvas = vec![(0u8, 0u8, 0u8); w * h];
        for frame in &self.frames {
            for row in 0..usize::from(frame.h) {
                for col in 0..usize::from(frame.w) {
                    let src = frame.pixels[row * usize::from(frame.w) + col];
                    let dst =
                        (usize::from(frame.y) + row) * w + usize::from(frame.x) + col;
                    canvas[dst] = src;
                }
            }
        }
        canvas
    }
}

fn lzw_decompress(data: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let eoi = clear + 1;

    let mut entries: Vec<Vec<u8>> = (0..clear).map(|i| vec![i as u8]).collect();
    entries.push(Vec::new());
    entries.push(Vec::new());
    let base = entries.len();

    let mut width = u32::from(min_code_size) + 1;
    let mut out = Vec::new();
    let mut prev: Option<u16> = None;
    let mut acc = 0u32;
    let mut filled = 0u32;
    let mut bytes = data.iter();

    loop {
        while filled < width {
            acc |= u32::from(*bytes.next().expect("truncated LZW stream")) << filled;
            filled += 8;
        }
        let code = (acc & ((1 << width) - 1)) as u16;
        acc >>= width;
        filled -= width;

        if code == clear {
            entries.truncate(base);
            width = u32::from(min_code_size) + 1;
            prev = None;
            continue;
        }
        if code == eoi {
            return out;
        }

        let entry = if (code as usize) < entries.len() {
            entries[code as usize].clone()
        } else {
            let p = &entries[prev.expect("invalid stream") as usize];
            let mut e = p.clone();
            e.push(p[0]);
            e
        };
        out.extend_from_slice(&entry);

        if let Some(p) = prev {
            if entries.len() < 4096 {
                let mut new = entries[p as usize].clone();
                new.push(entry[0]);
                entries.push(new);
            }
        }
        if entries.len() == (1 << width) && width < 12 {
            width += 1;
        }
        prev = Some(code);
    }
}
