//! GIF89a stream serialization.
//!
//! Emits, in order: header, logical screen descriptor, optional global
//! color table, optional Netscape looping extension, then per frame a
//! graphic control extension, image descriptor, optional local color
//! table, and LZW-compressed data sub-blocks, closed by the trailer.
//!
//! Disposal policy: every frame uses "do not dispose" and paints an opaque
//! rectangle over the previous image; no transparent index is reserved.
//! The policy is the same in global- and per-frame-palette modes.

use std::io::{self, Write};

use crate::palette::Palette;

use super::lzw;

/// Graphic control disposal "do not dispose", shifted into the packed
/// field.
const DISPOSAL_DO_NOT_DISPOSE: u8 = 1 << 2;

/// One fully prepared frame: an indexed rectangle plus timing.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Position of the rectangle on the canvas, in pixels.
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
    /// Display duration in hundredths of a second, always >= 1.
    pub delay_cs: u16,
    /// Palette indices, row-major, `w * h` entries.
    pub indices: Vec<u8>,
    /// Local color table, when the stream uses per-frame palettes.
    pub palette: Option<Palette>,
}

/// Serializer for one GIF89a stream.
pub struct GifWriter<W: Write> {
    out: W,
    global_min_code_size: u8,
}

impl<W: Write> GifWriter<W> {
    /// Write the header, logical screen descriptor, and global color table
    /// (when one is given).
    pub fn new(mut out: W, width: u16, height: u16, global: Option<&Palette>) -> io::Result<Self> {
        out.write_all(b"GIF89a")?;
        out.write_all(&width.to_le_bytes())?;
        out.write_all(&height.to_le_bytes())?;

        let packed = match global {
            // Global table flag, 8-bit color resolution, table size.
            Some(palette) => 0x80 | 0x70 | (palette.table_bits() - 1),
            None => 0x70,
        };
        // Background color index 0, no pixel aspect ratio.
        out.write_all(&[packed, 0x00, 0x00])?;

        if let Some(palette) = global {
            write_color_table(&mut out, palette)?;
        }

        Ok(Self {
            out,
            global_min_code_size: global.map_or(2, Palette::min_code_size),
        })
    }

    /// Netscape application extension: loop the animation `repeat` times,
    /// 0 meaning forever.
    pub fn write_loop(&mut self, repeat: u16) -> io::Result<()> {
        self.out.write_all(&[0x21, 0xFF, 0x0B])?;
        self.out.write_all(b"NETSCAPE2.0")?;
        self.out.write_all(&[0x03, 0x01])?;
        self.out.write_all(&repeat.to_le_bytes())?;
        self.out.write_all(&[0x00])
    }

    pub fn write_frame(&mut self, frame: &EncodedFrame) -> io::Result<()> {
        // Graphic control extension.
        self.out.write_all(&[0x21, 0xF9, 0x04, DISPOSAL_DO_NOT_DISPOSE])?;
        self.out.write_all(&frame.delay_cs.to_le_bytes())?;
        self.out.write_all(&[0x00, 0x00])?; // no transparent index

        // Image descriptor.
        self.out.write_all(&[0x2C])?;
        self.out.write_all(&frame.x.to_le_bytes())?;
        self.out.write_all(&frame.y.to_le_bytes())?;
        self.out.write_all(&frame.w.to_le_bytes())?;
        self.out.write_all(&frame.h.to_le_bytes())?;

        let min_code_size = match &frame.palette {
            Some(palette) => {
                self.out.write_all(&[0x80 | (palette.table_bits() - 1)])?;
                write_color_table(&mut self.out, palette)?;
                palette.min_code_size()
            }
            None => {
                self.out.write_all(&[0x00])?;
                self.global_min_code_size
            }
        };

        // LZW data, framed into 255-byte sub-blocks.
        self.out.write_all(&[min_code_size])?;
        let data = lzw::compress(&frame.indices, min_code_size);
        for block in data.chunks(255) {
            self.out.write_all(&[block.len() as u8])?;
            self.out.write_all(block)?;
        }
        self.out.write_all(&[0x00])
    }

    /// Write the trailer and hand the sink back.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.write_all(&[0x3B])?;
        Ok(self.out)
    }
}

/// A color table padded with black to its power-of-two size.
fn write_color_table<W: Write>(out: &mut W, palette: &Palette) -> io::Result<()> {
    let entries = 1usize << palette.table_bits();
    for &color in palette.colors() {
        out.write_all(&[color.r, color.g, color.b])?;
    }
    for _ in palette.len()..entries {
        out.write_all(&[0, 0, 0])?;
    }
    Ok(())
}
