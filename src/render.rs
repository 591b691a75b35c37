//! Cell-to-pixel rasterizer.
//!
//! Each cell maps to one pixel at native size; optional canvas overrides
//! rescale by integer boundary mapping so a rectangle of cells always
//! covers an exact rectangle of pixels, at any scale.
//!
//! Color policy: a cell shows its background color, unless it draws a glyph
//! or is underlined, in which case it shows the foreground. Inverse video
//! swaps the two first, bold brightens the dim half of the named palette,
//! and the cursor cell is painted in the configured cursor color.

use rgb::RGB8;

use crate::config::{Config, Theme};
use crate::diff::DirtyRect;
use crate::term::{AttrFlags, Cell, Color, Snapshot};

/// A rectangle of output pixels, derived from a [`DirtyRect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Maps snapshots to RGB pixel buffers for one encode invocation.
#[derive(Debug)]
pub struct Rasterizer {
    native_w: usize,
    native_h: usize,
    out_w: usize,
    out_h: usize,
    fg: RGB8,
    bg: RGB8,
    cursor: RGB8,
}

impl Rasterizer {
    pub fn new(cols: usize, rows: usize, config: &Config) -> Self {
        let Theme {
            foreground,
            background,
            cursor,
        } = config.theme;
        Self {
            native_w: cols,
            native_h: rows,
            out_w: config.width_override.map_or(cols, usize::from),
            out_h: config.height_override.map_or(rows, usize::from),
            fg: index_to_rgb(foreground),
            bg: index_to_rgb(background),
            cursor: index_to_rgb(cursor),
        }
    }

    /// Output canvas size in pixels.
    pub fn canvas(&self) -> (usize, usize) {
        (self.out_w, self.out_h)
    }

    /// Pixel rectangle covered by a cell rectangle. May be empty when
    /// downscaling squeezes the cells between pixel boundaries.
    pub fn pixel_rect(&self, rect: DirtyRect) -> PixelRect {
        let x0 = edge(rect.x, self.out_w, self.native_w);
        let x1 = edge(rect.x + rect.w, self.out_w, self.native_w);
        let y0 = edge(rect.y, self.out_h, self.native_h);
        let y1 = edge(rect.y + rect.h, self.out_h, self.native_h);
        PixelRect {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        }
    }

    /// Render the pixels of `rect`, row-major.
    pub fn render(&self, snap: &Snapshot, rect: PixelRect) -> Vec<RGB8> {
        let mut pixels = Vec::with_capacity(rect.w * rect.h);
        for py in rect.y..rect.y + rect.h {
            let row = py * self.native_h / self.out_h;
            for px in rect.x..rect.x + rect.w {
                let col = px * self.native_w / self.out_w;
                pixels.push(self.cell_color(snap, row, col));
            }
        }
        pixels
    }

    fn cell_color(&self, snap: &Snapshot, row: usize, col: usize) -> RGB8 {
        if snap.cursor == Some((row, col)) {
            return self.cursor;
        }
        let cell = snap.cell(row, col);
        let flags = cell.pen.flags;

        let (mut fg, mut bg) = (
            self.resolve(cell.pen.fg, true, flags),
            self.resolve(cell.pen.bg, false, flags),
        );
        if flags.contains(AttrFlags::INVERSE) {
            std::mem::swap(&mut fg, &mut bg);
        }
        if flags.contains(AttrFlags::HIDDEN) {
            return bg;
        }
        if shows_foreground(cell) {
            fg
        } else {
            bg
        }
    }

    fn resolve(&self, color: Color, is_fg: bool, flags: AttrFlags) -> RGB8 {
        match color {
            Color::Default => {
                if is_fg {
                    self.fg
                } else {
                    self.bg
                }
            }
            Color::Named(n) => {
                // Bold brightens the standard half of the named palette.
                let n = if is_fg && n < 8 && flags.contains(AttrFlags::BOLD) {
                    n + 8
                } else {
                    n
                };
                index_to_rgb(n)
            }
            Color::Indexed(n) => index_to_rgb(n),
            Color::Rgb(r, g, b) => RGB8::new(r, g, b),
        }
    }
}

fn shows_foreground(cell: &Cell) -> bool {
    cell.has_glyph() || cell.pen.flags.contains(AttrFlags::UNDERLINE)
}

/// Map a cell-edge coordinate to a pixel-edge coordinate (ceiling division,
/// so consecutive cell runs tile the pixel canvas exactly).
fn edge(cell: usize, out: usize, native: usize) -> usize {
    (cell * out + native - 1) / native
}

/// The standard 256-color table: 16 base colors, a 6x6x6 cube, and a
/// 24-step grayscale ramp.
pub fn index_to_rgb(index: u8) -> RGB8 {
    const BASE: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (205, 0, 0),
        (0, 205, 0),
        (205, 205, 0),
        (0, 0, 238),
        (205, 0, 205),
        (0, 205, 205),
        (229, 229, 229),
        (127, 127, 127),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (92, 92, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];
    const CUBE: [u8; 6] = [0, 95, 135, 175, 215, 255];

    match index {
        0..=15 => {
            let (r, g, b) = BASE[index as usize];
            RGB8::new(r, g, b)
        }
        16..=231 => {
            let i = index - 16;
            RGB8::new(
                CUBE[(i / 36) as usize],
                CUBE[(i / 6 % 6) as usize],
                CUBE[(i % 6) as usize],
            )
        }
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            RGB8::new(v, v, v)
        }
    }
}
