//! Terminal cell data types.
//!
//! A [`Cell`] is a value type: one code point, its display width, and the
//! pen (colors + attribute flags) it was written with. Snapshots copy cells
//! wholesale, so everything here is `Copy` and compact.

use bitflags::bitflags;

bitflags! {
    /// SGR text attribute flags, matching the ECMA-48 parameter values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        const BOLD      = 1 << 0;
        const DIM       = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const INVERSE   = 1 << 5;
        const HIDDEN    = 1 << 6;
        /// Trailing half of a wide (2-column) character. Content is a
        /// placeholder; rendering uses the leading cell.
        const WIDE_CONTINUATION = 1 << 7;
    }
}

/// Color of a cell, following the terminal color model hierarchy:
/// default, 16 named, 256 indexed, 24-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / 49); resolved through the theme.
    #[default]
    Default,
    /// Named color 0-15: standard 8 plus bright 8.
    Named(u8),
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// Current writing attributes: foreground, background, flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl Pen {
    /// SGR 0.
    pub fn reset(&mut self) {
        *self = Pen::default();
    }
}

/// One cell of the screen grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Code point shown in the cell. Space for blank/erased cells.
    pub ch: char,
    /// Display width in columns: 1, or 2 for a wide lead, 0 for the
    /// continuation half.
    pub width: u8,
    pub pen: Pen,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            width: 1,
            pen: Pen::default(),
        }
    }
}

impl Cell {
    /// A blank cell erased with the given background, the way ED/EL fill:
    /// background color kept, every other attribute reset.
    pub fn erased(bg: Color) -> Self {
        Self {
            ch: ' ',
            width: 1,
            pen: Pen {
                bg,
                ..Pen::default()
            },
        }
    }

    /// Whether the cell draws a glyph (anything other than blank space).
    pub fn has_glyph(&self) -> bool {
        self.ch != ' ' && !self.pen.flags.contains(AttrFlags::WIDE_CONTINUATION)
    }
}
