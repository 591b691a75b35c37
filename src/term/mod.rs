//! Terminal emulator: control sequence parser, screen grid, and the
//! emulator façade that connects them.
//!
//! The emulator interprets a recording's output bytes (cursor movement,
//! colors and attributes, clearing, scrolling, line wrap) against a virtual
//! screen grid of fixed dimensions, and hands out immutable [`Snapshot`]s
//! for the frame pipeline. Unknown sequences are consumed and ignored.

mod grid;
mod parser;
mod screen;
mod types;

pub use grid::{Grid, Snapshot};
pub use parser::{Action, Parser};
pub use screen::Screen;
pub use types::{AttrFlags, Cell, Color, Pen};
