//! Emulator façade: feeds bytes through the parser and applies the
//! resulting actions to the grid.
//!
//! Unrecognized sequences are counted and logged at debug level, never
//! fatal. SGR interpretation lives here because it is stateful (parameters
//! are deltas against the current pen).

use tracing::debug;

use super::grid::{Grid, Snapshot};
use super::parser::{Action, Parser};
use super::types::{AttrFlags, Color};

/// Terminal emulator for one recording.
#[derive(Debug)]
pub struct Screen {
    parser: Parser,
    grid: Grid,
    title: Option<String>,
    unsupported: u64,
    actions: Vec<Action>,
}

impl Screen {
    pub fn new(cols: usize, rows: usize, tab_width: usize, cjk_width: bool) -> Self {
        Self {
            parser: Parser::new(),
            grid: Grid::new(cols, rows, tab_width, cjk_width),
            title: None,
            unsupported: 0,
            actions: Vec::new(),
        }
    }

    /// Interpret a chunk of terminal output.
    pub fn feed(&mut self, bytes: &[u8]) {
        let mut actions = std::mem::take(&mut self.actions);
        for &byte in bytes {
            self.parser.advance(byte, &mut actions);
            for action in actions.drain(..) {
                self.apply(action);
            }
        }
        self.actions = actions;
    }

    /// Whether the parser is inside a partially-consumed sequence. The
    /// pipeline defers snapshots while this holds so a frame never shows a
    /// torn update.
    pub fn mid_sequence(&self) -> bool {
        !self.parser.is_ground()
    }

    /// Immutable copy of the current screen contents.
    pub fn snapshot(&self) -> Snapshot {
        self.grid.snapshot()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Number of sequences consumed without effect.
    pub fn unsupported_count(&self) -> u64 {
        self.unsupported
    }

    fn apply(&mut self, action: Action) {
        let grid = &mut self.grid;
        match action {
            Action::Print(ch) => grid.print(ch),
            Action::Backspace => grid.backspace(),
            Action::Tab => grid.tab(),
            Action::LineFeed => grid.line_feed(),
            Action::CarriageReturn => grid.carriage_return(),
            Action::CursorUp(n) => grid.move_up(n as usize),
            Action::CursorDown(n) => grid.move_down(n as usize),
            Action::CursorRight(n) => grid.move_right(n as usize),
            Action::CursorLeft(n) => grid.move_left(n as usize),
            Action::CursorNextLine(n) => {
                grid.move_down(n as usize);
                grid.carriage_return();
            }
            Action::CursorPrevLine(n) => {
                grid.move_up(n as usize);
                grid.carriage_return();
            }
            Action::CursorColumn(col) => grid.move_to_col(col as usize),
            Action::CursorRow(row) => grid.move_to_row(row as usize),
            Action::CursorPosition { row, col } => grid.move_to(row as usize, col as usize),
            Action::EraseInDisplay(mode) => grid.erase_display(mode),
            Action::EraseInLine(mode) => grid.erase_line(mode),
            Action::EraseChars(n) => grid.erase_chars(n as usize),
            Action::InsertChars(n) => grid.insert_chars(n as usize),
            Action::DeleteChars(n) => grid.delete_chars(n as usize),
            Action::InsertLines(n) => grid.insert_lines(n as usize),
            Action::DeleteLines(n) => grid.delete_lines(n as usize),
            Action::ScrollUp(n) => grid.scroll_up(n as usize),
            Action::ScrollDown(n) => grid.scroll_down(n as usize),
            Action::SetScrollRegion { top, bottom } => {
                grid.set_scroll_region(top as usize, bottom as usize)
            }
            Action::Sgr(params) => apply_sgr(grid, &params),
            Action::SetMode {
                params,
                enabled,
                private,
            } => self.apply_mode(&params, enabled, private),
            Action::SaveCursor => grid.save_cursor(),
            Action::RestoreCursor => grid.restore_cursor(),
            Action::Index => grid.line_feed(),
            Action::ReverseIndex => grid.reverse_line_feed(),
            Action::NextLine => {
                grid.line_feed();
                grid.carriage_return();
            }
            Action::FullReset => {
                grid.reset();
                self.title = None;
            }
            Action::SetTabStop => grid.set_tab_stop(),
            Action::ClearTabStop(mode) => grid.clear_tab_stop(mode),
            Action::BackTab(n) => grid.back_tab(n as usize),
            Action::SetTitle(title) => self.title = Some(title),
            Action::Unsupported(raw) => {
                self.unsupported += 1;
                debug!(
                    sequence = %String::from_utf8_lossy(&raw),
                    "ignoring unsupported control sequence"
                );
            }
        }
    }

    fn apply_mode(&mut self, params: &[u16], enabled: bool, private: bool) {
        for &param in params {
            match (private, param) {
                (true, 25) => self.grid.set_cursor_visible(enabled),
                // Alternate screen, mouse tracking, bracketed paste and the
                // rest have no pixel-level meaning here.
                _ => {
                    self.unsupported += 1;
                    debug!(param, private, enabled, "ignoring mode change");
                }
            }
        }
    }
}

/// Interpret an SGR parameter list against the grid's pen.
fn apply_sgr(grid: &mut Grid, params: &[u16]) {
    let pen = &mut grid.pen;
    let mut i = 0;
    while i < params.len() {
        let param = params[i];
        match param {
            0 => pen.reset(),
            1 => pen.flags |= AttrFlags::BOLD,
            2 => pen.flags |= AttrFlags::DIM,
            3 => pen.flags |= AttrFlags::ITALIC,
            4 => pen.flags |= AttrFlags::UNDERLINE,
            5 | 6 => pen.flags |= AttrFlags::BLINK,
            7 => pen.flags |= AttrFlags::INVERSE,
            8 => pen.flags |= AttrFlags::HIDDEN,
            21 | 22 => pen.flags &= !(AttrFlags::BOLD | AttrFlags::DIM),
            23 => pen.flags &= !AttrFlags::ITALIC,
            24 => pen.flags &= !AttrFlags::UNDERLINE,
            25 => pen.flags &= !AttrFlags::BLINK,
            27 => pen.flags &= !AttrFlags::INVERSE,
            28 => pen.flags &= !AttrFlags::HIDDEN,
            30..=37 => pen.fg = Color::Named((param - 30) as u8),
            38 => {
                if let Some((color, used)) = extended_color(&params[i + 1..]) {
                    pen.fg = color;
                    i += used;
                } else {
                    return; // malformed tail, drop the rest
                }
            }
            39 => pen.fg = Color::Default,
            40..=47 => pen.bg = Color::Named((param - 40) as u8),
            48 => {
                if let Some((color, used)) = extended_color(&params[i + 1..]) {
                    pen.bg = color;
                    i += used;
                } else {
                    return;
                }
            }
            49 => pen.bg = Color::Default,
            90..=97 => pen.fg = Color::Named((param - 90 + 8) as u8),
            100..=107 => pen.bg = Color::Named((param - 100 + 8) as u8),
            _ => {}
        }
        i += 1;
    }
}

/// Decode the `5;n` / `2;r;g;b` tail of SGR 38/48. Returns the color and
/// how many parameters it consumed.
fn extended_color(tail: &[u16]) -> Option<(Color, usize)> {
    match tail.first()? {
        5 => {
            let idx = *tail.get(1)?;
            (idx <= 255).then_some((Color::Indexed(idx as u8), 2))
        }
        2 => {
            let (r, g, b) = (*tail.get(1)?, *tail.get(2)?, *tail.get(3)?);
            (r <= 255 && g <= 255 && b <= 255)
                .then_some((Color::Rgb(r as u8, g as u8, b as u8), 4))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::types::Pen;

    fn screen() -> Screen {
        Screen::new(20, 5, 8, false)
    }

    fn row_text(snap: &Snapshot, row: usize) -> String {
        (0..snap.cols).map(|c| snap.cell(row, c).ch).collect()
    }

    #[test]
    fn plain_text_lands_on_grid() {
        let mut s = screen();
        s.feed(b"hello");
        assert_eq!(&row_text(&s.snapshot(), 0)[..5], "hello");
    }

    #[test]
    fn crlf_moves_to_next_line() {
        let mut s = screen();
        s.feed(b"one\r\ntwo");
        let snap = s.snapshot();
        assert_eq!(&row_text(&snap, 0)[..3], "one");
        assert_eq!(&row_text(&snap, 1)[..3], "two");
    }

    #[test]
    fn sgr_colors_apply_to_printed_cells() {
        let mut s = screen();
        s.feed(b"\x1b[31mred\x1b[0m plain");
        let snap = s.snapshot();
        assert_eq!(snap.cell(0, 0).pen.fg, Color::Named(1));
        assert_eq!(snap.cell(0, 4).pen.fg, Color::Default);
    }

    #[test]
    fn sgr_256_and_rgb_colors() {
        let mut s = screen();
        s.feed(b"\x1b[38;5;196mx\x1b[48;2;1;2;3my");
        let snap = s.snapshot();
        assert_eq!(snap.cell(0, 0).pen.fg, Color::Indexed(196));
        assert_eq!(snap.cell(0, 1).pen.bg, Color::Rgb(1, 2, 3));
    }

    #[test]
    fn sgr_bold_then_unbold() {
        let mut s = screen();
        s.feed(b"\x1b[1ma\x1b[22mb");
        let snap = s.snapshot();
        assert!(snap.cell(0, 0).pen.flags.contains(AttrFlags::BOLD));
        assert!(!snap.cell(0, 1).pen.flags.contains(AttrFlags::BOLD));
    }

    #[test]
    fn malformed_sgr_tail_is_dropped_not_fatal() {
        let mut s = screen();
        s.feed(b"\x1b[38;5mx");
        let snap = s.snapshot();
        // Color tail was malformed; the glyph still printed with an
        // unchanged pen.
        assert_eq!(snap.cell(0, 0).ch, 'x');
        assert_eq!(snap.cell(0, 0).pen, Pen::default());
    }

    #[test]
    fn cursor_addressing() {
        let mut s = screen();
        s.feed(b"\x1b[3;5HX");
        let snap = s.snapshot();
        assert_eq!(snap.cell(2, 4).ch, 'X');
    }

    #[test]
    fn clear_screen_blanks_everything() {
        let mut s = screen();
        s.feed(b"junk\x1b[2J\x1b[HY");
        let snap = s.snapshot();
        assert_eq!(snap.cell(0, 0).ch, 'Y');
        assert_eq!(snap.cell(0, 1).ch, ' ');
    }

    #[test]
    fn title_is_captured() {
        let mut s = screen();
        s.feed(b"\x1b]2;my session\x07");
        assert_eq!(s.title(), Some("my session"));
    }

    #[test]
    fn cursor_visibility_modes() {
        let mut s = screen();
        s.feed(b"\x1b[?25l");
        assert_eq!(s.snapshot().cursor, None);
        s.feed(b"\x1b[?25h");
        assert_eq!(s.snapshot().cursor, Some((0, 0)));
    }

    #[test]
    fn unsupported_sequences_are_counted_not_fatal() {
        let mut s = screen();
        s.feed(b"\x1b[?1049h\x1b[99qstill here");
        assert!(s.unsupported_count() >= 2);
        assert_eq!(&row_text(&s.snapshot(), 0)[..10], "still here");
    }

    #[test]
    fn mid_sequence_detection() {
        let mut s = screen();
        s.feed(b"\x1b[3");
        assert!(s.mid_sequence());
        s.feed(b"A");
        assert!(!s.mid_sequence());
    }

    #[test]
    fn chunk_split_mid_sequence_still_parses() {
        let mut s = screen();
        s.feed(b"\x1b[3;");
        s.feed(b"6H");
        s.feed(b"Z");
        assert_eq!(s.snapshot().cell(2, 5).ch, 'Z');
    }

    #[test]
    fn grid_dimensions_stay_constant() {
        let mut s = screen();
        s.feed(b"text\x1b[2Jmore\x1bc");
        let snap = s.snapshot();
        assert_eq!((snap.cols, snap.rows), (20, 5));
    }
}
