//! The screen grid: a fixed-size 2D array of cells plus cursor state.
//!
//! Owned exclusively by the emulator; dimensions never change for the
//! lifetime of one recording. Printing honors VT100 deferred wrap (the
//! cursor parks on the last column until the next glyph) and scrolls the
//! active region up when a line feed runs off its bottom.

use unicode_width::UnicodeWidthChar;

use super::types::{AttrFlags, Cell, Pen};

/// Cursor position plus the deferred-wrap latch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pending_wrap: bool,
}

#[derive(Debug, Clone, Copy)]
struct SavedCursor {
    row: usize,
    col: usize,
    pen: Pen,
}

/// An immutable copy of the grid at one point in time.
///
/// Ownership transfers to the differencer once produced; the cursor is
/// included when visible because it is drawn into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub cols: usize,
    pub rows: usize,
    cells: Vec<Cell>,
    pub cursor: Option<(usize, usize)>,
}

impl Snapshot {
    /// A blank grid, used as the predecessor of the first real snapshot.
    pub fn blank(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols * rows],
            cursor: None,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row * self.cols + col]
    }
}

/// The mutable screen grid.
#[derive(Debug)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
    pub cursor: Cursor,
    saved: Option<SavedCursor>,
    pub pen: Pen,
    /// Scroll region rows, `top` inclusive, `bottom` exclusive.
    scroll_top: usize,
    scroll_bottom: usize,
    tabs: Vec<bool>,
    tab_width: usize,
    cursor_visible: bool,
    cjk_width: bool,
}

impl Grid {
    pub fn new(cols: usize, rows: usize, tab_width: usize, cjk_width: bool) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols * rows],
            cursor: Cursor::default(),
            saved: None,
            pen: Pen::default(),
            scroll_top: 0,
            scroll_bottom: rows,
            tabs: default_tabs(cols, tab_width),
            tab_width,
            cursor_visible: true,
            cjk_width,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cols: self.cols,
            rows: self.rows,
            cells: self.cells.clone(),
            cursor: self
                .cursor_visible
                .then_some((self.cursor.row, self.cursor.col)),
        }
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row * self.cols + col]
    }

    // ── printing ──────────────────────────────────────────────────────

    pub fn print(&mut self, ch: char) {
        let width = if self.cjk_width {
            ch.width_cjk()
        } else {
            ch.width()
        };
        let width = match width {
            // Zero-width (combining marks): not modeled, dropped.
            None | Some(0) => return,
            Some(w) => w.min(2),
        };

        if self.cursor.pending_wrap {
            self.carriage_return();
            self.line_feed();
        }
        if width == 2 && self.cursor.col + 2 > self.cols {
            // Wide glyph does not fit: blank the stub column and wrap now.
            let bg = self.pen.bg;
            let i = self.idx(self.cursor.row, self.cursor.col);
            self.cells[i] = Cell::erased(bg);
            self.carriage_return();
            self.line_feed();
        }

        let (row, col) = (self.cursor.row, self.cursor.col);
        let i = self.idx(row, col);
        self.cells[i] = Cell {
            ch,
            width: width as u8,
            pen: self.pen,
        };
        if width == 2 {
            let mut cont = Cell {
                ch: ' ',
                width: 0,
                pen: self.pen,
            };
            cont.pen.flags |= AttrFlags::WIDE_CONTINUATION;
            self.cells[i + 1] = cont;
        }

        if col + width >= self.cols {
            self.cursor.col = self.cols - 1;
            self.cursor.pending_wrap = true;
        } else {
            self.cursor.col = col + width;
        }
    }

    // ── cursor motion ─────────────────────────────────────────────────

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn line_feed(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row + 1 == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        }
    }

    pub fn reverse_line_feed(&mut self) {
        self.cursor.pending_wrap = false;
        if self.cursor.row == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor.pending_wrap {
            self.cursor.pending_wrap = false;
        } else if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
    }

    pub fn tab(&mut self) {
        let mut col = self.cursor.col;
        while col + 1 < self.cols {
            col += 1;
            if self.tabs[col] {
                break;
            }
        }
        self.cursor.col = col;
    }

    pub fn back_tab(&mut self, count: usize) {
        for _ in 0..count {
            let mut col = self.cursor.col;
            while col > 0 {
                col -= 1;
                if self.tabs[col] {
                    break;
                }
            }
            self.cursor.col = col;
        }
        self.cursor.pending_wrap = false;
    }

    pub fn move_up(&mut self, count: usize) {
        self.cursor.row = self.cursor.row.saturating_sub(count);
        self.cursor.pending_wrap = false;
    }

    pub fn move_down(&mut self, count: usize) {
        self.cursor.row = (self.cursor.row + count).min(self.rows - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn move_left(&mut self, count: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(count);
        self.cursor.pending_wrap = false;
    }

    pub fn move_right(&mut self, count: usize) {
        self.cursor.col = (self.cursor.col + count).min(self.cols - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn move_to(&mut self, row: usize, col: usize) {
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.col = col.min(self.cols - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn move_to_col(&mut self, col: usize) {
        self.cursor.col = col.min(self.cols - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn move_to_row(&mut self, row: usize) {
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.pending_wrap = false;
    }

    pub fn save_cursor(&mut self) {
        self.saved = Some(SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            pen: self.pen,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved {
            self.cursor.row = saved.row.min(self.rows - 1);
            self.cursor.col = saved.col.min(self.cols - 1);
            self.cursor.pending_wrap = false;
            self.pen = saved.pen;
        }
    }

    // ── erase / edit ──────────────────────────────────────────────────

    fn blank(&self) -> Cell {
        Cell::erased(self.pen.bg)
    }

    fn fill_row(&mut self, row: usize, cell: Cell) {
        let start = self.idx(row, 0);
        self.cells[start..start + self.cols].fill(cell);
    }

    pub fn erase_display(&mut self, mode: u8) {
        match mode {
            0 => {
                self.erase_line(0);
                let blank = self.blank();
                for row in self.cursor.row + 1..self.rows {
                    self.fill_row(row, blank);
                }
            }
            1 => {
                self.erase_line(1);
                let blank = self.blank();
                for row in 0..self.cursor.row {
                    self.fill_row(row, blank);
                }
            }
            _ => {
                let blank = self.blank();
                self.cells.fill(blank);
            }
        }
    }

    pub fn erase_line(&mut self, mode: u8) {
        let blank = self.blank();
        let row = self.cursor.row;
        let range = match mode {
            0 => self.cursor.col..self.cols,
            1 => 0..self.cursor.col + 1,
            _ => 0..self.cols,
        };
        for col in range {
            let i = self.idx(row, col);
            self.cells[i] = blank;
        }
    }

    pub fn erase_chars(&mut self, count: usize) {
        let blank = self.blank();
        let row = self.cursor.row;
        let end = (self.cursor.col + count).min(self.cols);
        for col in self.cursor.col..end {
            let i = self.idx(row, col);
            self.cells[i] = blank;
        }
    }

    pub fn insert_chars(&mut self, count: usize) {
        let blank = self.blank();
        let row = self.cursor.row;
        let col = self.cursor.col;
        let count = count.min(self.cols - col);
        let start = self.idx(row, col);
        let end = self.idx(row, self.cols);
        self.cells[start..end].rotate_right(count);
        for i in start..start + count {
            self.cells[i] = blank;
        }
    }

    pub fn delete_chars(&mut self, count: usize) {
        let blank = self.blank();
        let row = self.cursor.row;
        let col = self.cursor.col;
        let count = count.min(self.cols - col);
        let start = self.idx(row, col);
        let end = self.idx(row, self.cols);
        self.cells[start..end].rotate_left(count);
        for i in end - count..end {
            self.cells[i] = blank;
        }
    }

    // ── scrolling ─────────────────────────────────────────────────────

    pub fn set_scroll_region(&mut self, top: usize, bottom_raw: usize) {
        let bottom = if bottom_raw == 0 || bottom_raw > self.rows {
            self.rows
        } else {
            bottom_raw
        };
        // DECSTBM requires a region of at least two rows.
        if top + 2 <= bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        } else {
            self.scroll_top = 0;
            self.scroll_bottom = self.rows;
        }
        self.move_to(0, 0);
    }

    pub fn scroll_up(&mut self, count: usize) {
        let region = self.scroll_bottom - self.scroll_top;
        let count = count.min(region);
        let blank = self.blank();
        let start = self.idx(self.scroll_top, 0);
        let end = self.idx(self.scroll_bottom - 1, self.cols - 1) + 1;
        self.cells[start..end].rotate_left(count * self.cols);
        let first_blank = self.idx(self.scroll_bottom - count, 0);
        for i in first_blank..end {
            self.cells[i] = blank;
        }
    }

    pub fn scroll_down(&mut self, count: usize) {
        let region = self.scroll_bottom - self.scroll_top;
        let count = count.min(region);
        let blank = self.blank();
        let start = self.idx(self.scroll_top, 0);
        let end = self.idx(self.scroll_bottom - 1, self.cols - 1) + 1;
        self.cells[start..end].rotate_right(count * self.cols);
        let last_blank = self.idx(self.scroll_top + count, 0);
        for i in start..last_blank {
            self.cells[i] = blank;
        }
    }

    pub fn insert_lines(&mut self, count: usize) {
        if !self.in_scroll_region() {
            return;
        }
        let saved_top = self.scroll_top;
        self.scroll_top = self.cursor.row;
        self.scroll_down(count);
        self.scroll_top = saved_top;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn delete_lines(&mut self, count: usize) {
        if !self.in_scroll_region() {
            return;
        }
        let saved_top = self.scroll_top;
        self.scroll_top = self.cursor.row;
        self.scroll_up(count);
        self.scroll_top = saved_top;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    fn in_scroll_region(&self) -> bool {
        (self.scroll_top..self.scroll_bottom).contains(&self.cursor.row)
    }

    // ── tabs / modes / reset ──────────────────────────────────────────

    pub fn set_tab_stop(&mut self) {
        self.tabs[self.cursor.col] = true;
    }

    pub fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => self.tabs[self.cursor.col] = false,
            3 => self.tabs.fill(false),
            _ => {}
        }
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn reset(&mut self) {
        let (cols, rows) = (self.cols, self.rows);
        let (tab_width, cjk) = (self.tab_width, self.cjk_width);
        *self = Grid::new(cols, rows, tab_width, cjk);
    }
}

fn default_tabs(cols: usize, tab_width: usize) -> Vec<bool> {
    let mut tabs = vec![false; cols];
    if tab_width > 0 {
        for (i, tab) in tabs.iter_mut().enumerate() {
            *tab = i % tab_width == 0 && i > 0;
        }
    }
    tabs
}
