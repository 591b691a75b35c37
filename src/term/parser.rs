//! VT/ANSI control sequence parser.
//!
//! A deterministic state machine over the output byte stream. States are
//! `Ground` (plain byte consumption, UTF-8 decoding), `Escape` (after ESC),
//! `Csi` (after `ESC [`), `Osc` (after `ESC ]`), and `Dcs` (after `ESC P`);
//! transitions are driven by the lead-in byte and terminated by a final byte
//! per the respective grammar. The parser never fails: anything it does not
//! understand is consumed whole and surfaced as [`Action::Unsupported`] so
//! the screen can log it and move on.

/// Upper bound on retained CSI parameters; further ones are dropped.
const MAX_PARAMS: usize = 32;

/// Upper bound on buffered OSC payload bytes.
const MAX_OSC: usize = 1024;

/// Parsed actions handed to the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write a character at the cursor.
    Print(char),
    /// Backspace (`\x08`).
    Backspace,
    /// Horizontal tab (`\t`).
    Tab,
    /// Line feed (`\n`, also VT and FF).
    LineFeed,
    /// Carriage return (`\r`).
    CarriageReturn,
    /// CUU/CUD/CUF/CUB with their counts.
    CursorUp(u16),
    CursorDown(u16),
    CursorRight(u16),
    CursorLeft(u16),
    /// CNL/CPL: vertical move plus column 0.
    CursorNextLine(u16),
    CursorPrevLine(u16),
    /// CHA/HPA: absolute column, 0-indexed.
    CursorColumn(u16),
    /// VPA: absolute row, 0-indexed.
    CursorRow(u16),
    /// CUP/HVP: absolute position, 0-indexed.
    CursorPosition { row: u16, col: u16 },
    /// ED: 0 = cursor to end, 1 = start to cursor, 2 = all.
    EraseInDisplay(u8),
    /// EL: 0 = cursor to end, 1 = start to cursor, 2 = line.
    EraseInLine(u8),
    /// ECH/ICH/DCH at the cursor.
    EraseChars(u16),
    InsertChars(u16),
    DeleteChars(u16),
    /// IL/DL at the cursor row, inside the scroll region.
    InsertLines(u16),
    DeleteLines(u16),
    /// SU/SD over the scroll region.
    ScrollUp(u16),
    ScrollDown(u16),
    /// DECSTBM. `top` is 0-indexed; `bottom` is the raw 1-based inclusive
    /// parameter, 0 meaning "bottom of the grid".
    SetScrollRegion { top: u16, bottom: u16 },
    /// SGR parameter list, uninterpreted.
    Sgr(Vec<u16>),
    /// SM/RM and DECSET/DECRST.
    SetMode {
        params: Vec<u16>,
        enabled: bool,
        private: bool,
    },
    /// DECSC / DECRC (also ANSI.SYS `CSI s` / `CSI u`).
    SaveCursor,
    RestoreCursor,
    /// IND, RI, NEL.
    Index,
    ReverseIndex,
    NextLine,
    /// RIS.
    FullReset,
    /// HTS, TBC, CBT.
    SetTabStop,
    ClearTabStop(u16),
    BackTab(u16),
    /// OSC 0/2 title.
    SetTitle(String),
    /// A consumed sequence the emulator does not model. Carries the raw
    /// bytes (without the leading ESC) for logging.
    Unsupported(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    /// Mid UTF-8 multi-byte character.
    Utf8,
    Escape,
    Csi,
    Osc,
    /// Saw ESC inside an OSC payload; `\` completes the terminator.
    OscEsc,
    Dcs,
    DcsEsc,
}

/// The control sequence state machine.
#[derive(Debug)]
pub struct Parser {
    state: State,
    buf: Vec<u8>,
    params: Vec<u16>,
    param: u16,
    intermediates: Vec<u8>,
    private: bool,
    osc: Vec<u8>,
    utf8: [u8; 4],
    utf8_len: usize,
    utf8_need: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            buf: Vec::new(),
            params: Vec::new(),
            param: 0,
            intermediates: Vec::new(),
            private: false,
            osc: Vec::new(),
            utf8: [0; 4],
            utf8_len: 0,
            utf8_need: 0,
        }
    }

    /// Whether the parser sits between sequences. Snapshots are only taken
    /// while this holds, so a frame never reflects a torn escape sequence.
    pub fn is_ground(&self) -> bool {
        self.state == State::Ground
    }

    /// Consume one byte, appending any completed actions to `out`.
    pub fn advance(&mut self, byte: u8, out: &mut Vec<Action>) {
        // CAN and SUB abort any in-flight sequence.
        if !matches!(self.state, State::Ground | State::Utf8)
            && (byte == 0x18 || byte == 0x1A)
        {
            out.push(Action::Unsupported(std::mem::take(&mut self.buf)));
            self.enter_ground();
            return;
        }

        match self.state {
            State::Ground => self.ground(byte, out),
            State::Utf8 => self.utf8_continuation(byte, out),
            State::Escape => self.escape(byte, out),
            State::Csi => self.csi(byte, out),
            State::Osc => self.osc(byte, out),
            State::OscEsc => self.osc_esc(byte, out),
            State::Dcs => self.dcs(byte),
            State::DcsEsc => self.dcs_esc(byte, out),
        }
    }

    fn enter_ground(&mut self) {
        self.state = State::Ground;
        self.buf.clear();
        self.params.clear();
        self.param = 0;
        self.intermediates.clear();
        self.private = false;
        self.osc.clear();
    }

    fn enter_escape(&mut self) {
        self.enter_ground();
        self.state = State::Escape;
    }

    fn ground(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x1B => self.enter_escape(),
            0x08 => out.push(Action::Backspace),
            0x09 => out.push(Action::Tab),
            0x0A | 0x0B | 0x0C => out.push(Action::LineFeed),
            0x0D => out.push(Action::CarriageReturn),
            0x00..=0x1F | 0x7F => {} // BEL, SO/SI and friends: ignored
            0x20..=0x7E => out.push(Action::Print(byte as char)),
            _ => self.utf8_lead(byte, out),
        }
    }

    fn utf8_lead(&mut self, byte: u8, out: &mut Vec<Action>) {
        let need = match byte {
            0xC2..=0xDF => 1,
            0xE0..=0xEF => 2,
            0xF0..=0xF4 => 3,
            // Stray continuation or invalid lead byte.
            _ => {
                out.push(Action::Print(char::REPLACEMENT_CHARACTER));
                return;
            }
        };
        self.utf8[0] = byte;
        self.utf8_len = 1;
        self.utf8_need = need;
        self.state = State::Utf8;
    }

    fn utf8_continuation(&mut self, byte: u8, out: &mut Vec<Action>) {
        if (0x80..=0xBF).contains(&byte) {
            self.utf8[self.utf8_len] = byte;
            self.utf8_len += 1;
            if self.utf8_len == self.utf8_need + 1 {
                let ch = std::str::from_utf8(&self.utf8[..self.utf8_len])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                out.push(Action::Print(ch));
                self.state = State::Ground;
            }
            return;
        }

        // Broken sequence: emit a replacement, then reprocess the byte
        // from ground state.
        out.push(Action::Print(char::REPLACEMENT_CHARACTER));
        self.state = State::Ground;
        self.ground(byte, out);
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            b'[' => self.state = State::Csi,
            b']' => self.state = State::Osc,
            b'P' => self.state = State::Dcs,
            0x20..=0x2F => {
                // Intermediate (charset designation etc.); final byte follows.
                self.intermediates.push(byte);
                self.buf.push(byte);
            }
            0x30..=0x7E => {
                let action = if self.intermediates.is_empty() {
                    self.escape_final(byte)
                } else {
                    self.buf.push(byte);
                    Some(Action::Unsupported(std::mem::take(&mut self.buf)))
                };
                self.enter_ground();
                if let Some(action) = action {
                    out.push(action);
                }
            }
            0x1B => self.enter_escape(),
            _ => {
                self.buf.push(byte);
                out.push(Action::Unsupported(std::mem::take(&mut self.buf)));
                self.enter_ground();
            }
        }
    }

    fn escape_final(&mut self, byte: u8) -> Option<Action> {
        match byte {
            b'7' => Some(Action::SaveCursor),
            b'8' => Some(Action::RestoreCursor),
            b'D' => Some(Action::Index),
            b'M' => Some(Action::ReverseIndex),
            b'E' => Some(Action::NextLine),
            b'H' => Some(Action::SetTabStop),
            b'c' => Some(Action::FullReset),
            // Keypad modes and ST: consumed without effect on the grid.
            b'=' | b'>' | b'\\' => None,
            _ => Some(Action::Unsupported(vec![byte])),
        }
    }

    fn csi(&mut self, byte: u8, out: &mut Vec<Action>) {
        self.buf.push(byte);
        match byte {
            b'0'..=b'9' => {
                self.param = self
                    .param
                    .saturating_mul(10)
                    .saturating_add(u16::from(byte - b'0'));
            }
            // Colon sub-parameters are folded into the flat list; the SGR
            // interpreter accepts either separator.
            b';' | b':' => self.push_param(),
            0x20..=0x2F => self.intermediates.push(byte),
            // '?' and the other private markers '<' '=' '>'
            0x3C..=0x3F => self.private = true,
            0x40..=0x7E => {
                self.push_param();
                let action = self.csi_dispatch(byte);
                self.enter_ground();
                out.push(action);
            }
            0x1B => {
                out.push(Action::Unsupported(std::mem::take(&mut self.buf)));
                self.enter_escape();
            }
            // C0 controls and anything else inside a CSI: ignored.
            _ => {}
        }
    }

    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.param);
        }
        self.param = 0;
    }

    /// Parameter `i`, with CSI defaulting rules (absent or 0 become
    /// `default`).
    fn param_or(&self, i: usize, default: u16) -> u16 {
        match self.params.get(i) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    /// Parameter `i` taken literally, absent meaning 0.
    fn param_raw(&self, i: usize) -> u16 {
        self.params.get(i).copied().unwrap_or(0)
    }

    fn csi_dispatch(&mut self, final_byte: u8) -> Action {
        if !self.intermediates.is_empty() {
            return Action::Unsupported(std::mem::take(&mut self.buf));
        }
        if self.private {
            return match final_byte {
                b'h' | b'l' => Action::SetMode {
                    params: std::mem::take(&mut self.params),
                    enabled: final_byte == b'h',
                    private: true,
                },
                _ => Action::Unsupported(std::mem::take(&mut self.buf)),
            };
        }

        match final_byte {
            b'A' => Action::CursorUp(self.param_or(0, 1)),
            b'B' => Action::CursorDown(self.param_or(0, 1)),
            b'C' => Action::CursorRight(self.param_or(0, 1)),
            b'D' => Action::CursorLeft(self.param_or(0, 1)),
            b'E' => Action::CursorNextLine(self.param_or(0, 1)),
            b'F' => Action::CursorPrevLine(self.param_or(0, 1)),
            b'G' | b'`' => Action::CursorColumn(self.param_or(0, 1) - 1),
            b'd' => Action::CursorRow(self.param_or(0, 1) - 1),
            b'H' | b'f' => Action::CursorPosition {
                row: self.param_or(0, 1) - 1,
                col: self.param_or(1, 1) - 1,
            },
            b'J' => Action::EraseInDisplay(erase_mode(self.param_raw(0))),
            b'K' => Action::EraseInLine(erase_mode(self.param_raw(0))),
            b'X' => Action::EraseChars(self.param_or(0, 1)),
            b'@' => Action::InsertChars(self.param_or(0, 1)),
            b'P' => Action::DeleteChars(self.param_or(0, 1)),
            b'L' => Action::InsertLines(self.param_or(0, 1)),
            b'M' => Action::DeleteLines(self.param_or(0, 1)),
            b'S' => Action::ScrollUp(self.param_or(0, 1)),
            b'T' => Action::ScrollDown(self.param_or(0, 1)),
            b'Z' => Action::BackTab(self.param_or(0, 1)),
            b'r' => Action::SetScrollRegion {
                top: self.param_or(0, 1) - 1,
                bottom: self.param_raw(1),
            },
            b'm' => Action::Sgr(std::mem::take(&mut self.params)),
            b'h' | b'l' => Action::SetMode {
                params: std::mem::take(&mut self.params),
                enabled: final_byte == b'h',
                private: false,
            },
            b's' => Action::SaveCursor,
            b'u' => Action::RestoreCursor,
            b'g' => Action::ClearTabStop(self.param_raw(0)),
            _ => Action::Unsupported(std::mem::take(&mut self.buf)),
        }
    }

    fn osc(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x07 => {
                let action = self.osc_dispatch();
                self.enter_ground();
                out.push(action);
            }
            0x1B => self.state = State::OscEsc,
            _ => {
                if self.osc.len() < MAX_OSC {
                    self.osc.push(byte);
                }
            }
        }
    }

    fn osc_esc(&mut self, byte: u8, out: &mut Vec<Action>) {
        if byte == b'\\' {
            let action = self.osc_dispatch();
            self.enter_ground();
            out.push(action);
        } else {
            // A lone ESC aborts the OSC and starts a fresh sequence.
            out.push(Action::Unsupported(std::mem::take(&mut self.osc)));
            self.enter_escape();
            self.escape(byte, out);
        }
    }

    fn osc_dispatch(&mut self) -> Action {
        let payload = std::mem::take(&mut self.osc);
        let text = String::from_utf8_lossy(&payload);
        if let Some(("0" | "2", title)) = text.split_once(';') {
            return Action::SetTitle(title.to_string());
        }
        drop(text);
        Action::Unsupported(payload)
    }

    fn dcs(&mut self, byte: u8) {
        if byte == 0x1B {
            self.state = State::DcsEsc;
        }
        // Payload bytes are swallowed; the emulator draws nothing from DCS.
    }

    fn dcs_esc(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            b'\\' => {
                out.push(Action::Unsupported(b"P...".to_vec()));
                self.enter_ground();
            }
            0x1B => {} // stay armed for the ST
            _ => self.state = State::Dcs,
        }
    }
}

/// ED/EL parameter: 3 (xterm "scrollback") behaves like 2, anything larger
/// is clamped to a full clear.
fn erase_mode(param: u16) -> u8 {
    match param {
        0 | 1 | 2 => param as u8,
        _ => 2,
    }
}
