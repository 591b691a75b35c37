//! GIF-variant LZW compression.
//!
//! Variable code width starting at `min_code_size + 1`, clear and
//! end-of-information codes reserved above the palette range, dictionary
//! capped at 4096 codes and reset in place on overflow, LSB-first bit
//! packing. The code table is an arena of fixed arrays indexed by code
//! (first-child / next-sibling links), not a linked structure.

/// Hard dictionary bound fixed by the GIF format.
const TABLE_SIZE: usize = 4096;

/// Codes never grow past 12 bits.
const MAX_WIDTH: u32 = 12;

/// Compress a buffer of palette indices. Every index must be below
/// `1 << min_code_size`; the palette layer guarantees that.
pub fn compress(pixels: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let eoi = clear + 1;
    let mut width = u32::from(min_code_size) + 1;
    let mut table = Table::new(eoi);
    let mut bits = BitWriter::default();

    bits.write(clear, width);

    let Some((&first, rest)) = pixels.split_first() else {
        bits.write(eoi, width);
        return bits.finish();
    };

    let mut current = u16::from(first);
    for &k in rest {
        if let Some(code) = table.find(current, k) {
            current = code;
            continue;
        }

        bits.write(current, width);
        if table.is_full() {
            bits.write(clear, width);
            table.reset();
            width = u32::from(min_code_size) + 1;
        } else {
            table.add(current, k);
            if u32::from(table.next_code) == (1 << width) + 1 && width < MAX_WIDTH {
                width += 1;
            }
        }
        current = u16::from(k);
    }

    bits.write(current, width);
    bits.write(eoi, width);
    bits.finish()
}

/// Arena-backed code table. Each code's extensions hang off `first_child`
/// and chain through `next_sibling`; a reset only rewinds `next_code` and
/// clears the links.
struct Table {
    first_child: [i16; TABLE_SIZE],
    next_sibling: [i16; TABLE_SIZE],
    suffix: [u8; TABLE_SIZE],
    next_code: u16,
    base: u16,
}

impl Table {
    fn new(eoi: u16) -> Self {
        Self {
            first_child: [-1; TABLE_SIZE],
            next_sibling: [-1; TABLE_SIZE],
            suffix: [0; TABLE_SIZE],
            next_code: eoi + 1,
            base: eoi + 1,
        }
    }

    fn reset(&mut self) {
        self.first_child = [-1; TABLE_SIZE];
        self.next_sibling = [-1; TABLE_SIZE];
        self.next_code = self.base;
    }

    fn is_full(&self) -> bool {
        usize::from(self.next_code) == TABLE_SIZE
    }

    fn find(&self, prefix: u16, k: u8) -> Option<u16> {
        let mut child = self.first_child[usize::from(prefix)];
        while child >= 0 {
            let c = child as usize;
            if self.suffix[c] == k {
                return Some(child as u16);
            }
            child = self.next_sibling[c];
        }
        None
    }

    fn add(&mut self, prefix: u16, k: u8) {
        let code = usize::from(self.next_code);
        self.suffix[code] = k;
        self.next_sibling[code] = self.first_child[usize::from(prefix)];
        self.first_child[usize::from(prefix)] = code as i16;
        self.next_code += 1;
    }
}

/// LSB-first bit packer.
#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    filled: u32,
}

impl BitWriter {
    fn write(&mut self, code: u16, width: u32) {
        self.acc |= u32::from(code) << self.filled;
        self.filled += width;
        while self.filled >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.filled -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}
