//! Palette construction and color quantization.
//!
//! A [`Palette`] is an ordered set of up to 256 colors with a deterministic
//! color-to-index assignment: colors keep their first-seen order, so the
//! same input always produces the same table and byte-identical output.
//! When a stream holds more distinct colors than the configured bound, the
//! set is reduced by median cut and pixels map to their nearest surviving
//! entry by weighted RGB distance.

use std::collections::{HashMap, HashSet};

use rgb::RGB8;
use tracing::debug;

/// An indexed color table for one frame or one whole stream.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<RGB8>,
    index: HashMap<u32, u8>,
}

impl Palette {
    /// Build a palette from a stream of pixel colors, bounding it at
    /// `max_colors` entries (2..=256).
    pub fn build(pixels: impl IntoIterator<Item = RGB8>, max_colors: usize) -> Self {
        let mut distinct = Vec::new();
        let mut seen = HashSet::new();
        for color in pixels {
            if seen.insert(pack(color)) {
                distinct.push(color);
            }
        }
        if distinct.is_empty() {
            distinct.push(RGB8::new(0, 0, 0));
        }

        let colors = if distinct.len() > max_colors {
            debug!(
                distinct = distinct.len(),
                max = max_colors,
                "palette overflow, reducing by median cut"
            );
            median_cut(&distinct, max_colors)
        } else {
            distinct
        };

        let index = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| (pack(c), i as u8))
            .collect();
        Self { colors, index }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[RGB8] {
        &self.colors
    }

    /// Index of `color`, exact when the color survived into the table,
    /// otherwise its nearest entry. The mapping is memoized.
    pub fn map(&mut self, color: RGB8) -> u8 {
        let key = pack(color);
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = nearest(&self.colors, color);
        self.index.insert(key, i);
        i
    }

    /// Number of index bits the GIF color table needs: the smallest power
    /// of two holding every entry, at least 2 entries.
    pub fn table_bits(&self) -> u8 {
        let mut bits = 1u8;
        while (1usize << bits) < self.colors.len() {
            bits += 1;
        }
        bits
    }

    /// LZW minimum code size for this palette.
    pub fn min_code_size(&self) -> u8 {
        self.table_bits().max(2)
    }
}

fn pack(c: RGB8) -> u32 {
    (u32::from(c.r) << 16) | (u32::from(c.g) << 8) | u32::from(c.b)
}

/// Weighted Euclidean distance, squared. Green dominates perception,
/// blue the least.
fn distance(a: RGB8, b: RGB8) -> u32 {
    let dr = i32::from(a.r) - i32::from(b.r);
    let dg = i32::from(a.g) - i32::from(b.g);
    let db = i32::from(a.b) - i32::from(b.b);
    (2 * dr * dr + 4 * dg * dg + 3 * db * db) as u32
}

fn nearest(colors: &[RGB8], target: RGB8) -> u8 {
    let mut best = 0usize;
    let mut best_distance = u32::MAX;
    for (i, &c) in colors.iter().enumerate() {
        let d = distance(c, target);
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best as u8
}

/// Median-cut reduction: split the box with the widest channel range at its
/// median until `max` boxes exist, then average each box.
fn median_cut(colors: &[RGB8], max: usize) -> Vec<RGB8> {
    let mut boxes: Vec<Vec<RGB8>> = vec![colors.to_vec()];

    while boxes.len() < max {
        // Widest box first; ties resolved by position for determinism.
        let widest = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.len() > 1)
            .max_by_key(|(i, b)| (box_spread(b), usize::MAX - i))
            .map(|(i, _)| i);

        let Some(i) = widest else {
            break; // every box is a single color
        };

        let mut colors = boxes.swap_remove(i);
        let channel = widest_channel(&colors);
        colors.sort_by_key(|c| (channel_value(*c, channel), pack(*c)));
        let right = colors.split_off(colors.len() / 2);
        boxes.push(colors);
        boxes.push(right);
    }

    // swap_remove scrambles box order; re-sort for a stable table.
    let mut out: Vec<RGB8> = boxes.iter().map(|b| box_average(b)).collect();
    out.sort_by_key(|&c| pack(c));
    out.dedup();
    out
}

fn channel_value(c: RGB8, channel: usize) -> u8 {
    match channel {
        0 => c.r,
        1 => c.g,
        _ => c.b,
    }
}

fn channel_range(colors: &[RGB8], channel: usize) -> u8 {
    let mut min = u8::MAX;
    let mut max = 0;
    for &c in colors {
        let v = channel_value(c, channel);
        min = min.min(v);
        max = max.max(v);
    }
    max - min
}

fn widest_channel(colors: &[RGB8]) -> usize {
    let ranges = [
        channel_range(colors, 0),
        channel_range(colors, 1),
        channel_range(colors, 2),
    ];
    // Green wins ties, then red, then blue.
    if ranges[1] >= ranges[0] && ranges[1] >= ranges[2] {
        1
    } else if ranges[0] >= ranges[2] {
        0
    } else {
        2
    }
}

fn box_spread(colors: &[RGB8]) -> u8 {
    (0..3)
        .map(|ch| channel_range(colors, ch))
        .max()
        .unwrap_or(0)
}

fn box_average(colors: &[RGB8]) -> RGB8 {
    let n = colors.len() as u32;
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
    for &c in colors {
        r += u32::from(c.r);
        g += u32::from(c.g);
        b += u32::from(c.b);
    }
    RGB8::new(((r + n / 2) / n) as u8, ((g + n / 2) / n) as u8, ((b + n / 2) / n) as u8)
}
