//! ttyrec parser.
//!
//! The ttyrec format is a bare sequence of records, each a 12-byte header of
//! little-endian `tv_sec`, `tv_usec`, `len` followed by `len` payload bytes.
//! Timestamps are wall-clock; they are rebased so the first record sits at
//! offset zero. The format carries no terminal geometry.

use std::time::Duration;

use crate::error::{Error, Result};

use super::{monotonic, Chunk, Recording};

const HEADER_LEN: usize = 12;

/// Guard against absurd length fields in corrupt files; a single record
/// larger than this cannot be a real terminal write.
const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

pub(super) fn parse(data: &[u8]) -> Result<Recording> {
    let mut chunks = Vec::new();
    let mut offset = 0usize;
    let mut base: Option<Duration> = None;
    let mut prev = Duration::ZERO;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < HEADER_LEN {
            return Err(Error::malformed(format!(
                "truncated ttyrec record header at byte {offset}: \
                 expected 12 bytes, found {}",
                rest.len()
            )));
        }

        let sec = read_u32(&rest[0..4]);
        let usec = read_u32(&rest[4..8]);
        let len = read_u32(&rest[8..12]);

        if usec >= 1_000_000 {
            return Err(Error::malformed(format!(
                "ttyrec record at byte {offset} has out-of-range microseconds {usec}"
            )));
        }
        if len > MAX_RECORD_LEN {
            return Err(Error::malformed(format!(
                "ttyrec record at byte {offset} claims {len} payload bytes"
            )));
        }

        let len = len as usize;
        let payload = rest
            .get(HEADER_LEN..HEADER_LEN + len)
            .ok_or_else(|| {
                Error::malformed(format!(
                    "truncated ttyrec payload at byte {offset}: \
                     expected {len} bytes, found {}",
                    rest.len() - HEADER_LEN
                ))
            })?;

        let stamp = Duration::new(u64::from(sec), usec * 1_000);
        let base = *base.get_or_insert(stamp);
        let time = monotonic(prev, stamp.saturating_sub(base));
        prev = time;

        chunks.push(Chunk {
            time,
            data: payload.to_vec(),
        });
        offset += HEADER_LEN + len;
    }

    Ok(Recording {
        cols: None,
        rows: None,
        title: None,
        chunks,
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
