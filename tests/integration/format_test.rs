//! Recording format tests through the public API.

use std::time::Duration;

use seqgif::recording::{load, Format};
use seqgif::Error;

fn ttyrec_record(sec: u32, usec: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&sec.to_le_bytes());
    out.extend_from_slice(&usec.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

#[test]
fn auto_detects_both_formats() {
    let cast = "{\"version\":2,\"width\":80,\"height\":24}\n[0.1,\"o\",\"hi\"]\n";
    let rec = load(cast.as_bytes(), Format::Auto).unwrap();
    assert_eq!(rec.cols, Some(80));
    assert_eq!(rec.chunks.len(), 1);

    let bin = ttyrec_record(5, 0, b"hi");
    let rec = load(&bin, Format::Auto).unwrap();
    assert_eq!(rec.cols, None);
    assert_eq!(rec.chunks[0].data, b"hi");
}

#[test]
fn explicit_format_overrides_detection() {
    // Valid ttyrec bytes, forced through the asciicast parser.
    let bin = ttyrec_record(0, 0, b"{}");
    let err = load(&bin, Format::Asciicast).unwrap_err();
    assert!(matches!(err, Error::MalformedRecording { .. }));
}

#[test]
fn ttyrec_times_rebase_to_session_start() {
    let mut bin = ttyrec_record(1000, 900_000, b"a");
    bin.extend(ttyrec_record(1001, 150_000, b"b"));

    let rec = load(&bin, Format::Ttyrec).unwrap();
    assert_eq!(rec.chunks[0].time, Duration::ZERO);
    assert_eq!(rec.chunks[1].time, Duration::from_millis(250));
}

#[test]
fn asciicast_v3_deltas_accumulate() {
    let cast = concat!(
        "{\"version\":3,\"term\":{\"cols\":9,\"rows\":4},\"title\":\"t\"}\n",
        "[1.0,\"o\",\"x\"]\n",
        "[0.5,\"m\",\"marker\"]\n",
        "[0.5,\"o\",\"y\"]\n",
    );
    let rec = load(cast.as_bytes(), Format::Auto).unwrap();
    assert_eq!(rec.title.as_deref(), Some("t"));
    assert_eq!(rec.chunks.len(), 2);
    assert_eq!(rec.chunks[0].time, Duration::from_secs(1));
    assert_eq!(rec.chunks[1].time, Duration::from_secs(2));
}

#[test]
fn malformed_header_reports_line_one() {
    let err = load(b"{\"version\":2,,}\n", Format::Auto).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("malformed recording"));
    assert!(msg.contains("line 1"));
}

#[test]
fn event_type_must_be_string() {
    let cast = concat!(
        "{\"version\":2,\"width\":4,\"height\":2}\n",
        "[0.1,7,\"data\"]\n",
    );
    let err = load(cast.as_bytes(), Format::Auto).unwrap_err();
    assert!(err.to_string().contains("line 2"));
}
