//! CLI tests for the seqgif binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn seqgif() -> Command {
    Command::cargo_bin("seqgif").unwrap()
}

fn ttyrec_record(sec: u32, usec: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&sec.to_le_bytes());
    out.extend_from_slice(&usec.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

#[test]
fn converts_ttyrec_from_stdin_to_stdout() {
    let mut input = ttyrec_record(0, 0, b"hello");
    input.extend(ttyrec_record(0, 500_000, b" world"));

    let output = seqgif()
        .args(["-w", "20", "-h", "4"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(&output[..6], b"GIF89a");
    assert_eq!(*output.last().unwrap(), 0x3B);
}

#[test]
fn converts_asciicast_file_to_gif_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("session.cast");
    let output = dir.path().join("session.gif");
    std::fs::write(
        &input,
        concat!(
            "{\"version\":2,\"width\":10,\"height\":3}\n",
            "[0.0,\"o\",\"$ ls\\r\\n\"]\n",
            "[0.4,\"o\",\"a.txt\\r\\n\"]\n",
        ),
    )
    .unwrap();

    seqgif()
        .args(["-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .success();

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
    // Geometry from the asciicast header.
    assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 10);
    assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 3);
}

#[test]
fn malformed_recording_fails_without_creating_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.cast");
    let output = dir.path().join("out.gif");
    // Header is fine, second event is missing its timestamp.
    std::fs::write(
        &input,
        concat!(
            "{\"version\":2,\"width\":10,\"height\":3}\n",
            "[\"o\",\"no time\"]\n",
        ),
    )
    .unwrap();

    seqgif()
        .args(["-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed recording"));

    assert!(!output.exists());
}

#[test]
fn truncated_ttyrec_is_rejected() {
    let input = ttyrec_record(0, 0, b"data")[..10].to_vec();

    seqgif()
        .write_stdin(input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("truncated"));
}

#[test]
fn empty_stdin_produces_minimal_gif() {
    let output = seqgif()
        .args(["-w", "4", "-h", "2"])
        .write_stdin(Vec::<u8>::new())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(&output[..6], b"GIF89a");
}

#[test]
fn height_short_flag_is_not_help() {
    let mut input = ttyrec_record(0, 0, b"x");
    input.extend(ttyrec_record(1, 0, b"y"));

    let output = seqgif()
        .args(["-h", "6", "-w", "12"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(u16::from_le_bytes([output[6], output[7]]), 12);
    assert_eq!(u16::from_le_bytes([output[8], output[9]]), 6);
}

#[test]
fn help_flag_shows_usage() {
    seqgif()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--last-frame-delay"));
}

#[test]
fn rejects_unknown_format() {
    seqgif()
        .args(["--format", "png"])
        .write_stdin(Vec::<u8>::new())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn no_loop_omits_netscape_extension() {
    let input = ttyrec_record(0, 0, b"x");

    let with_loop = seqgif()
        .write_stdin(input.clone())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let without = seqgif()
        .arg("--no-loop")
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let has_netscape =
        |bytes: &[u8]| bytes.windows(11).any(|w| w == b"NETSCAPE2.0");
    assert!(has_netscape(&with_loop));
    assert!(!has_netscape(&without));
}
