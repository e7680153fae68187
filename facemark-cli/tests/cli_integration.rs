//! CLI integration tests for facemark-cli.
//!
//! These tests verify the CLI behavior by running the actual binary
//! and checking outputs, exit codes, and file artifacts.

use assert_cmd::Command;
use facemark_core::{FrameSequence, VideoInfo, VideoSink};
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the facemark binary.
fn facemark() -> Command {
    Command::cargo_bin("facemark").unwrap()
}

/// Write a short synthetic talking-head video as a frame sequence.
fn write_video(dir: &Path, frames: u32) {
    let mut sink = FrameSequence::create(dir, VideoInfo::new(128, 128, 25.0)).unwrap();
    for t in 0..frames {
        let frame = RgbImage::from_fn(128, 128, |x, y| {
            let dx = x as i32 - 64 - (t as i32 % 4);
            let dy = y as i32 - 64;
            if dx * dx + dy * dy < 26 * 26 {
                Rgb([210u8.saturating_sub((dy.unsigned_abs() * 2) as u8), 150, 120])
            } else {
                Rgb([(x * 2) as u8, 40, (y * 2) as u8])
            }
        });
        sink.write_frame(&frame).unwrap();
    }
    sink.finish().unwrap();
}

/// Write a tall, narrow video whose carrier block has only 320 pixels.
fn write_narrow_video(dir: &Path, frames: u32) {
    let mut sink = FrameSequence::create(dir, VideoInfo::new(10, 200, 25.0)).unwrap();
    for t in 0..frames {
        let frame = RgbImage::from_fn(10, 200, |x, y| {
            let v = ((x * 13 + y * 3 + t * 7) % 256) as u8;
            Rgb([v, 255 - v, v / 3])
        });
        sink.write_frame(&frame).unwrap();
    }
    sink.finish().unwrap();
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    facemark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Video-derived identities and signature watermarks",
        ))
        .stdout(predicate::str::contains("identity"))
        .stdout(predicate::str::contains("sign"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_version_displays_version() {
    facemark()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("facemark"));
}

#[test]
fn test_help_shows_exit_codes() {
    facemark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_sign_help_shows_options() {
    facemark()
        .args(["sign", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--public-key"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--face"));
}

#[test]
fn test_verify_help_shows_options() {
    facemark()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VIDEO"))
        .stdout(predicate::str::contains("--public-key"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_missing_video_returns_input_error() {
    // Exit code 66 = EX_NOINPUT
    facemark()
        .args(["identity", "nonexistent_video"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read video"));
}

#[test]
fn test_missing_public_key_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    facemark()
        .args(["verify", path_str(&video)])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read public key"));
}

#[test]
fn test_invalid_public_key_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    let key = temp.path().join("talk.pub");
    write_video(&video, 5);
    fs::write(&key, b"not a key").unwrap();

    facemark()
        .args(["verify", path_str(&video), "--public-key", path_str(&key)])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Invalid public key"));
}

#[test]
fn test_directory_without_manifest_is_unreadable() {
    let temp = TempDir::new().unwrap();

    facemark()
        .args(["inspect", path_str(temp.path())])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Unreadable video"));
}

#[test]
fn test_invalid_face_region_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    // Exit code 64 = EX_USAGE
    facemark()
        .args(["--face", "1,2,3", "identity", path_str(&video)])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("needs exactly four values"));
}

#[test]
fn test_invalid_face_scale_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    facemark()
        .args(["--face-scale", "2.5", "identity", path_str(&video)])
        .assert()
        .code(64);
}

#[test]
fn test_conflicting_flags_return_usage_error() {
    facemark()
        .args(["--quiet", "--verbose", "inspect", "video"])
        .assert()
        .code(64);

    facemark()
        .args(["--face", "0,0,8,8", "--face-scale", "0.5", "inspect", "video"])
        .assert()
        .code(64);
}

#[test]
fn test_sign_into_input_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    facemark()
        .args(["sign", path_str(&video), path_str(&video)])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("output must differ"));
}

#[test]
fn test_no_face_returns_general_error() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    // A fixed region entirely outside the frame never yields a face
    facemark()
        .args(["--face", "500,500,10,10", "identity", path_str(&video)])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No face detected"));
}

#[test]
fn test_face_over_carrier_is_rejected() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    let output = temp.path().join("signed");
    write_video(&video, 5);

    facemark()
        .args(["--face", "0,0,64,64", "sign", path_str(&video), path_str(&output)])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("overlaps the watermark carrier"));

    // Nothing is left behind for a failed run
    assert!(!output.exists(), "Failed sign should not leave output");
    assert!(!temp.path().join("signed.pub").exists());
}

#[test]
fn test_narrow_video_cannot_be_signed() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("narrow");
    let output = temp.path().join("signed");
    write_narrow_video(&video, 5);

    facemark()
        .args(["sign", path_str(&video), path_str(&output)])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Signature too large"));

    assert!(!output.exists(), "Failed sign should not leave output");
    assert!(!temp.path().join("signed.pub").exists());
}

// ============================================================================
// Identity Tests
// ============================================================================

#[test]
fn test_identity_prints_fingerprint() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    facemark()
        .args(["identity", path_str(&video)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Identity derived from video"))
        .stdout(predicate::str::contains("Fingerprint:"));

    assert!(!temp.path().join("talk.pub").exists(), "Key saved only on request");
}

#[test]
fn test_identity_save_writes_default_key() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    facemark()
        .args(["identity", "--save", path_str(&video)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Key saved:"));

    let key = temp.path().join("talk.pub");
    assert_eq!(fs::metadata(&key).unwrap().len(), 32, "Raw Ed25519 key");
}

#[test]
fn test_identity_json_output() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    let output = facemark()
        .args(["--format", "json", "identity", path_str(&video)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["public_key"].as_str().unwrap().len(), 64);
    assert_eq!(report["fingerprint"].as_str().unwrap().len(), 64);
    assert!(report["public_key_path"].is_null());
}

// ============================================================================
// Sign Tests
// ============================================================================

#[test]
fn test_sign_creates_signed_video_and_key() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    let output = temp.path().join("signed");
    write_video(&video, 5);

    facemark()
        .args(["sign", path_str(&video), path_str(&output)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Video signed!"));

    assert!(output.join("manifest.json").exists());
    assert_eq!(FrameSequence::open(&output).unwrap().frame_count(), 5);
    assert!(temp.path().join("signed.pub").exists());
}

#[test]
fn test_sign_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    let output = temp.path().join("signed");
    write_video(&video, 5);

    facemark()
        .args(["sign", "-n", path_str(&video), path_str(&output)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert!(!output.exists(), "Dry run should not create output");
    assert!(!temp.path().join("signed.pub").exists());
}

// ============================================================================
// Inspect Tests
// ============================================================================

#[test]
fn test_inspect_shows_container_info() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 4);

    facemark()
        .args(["inspect", path_str(&video)])
        .assert()
        .success()
        .stdout(predicate::str::contains("128x128"))
        .stdout(predicate::str::contains("3072 bits"))
        .stdout(predicate::str::contains("Carrier bytes:"));
}

#[test]
fn test_inspect_json_output() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 4);

    let output = facemark()
        .args(["-f", "json", "inspect", path_str(&video)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["frames"], 4);
    assert_eq!(report["frame_rate"], 25.0);
    assert_eq!(report["carrier_capacity_bits"], 3072);
    assert_eq!(report["carrier_hex"].as_str().unwrap().len(), 128);
    assert_eq!(report["signature_fits"], true);
}

#[test]
fn test_inspect_narrow_video_reports_no_room() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("narrow");
    write_narrow_video(&video, 2);

    let output = facemark()
        .args(["-f", "json", "inspect", path_str(&video)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    // 960 bits across three planes, but only 320 signature bits
    assert_eq!(report["carrier_capacity_bits"], 960);
    assert_eq!(report["signature_fits"], false);
}

// ============================================================================
// Quiet and Color Tests
// ============================================================================

#[test]
fn test_quiet_mode_minimal_output() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    let output = facemark()
        .args(["--quiet", "identity", path_str(&video)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(
        stdout.trim().is_empty(),
        "Quiet mode should have no stdout, got: {}",
        stdout
    );
}

#[test]
fn test_color_never_no_ansi() {
    let temp = TempDir::new().unwrap();
    let video = temp.path().join("talk");
    write_video(&video, 5);

    let output = facemark()
        .args(["--color=never", "identity", path_str(&video)])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(!stdout.contains("\x1b["), "Output should not contain ANSI codes");
}
