//! Sign command implementation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use facemark_core::{
    generate_identity, sign_video, FrameSequence, SignReport, VideoSink, VideoSource,
    SIGNATURE_BITS,
};
use image::RgbImage;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::utils::{build_detector, build_key_path, short_fingerprint};
use crate::{GlobalOptions, OutputFormat};

/// Sink that validates and counts frames without storing them.
#[derive(Debug, Default)]
struct DiscardSink {
    frames: usize,
}

impl VideoSink for DiscardSink {
    fn write_frame(&mut self, _frame: &RgbImage) -> facemark_core::Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> facemark_core::Result<()> {
        Ok(())
    }
}

/// Whether `a` and `b` name the same existing directory.
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Execute the sign command.
pub fn execute(
    video: PathBuf,
    output: PathBuf,
    public_key: Option<PathBuf>,
    dry_run: bool,
    options: &GlobalOptions,
) -> Result<()> {
    if same_location(&video, &output) {
        bail!("Invalid argument: output must differ from the input video");
    }
    let detector = build_detector(options)?;

    // Pass one: derive the identity from the unmodified video
    let mut source = FrameSequence::open(&video)
        .with_context(|| format!("Failed to read video: {}", video.display()))?;
    let info = source.info();
    info!(
        path = %video.display(),
        frames = source.frame_count(),
        width = info.width,
        height = info.height,
        "Opened video"
    );
    let identity = generate_identity(&mut source, &*detector)
        .with_context(|| format!("Failed to derive identity from {}", video.display()))?;
    drop(source);

    // Pass two: watermark frame 0 and copy the rest
    let mut source = FrameSequence::open(&video)
        .with_context(|| format!("Failed to read video: {}", video.display()))?;

    let key_path = public_key.unwrap_or_else(|| build_key_path(&output));

    let report = if dry_run {
        let mut sink = DiscardSink::default();
        let report = sign_video(&mut source, &mut sink, &identity, &*detector)
            .context("Failed to sign video")?;
        debug!(frames = sink.frames, "Dry run complete");
        report
    } else {
        let created = !output.exists();
        let result = FrameSequence::create(&output, info).and_then(|mut sink| {
            sign_video(&mut source, &mut sink, &identity, &*detector)
        });
        match result {
            Ok(report) => report,
            Err(err) => {
                discard_output(&output, created);
                return Err(err).context(sign_error_context(&output));
            }
        }
    };

    if !dry_run {
        report
            .public_key
            .save(&key_path)
            .with_context(|| format!("Failed to write public key: {}", key_path.display()))?;
        info!(path = %key_path.display(), "Public key saved");
    }

    print_report(&video, &output, &key_path, &report, dry_run, options)
}

fn sign_error_context(output: &Path) -> String {
    format!("Failed to sign video into {}", output.display())
}

/// Remove a partially written output directory we created ourselves.
///
/// Pre-existing directories are left alone; without a manifest they do not
/// read as a video.
fn discard_output(output: &Path, created: bool) {
    if !created {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(output) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %output.display(), error = %e, "Failed to remove partial output");
        }
    }
}

fn print_report(
    video: &Path,
    output: &Path,
    key_path: &Path,
    report: &SignReport,
    dry_run: bool,
    options: &GlobalOptions,
) -> Result<()> {
    let fingerprint = report.public_key.fingerprint();

    match options.format {
        OutputFormat::Json => {
            let summary = json!({
                "video": video.display().to_string(),
                "output": (!dry_run).then(|| output.display().to_string()),
                "dry_run": dry_run,
                "frames": report.frames_written,
                "signature_bits": SIGNATURE_BITS,
                "signature": hex::encode(report.signature),
                "fingerprint": fingerprint,
                "public_key": hex::encode(report.public_key.to_bytes()),
                "public_key_path": (!dry_run).then(|| key_path.display().to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text if !options.quiet => {
            println!();
            if dry_run {
                println!("{}", "Dry run: video can be signed".yellow().bold());
            } else {
                println!("{}", "Video signed!".green().bold());
            }
            println!();
            if !dry_run {
                println!("   {} {}", "Output:".dimmed(), output.display());
                println!("   {} {}", "Public key:".dimmed(), key_path.display());
            }
            println!("   {} {}", "Frames:".dimmed(), report.frames_written);
            println!(
                "   {} {}",
                "Fingerprint:".dimmed(),
                short_fingerprint(&fingerprint, 32)
            );
            println!(
                "   {} {}...",
                "Signature:".dimmed(),
                &hex::encode(report.signature)[..32]
            );
        }
        OutputFormat::Text => {}
    }

    Ok(())
}
