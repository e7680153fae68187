//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use facemark_core::{verify_video_detailed, FrameSequence, PublicIdentity, VerificationOutcome};
use serde_json::json;
use tracing::{error, info};

use crate::utils::{build_detector, build_key_path, short_fingerprint};
use crate::{GlobalOptions, OutputFormat};

/// Execute the verify command.
pub fn execute(
    video: PathBuf,
    public_key: Option<PathBuf>,
    options: &GlobalOptions,
) -> Result<()> {
    let detector = build_detector(options)?;

    // Determine key path
    let key_path = public_key.unwrap_or_else(|| build_key_path(&video));
    let public = PublicIdentity::load(&key_path)
        .with_context(|| format!("Failed to read public key: {}", key_path.display()))?;
    let fingerprint = public.fingerprint();
    info!(
        path = %key_path.display(),
        fingerprint = short_fingerprint(&fingerprint, 16),
        "Loaded public key"
    );

    let mut source = FrameSequence::open(&video)
        .with_context(|| format!("Failed to read video: {}", video.display()))?;
    info!(path = %video.display(), frames = source.frame_count(), "Opened video");

    let outcome = verify_video_detailed(&mut source, &public, &*detector)
        .with_context(|| format!("Failed to verify {}", video.display()))?;

    match options.format {
        OutputFormat::Json => {
            let report = json!({
                "video": video.display().to_string(),
                "public_key_path": key_path.display().to_string(),
                "fingerprint": fingerprint,
                "authentic": outcome.is_authentic(),
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text if !options.quiet => print_outcome(&outcome, &fingerprint),
        OutputFormat::Text => {}
    }

    if outcome.is_authentic() {
        info!("Verification successful");
        Ok(())
    } else {
        error!(reason = %outcome.description(), "Verification failed");
        bail!("Verification failed: {}", outcome.description())
    }
}

fn print_outcome(outcome: &VerificationOutcome, fingerprint: &str) {
    println!();
    match outcome {
        VerificationOutcome::Authentic => {
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!(
                "{}",
                "║              AUTHENTIC                 ║".green().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".green());
            println!();
            println!("   {} {}", "Signature:".dimmed(), "Valid (Ed25519)".green());
            println!(
                "   {} {}",
                "Embedding:".dimmed(),
                "Matches signed video".green()
            );
        }
        VerificationOutcome::MissingSignature { .. } | VerificationOutcome::SignatureMismatch => {
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!(
                "{}",
                "║              REJECTED                  ║".red().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".red());
            println!();
            println!("   {} {}", "Signature:".dimmed(), outcome.description().red());
        }
    }
    println!(
        "   {} {}",
        "Key:".dimmed(),
        short_fingerprint(fingerprint, 32)
    );
}
