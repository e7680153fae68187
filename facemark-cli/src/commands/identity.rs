//! Identity command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use facemark_core::{generate_identity, FrameSequence};
use serde_json::json;
use tracing::info;

use crate::utils::{build_detector, build_key_path, short_fingerprint};
use crate::{GlobalOptions, OutputFormat};

/// Execute the identity command.
pub fn execute(
    video: PathBuf,
    public_key: Option<PathBuf>,
    save: bool,
    options: &GlobalOptions,
) -> Result<()> {
    let detector = build_detector(options)?;

    let mut source = FrameSequence::open(&video)
        .with_context(|| format!("Failed to read video: {}", video.display()))?;
    info!(path = %video.display(), frames = source.frame_count(), "Opened video");

    let identity = generate_identity(&mut source, &*detector)
        .with_context(|| format!("Failed to derive identity from {}", video.display()))?;
    let public = identity.public_key();
    let fingerprint = public.fingerprint();

    let key_path = match public_key {
        Some(path) => Some(path),
        None if save => Some(build_key_path(&video)),
        None => None,
    };
    if let Some(path) = &key_path {
        public
            .save(path)
            .with_context(|| format!("Failed to write public key: {}", path.display()))?;
        info!(path = %path.display(), "Public key saved");
    }

    match options.format {
        OutputFormat::Json => {
            let report = json!({
                "video": video.display().to_string(),
                "fingerprint": fingerprint,
                "public_key": hex::encode(public.to_bytes()),
                "embedding_sha256": hex::encode(identity.embedding().digest()),
                "public_key_path": key_path.as_ref().map(|p| p.display().to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text if !options.quiet => {
            println!();
            println!("{}", "Identity derived from video".green().bold());
            println!();
            println!(
                "   {} {}",
                "Fingerprint:".dimmed(),
                short_fingerprint(&fingerprint, 32)
            );
            println!(
                "   {} {}",
                "Public key:".dimmed(),
                hex::encode(public.to_bytes())
            );
            println!(
                "   {} {}",
                "Embedding:".dimmed(),
                &hex::encode(identity.embedding().digest())[..16]
            );
            if let Some(path) = &key_path {
                println!("   {} {}", "Key saved:".dimmed(), path.display());
            }
        }
        OutputFormat::Text => {}
    }

    Ok(())
}
