//! Inspect command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use facemark_core::watermark::{bits_to_bytes, carrier_pixels, decode, CARRIER_PLANES};
use facemark_core::{carrier_capacity, FrameSequence, VideoSource, SIGNATURE_BITS};
use serde_json::json;
use tracing::info;

use crate::{GlobalOptions, OutputFormat};

/// Number of carrier bytes shown.
const SHOWN_BYTES: usize = 64;

/// Raw view of the first frame's carrier block.
struct CarrierDump {
    bytes: Vec<u8>,
    /// Whether the R, G and B planes agree over the signature prefix, as they
    /// do right after signing.
    planes_agree: bool,
}

fn dump_carrier(bits: &[bool], pixels: usize) -> CarrierDump {
    let shown = bits.len().min(SHOWN_BYTES * 8);
    let prefix = pixels.min(SIGNATURE_BITS);
    let planes_agree = bits.len() >= pixels * CARRIER_PLANES
        && (0..prefix).all(|i| bits[i] == bits[pixels + i] && bits[i] == bits[2 * pixels + i]);

    CarrierDump {
        bytes: bits_to_bytes(&bits[..shown]),
        planes_agree,
    }
}

/// Execute the inspect command.
pub fn execute(video: PathBuf, options: &GlobalOptions) -> Result<()> {
    let mut source = FrameSequence::open(&video)
        .with_context(|| format!("Failed to read video: {}", video.display()))?;
    let info = source.info();
    let frame_count = source.frame_count();
    let capacity = carrier_capacity(info.width, info.height);
    let signature_fits = carrier_pixels(info.width, info.height) >= SIGNATURE_BITS;
    info!(path = %video.display(), frames = frame_count, "Opened video");

    let dump = match source
        .next_frame()
        .with_context(|| format!("Failed to read first frame of {}", video.display()))?
    {
        Some(frame) if capacity > 0 => {
            let bits = decode(&frame).context("Failed to decode carrier")?;
            Some(dump_carrier(&bits, carrier_pixels(info.width, info.height)))
        }
        _ => None,
    };

    match options.format {
        OutputFormat::Json => {
            let report = json!({
                "video": video.display().to_string(),
                "width": info.width,
                "height": info.height,
                "frame_rate": info.frame_rate,
                "frames": frame_count,
                "carrier_capacity_bits": capacity,
                "signature_fits": signature_fits,
                "carrier_hex": dump.as_ref().map(|d| hex::encode(&d.bytes)),
                "planes_agree": dump.as_ref().map(|d| d.planes_agree),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text if !options.quiet => {
            println!();
            println!("{}", video.display().to_string().bold());
            println!();
            println!(
                "   {} {}x{}",
                "Dimensions:".dimmed(),
                info.width,
                info.height
            );
            println!("   {} {}", "Frame rate:".dimmed(), info.frame_rate);
            println!("   {} {}", "Frames:".dimmed(), frame_count);

            let fits = if signature_fits {
                "signature fits".green()
            } else {
                "too small for a signature".red()
            };
            println!(
                "   {} {} bits ({})",
                "Carrier:".dimmed(),
                capacity,
                fits
            );

            match &dump {
                Some(dump) => {
                    let planes = if dump.planes_agree {
                        "agree".green()
                    } else {
                        "differ".yellow()
                    };
                    println!("   {} {}", "Planes:".dimmed(), planes);
                    println!("   {}", "Carrier bytes:".dimmed());
                    for chunk in dump.bytes.chunks(16) {
                        println!("     {}", hex::encode(chunk));
                    }
                }
                None => println!("   {} {}", "Carrier bytes:".dimmed(), "none".yellow()),
            }
        }
        OutputFormat::Text => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_redundant_planes() {
        let pixels = 1024;
        let plane: Vec<bool> = (0..pixels).map(|i| i % 3 == 0).collect();
        let bits = [plane.clone(), plane.clone(), plane].concat();

        let dump = dump_carrier(&bits, pixels);
        assert!(dump.planes_agree);
        assert_eq!(dump.bytes.len(), SHOWN_BYTES);
        assert_eq!(dump.bytes[0], 0b1001_0010);
    }

    #[test]
    fn test_dump_detects_disagreeing_planes() {
        let pixels = 1024;
        let mut bits = vec![false; pixels * CARRIER_PLANES];
        bits[pixels + 7] = true;

        assert!(!dump_carrier(&bits, pixels).planes_agree);
    }

    #[test]
    fn test_dump_small_carrier() {
        let pixels = 16;
        let bits = vec![true; pixels * CARRIER_PLANES];

        let dump = dump_carrier(&bits, pixels);
        assert!(dump.planes_agree);
        assert_eq!(dump.bytes, vec![0xFF; 6]);
    }
}
