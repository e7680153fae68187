//! Signing and verifying videos.
//!
//! Signing computes `Ed25519(sk, SHA256(embedding bytes))`, writes the 512
//! signature bits into the carrier block of frame 0, and copies every other
//! frame to the sink unchanged.
//!
//! Verification reads the carrier of frame 0, recomputes the embedding over
//! the whole video (frame 0 included) and checks the signature against the
//! given public key. A rejected signature is a normal `false` result; only
//! failures to read or analyse the video are errors.
//!
//! The signature takes one carrier pixel per bit, the same bit in all three
//! channels, and is read back from the red plane alone. A frame whose carrier
//! block has fewer than 512 pixels cannot be signed, and verifying one yields
//! [`VerificationOutcome::MissingSignature`].
//!
//! Both paths require that the face detected in frame 0 does not overlap the
//! carrier block. Otherwise the watermark would alter the pixels the embedding
//! is computed from, and verification could not reproduce the signed
//! embedding.

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detect::{FaceDetector, FaceRegion};
use crate::embedding::{to_grayscale, EmbeddingBuilder};
use crate::error::{FacemarkError, Result};
use crate::identity::{Identity, PublicIdentity, SIGNATURE_BYTES};
use crate::video::{VideoSink, VideoSource};
use crate::watermark::{self, bits_to_bytes, bytes_to_bits, carrier_pixels, carrier_region};

/// Number of carrier bits holding the signature.
pub const SIGNATURE_BITS: usize = SIGNATURE_BYTES * 8;

/// Summary of a completed signing run.
#[derive(Debug, Clone)]
pub struct SignReport {
    pub frames_written: usize,
    pub signature: [u8; SIGNATURE_BYTES],
    pub public_key: PublicIdentity,
}

/// Result of checking a video's watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Signature is valid for the recomputed embedding.
    Authentic,
    /// The first frame could not hold a full signature (or there is no frame).
    MissingSignature { recovered_bits: usize },
    /// A signature was recovered but does not verify.
    SignatureMismatch,
}

impl VerificationOutcome {
    pub fn is_authentic(&self) -> bool {
        matches!(self, Self::Authentic)
    }

    /// Human-readable description of the outcome.
    pub fn description(&self) -> String {
        match self {
            Self::Authentic => "Signature valid for video embedding".into(),
            Self::MissingSignature { recovered_bits } => format!(
                "No complete signature in first frame ({recovered_bits} of {SIGNATURE_BITS} bits)"
            ),
            Self::SignatureMismatch => {
                "Signature does not match video embedding or public key".into()
            }
        }
    }
}

/// Fail if `region` intersects the carrier block of a `width`×`height` frame.
fn check_carrier_clear(region: Option<FaceRegion>, width: u32, height: u32) -> Result<()> {
    let (Some(region), Some(carrier)) = (region, carrier_region(width, height)) else {
        return Ok(());
    };
    if carrier.intersects(&region) {
        warn!(%region, "Face region overlaps watermark carrier");
        return Err(FacemarkError::CarrierOverlapsFace { region });
    }
    Ok(())
}

fn detect_in<D: FaceDetector + ?Sized>(frame: &RgbImage, detector: &D) -> Option<FaceRegion> {
    let gray = to_grayscale(frame);
    detector
        .detect(&gray)
        .and_then(|region| region.clamp_to(gray.width(), gray.height()))
}

/// Watermark `identity`'s signature into frame 0 and copy the video to `sink`.
///
/// The sink is finished only after the last frame has been written; on any
/// error the output must be discarded.
pub fn sign_video<S, K, D>(
    source: &mut S,
    sink: &mut K,
    identity: &Identity,
    detector: &D,
) -> Result<SignReport>
where
    S: VideoSource + ?Sized,
    K: VideoSink + ?Sized,
    D: FaceDetector + ?Sized,
{
    let signature = identity.sign_embedding();
    let bits = bytes_to_bits(&signature);

    let Some(mut first) = source.next_frame()? else {
        return Err(FacemarkError::UnreadableVideo("video has no frames".into()));
    };
    let pixels = carrier_pixels(first.width(), first.height());
    if pixels < SIGNATURE_BITS {
        return Err(FacemarkError::SignatureTooLarge {
            bits: SIGNATURE_BITS,
            capacity: pixels,
        });
    }
    check_carrier_clear(detect_in(&first, detector), first.width(), first.height())?;

    watermark::encode(&mut first, &bits)?;
    sink.write_frame(&first)?;
    debug!(bits = bits.len(), "Watermarked first frame");

    let mut frames_written = 1;
    while let Some(frame) = source.next_frame()? {
        sink.write_frame(&frame)?;
        frames_written += 1;
    }
    sink.finish()?;

    let public_key = identity.public_key();
    let fingerprint = public_key.fingerprint();
    info!(
        frames = frames_written,
        fingerprint = &fingerprint[..16],
        "Signed video"
    );
    Ok(SignReport {
        frames_written,
        signature,
        public_key,
    })
}

/// Check the watermark of `source` against `public_key`.
pub fn verify_video_detailed<S, D>(
    source: &mut S,
    public_key: &PublicIdentity,
    detector: &D,
) -> Result<VerificationOutcome>
where
    S: VideoSource + ?Sized,
    D: FaceDetector + ?Sized,
{
    let Some(first) = source.next_frame()? else {
        warn!("Video has no frames to verify");
        return Ok(VerificationOutcome::MissingSignature { recovered_bits: 0 });
    };

    let pixels = carrier_pixels(first.width(), first.height());
    if pixels < SIGNATURE_BITS {
        warn!(
            recovered = pixels,
            required = SIGNATURE_BITS,
            "Carrier too small for a signature"
        );
        return Ok(VerificationOutcome::MissingSignature {
            recovered_bits: pixels,
        });
    }
    // Decode order starts with the red plane
    let bits = watermark::decode(&first)?;
    let signature = bits_to_bytes(&bits[..SIGNATURE_BITS]);

    let mut builder = EmbeddingBuilder::new();
    let region = builder.push_frame(&first, detector);
    check_carrier_clear(region, first.width(), first.height())?;
    drop(first);

    while let Some(frame) = source.next_frame()? {
        builder.push_frame(&frame, detector);
    }
    let embedding = builder.finish()?;

    let outcome = if public_key.verify_embedding(&embedding, &signature) {
        VerificationOutcome::Authentic
    } else {
        VerificationOutcome::SignatureMismatch
    };
    info!(outcome = ?outcome, "Verified video");
    Ok(outcome)
}

/// `true` only when the watermark verifies against `public_key`.
pub fn verify_video<S, D>(source: &mut S, public_key: &PublicIdentity, detector: &D) -> Result<bool>
where
    S: VideoSource + ?Sized,
    D: FaceDetector + ?Sized,
{
    verify_video_detailed(source, public_key, detector).map(|outcome| outcome.is_authentic())
}
