//! Facemark Core - video-derived identities and first-frame signature watermarks
//!
//! This crate turns the facial appearance and motion statistics of a video
//! into a deterministic Ed25519 identity, and uses that identity to sign the
//! video through an invisible watermark in its first frame.
//!
//! # Features
//!
//! - Deterministic 512-dimensional embedding from face patches
//! - HKDF-SHA256 key derivation: the same video always yields the same keypair
//! - Ed25519 signatures over the SHA-256 of the embedding
//! - LSB watermark in the top-left 32×32 block of frame 0
//! - Pluggable video containers and face detectors
//!
//! # Example
//!
//! ```no_run
//! use facemark_core::{
//!     generate_identity, sign_video, verify_video, CenteredDetector, FrameSequence,
//!     VideoSource,
//! };
//!
//! # fn example() -> facemark_core::Result<()> {
//! let detector = CenteredDetector::default();
//!
//! // Derive the identity from the video itself
//! let identity = generate_identity(&mut FrameSequence::open("talk")?, &detector)?;
//! identity.public_key().save("talk.pub")?;
//!
//! // Write a signed copy
//! let mut source = FrameSequence::open("talk")?;
//! let mut sink = FrameSequence::create("talk-signed", source.info())?;
//! sign_video(&mut source, &mut sink, &identity, &detector)?;
//!
//! // Anyone holding the public key can check it
//! let public_key = facemark_core::PublicIdentity::load("talk.pub")?;
//! assert!(verify_video(&mut FrameSequence::open("talk-signed")?, &public_key, &detector)?);
//! # Ok(())
//! # }
//! ```

pub mod detect;
pub mod embedding;
pub mod error;
pub mod identity;
pub mod seal;
pub mod video;
pub mod watermark;

// Re-export main types for convenience
pub use detect::{CenteredDetector, FaceDetector, FaceRegion, FixedRegionDetector};
pub use embedding::{
    build_embedding, embed_video, to_grayscale, Embedding, EmbeddingBuilder, FacePatch,
    EMBEDDING_BYTES, EMBEDDING_DIM, PATCH_SIZE,
};
pub use error::{FacemarkError, Result};
pub use identity::{
    derive_seed, generate_identity, Identity, PublicIdentity, KEY_DERIVATION_INFO,
    PUBLIC_KEY_BYTES, SIGNATURE_BYTES,
};
pub use seal::{
    sign_video, verify_video, verify_video_detailed, SignReport, VerificationOutcome,
    SIGNATURE_BITS,
};
pub use video::{
    FrameSequence, FrameSequenceReader, FrameSequenceWriter, MemoryVideo, VideoInfo,
    VideoSink, VideoSource,
};
pub use watermark::{carrier_capacity, CARRIER_BLOCK, CARRIER_CAPACITY_BITS};

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn talking_head(frames: u32) -> MemoryVideo {
        let frames = (0..frames)
            .map(|t| {
                RgbImage::from_fn(160, 120, |x, y| {
                    let dx = x as i32 - 80;
                    let dy = y as i32 - 60 - t as i32;
                    if dx * dx + dy * dy < 900 {
                        image::Rgb([200 - (dy.unsigned_abs() as u8), 150, 120])
                    } else {
                        image::Rgb([20, (x % 40) as u8, (y % 30) as u8])
                    }
                })
            })
            .collect();
        MemoryVideo::from_frames(frames, 25.0).expect("valid frames")
    }

    /// Integration test: derive identity, sign, verify.
    #[test]
    fn test_full_identity_workflow() {
        let video = talking_head(5);
        let detector = CenteredDetector::default();

        // Step 1: identity is reproducible from the video alone
        let identity = generate_identity(&mut video.reader(), &detector).expect("identity");
        let again = generate_identity(&mut video.reader(), &detector).expect("identity");
        assert_eq!(identity.embedding().to_bytes(), again.embedding().to_bytes());
        assert_eq!(identity.public_key(), again.public_key());

        // Step 2: sign into a fresh video
        let mut signed = MemoryVideo::new(video.info());
        let report = sign_video(&mut video.reader(), &mut signed, &identity, &detector)
            .expect("Failed to sign video");
        assert_eq!(report.frames_written, video.len());
        assert_eq!(signed.info(), video.info());

        // Step 3: verification succeeds with the derived public key
        let public_key = identity.public_key();
        assert!(verify_video(&mut signed.reader(), &public_key, &detector).expect("verify"));

        // Signed video yields the same identity as the original
        let resigned = generate_identity(&mut signed.reader(), &detector).expect("identity");
        assert_eq!(resigned.public_key(), public_key);
    }
}
