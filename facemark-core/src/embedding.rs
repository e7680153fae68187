//! Biometric embedding from face patches.
//!
//! # Algorithm
//!
//! For every frame in which the detector finds a face:
//!
//! 1. Convert the frame to grayscale (BT.601 luma, 14-bit fixed point).
//! 2. Crop the face region, resample it to 64×64 (bilinear) and clear the low
//!    bit of every pixel, so small sensor or compression noise does not move
//!    pixels between histogram bins.
//! 3. Add the patch's 256-bin intensity histogram to `hist_face`.
//! 4. If a previous patch exists, add the 256-bin histogram of the absolute
//!    pixel difference to `hist_motion`.
//!
//! `hist_face` is averaged over the usable frames, `hist_motion` over
//! `max(1, usable - 1)`. The two are concatenated and L2-normalized into a
//! 512-float vector.
//!
//! # Byte representation
//!
//! [`Embedding::to_bytes`] serializes the vector as 512 little-endian IEEE-754
//! `f32` values. That byte string is the key-derivation input and the signed
//! message preimage, so it is fixed independently of the host platform.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::detect::{FaceDetector, FaceRegion};
use crate::error::{FacemarkError, Result};
use crate::video::VideoSource;

/// Side of the square face patch.
pub const PATCH_SIZE: u32 = 64;

/// Number of intensity bins per histogram.
pub const HISTOGRAM_BINS: usize = 256;

/// Embedding dimension: face histogram followed by motion histogram.
pub const EMBEDDING_DIM: usize = 2 * HISTOGRAM_BINS;

/// Size of [`Embedding::to_bytes`].
pub const EMBEDDING_BYTES: usize = EMBEDDING_DIM * 4;

/// Convert an RGB frame to grayscale.
///
/// Uses BT.601 weights in 14-bit fixed point with rounding:
/// `Y = (4899 R + 9617 G + 1868 B + 8192) >> 14`.
pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let luma = (4899 * u32::from(r) + 9617 * u32::from(g) + 1868 * u32::from(b) + 8192) >> 14;
        image::Luma([luma as u8])
    })
}

/// A 64×64 grayscale face crop with the low bit of every pixel cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacePatch {
    pixels: GrayImage,
}

impl FacePatch {
    /// Crop `region` from `gray`, resample to 64×64 and quantize.
    ///
    /// Returns `None` when the region lies entirely outside the frame.
    pub fn extract(gray: &GrayImage, region: FaceRegion) -> Option<Self> {
        let region = region.clamp_to(gray.width(), gray.height())?;
        let crop = imageops::crop_imm(gray, region.x, region.y, region.width, region.height)
            .to_image();
        let resized = imageops::resize(&crop, PATCH_SIZE, PATCH_SIZE, FilterType::Triangle);
        Some(Self::from_resized(resized))
    }

    /// Wrap an already 64×64 patch, clearing low bits.
    ///
    /// Returns `None` if the image is not 64×64.
    pub fn from_gray(patch: GrayImage) -> Option<Self> {
        if patch.dimensions() != (PATCH_SIZE, PATCH_SIZE) {
            return None;
        }
        Some(Self::from_resized(patch))
    }

    fn from_resized(mut pixels: GrayImage) -> Self {
        for value in pixels.iter_mut() {
            *value &= 0xFE;
        }
        Self { pixels }
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    fn histogram(&self) -> [f64; HISTOGRAM_BINS] {
        let mut hist = [0f64; HISTOGRAM_BINS];
        for &value in self.pixels.iter() {
            hist[usize::from(value)] += 1.0;
        }
        hist
    }

    fn motion_histogram(&self, previous: &Self) -> [f64; HISTOGRAM_BINS] {
        let mut hist = [0f64; HISTOGRAM_BINS];
        for (&a, &b) in self.pixels.iter().zip(previous.pixels.iter()) {
            hist[usize::from(a.abs_diff(b))] += 1.0;
        }
        hist
    }
}

/// Normalized 512-dimensional biometric embedding.
///
/// Invariant: Euclidean norm is 1 (within `f32` rounding).
#[derive(Clone, PartialEq)]
pub struct Embedding {
    values: Box<[f32; EMBEDDING_DIM]>,
}

impl Embedding {
    /// Normalize raw features into an embedding.
    fn normalize(raw: &[f64; EMBEDDING_DIM]) -> Result<Self> {
        let norm = raw.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(FacemarkError::DegenerateEmbedding);
        }
        let mut values = Box::new([0f32; EMBEDDING_DIM]);
        for (out, v) in values.iter_mut().zip(raw.iter()) {
            *out = (v / norm) as f32;
        }
        Ok(Self { values })
    }

    /// Rebuild an embedding from its little-endian byte representation.
    ///
    /// Fails with [`FacemarkError::DegenerateEmbedding`] on a wrong length or a
    /// vector that is not unit length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != EMBEDDING_BYTES {
            return Err(FacemarkError::DegenerateEmbedding);
        }
        let mut values = Box::new([0f32; EMBEDDING_DIM]);
        for (out, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
            *out = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let embedding = Self { values };
        if (embedding.norm() - 1.0).abs() > 1e-4 {
            return Err(FacemarkError::DegenerateEmbedding);
        }
        Ok(embedding)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values[..]
    }

    /// Appearance half of the vector.
    pub fn face_histogram(&self) -> &[f32] {
        &self.values[..HISTOGRAM_BINS]
    }

    /// Motion half of the vector.
    pub fn motion_histogram(&self) -> &[f32] {
        &self.values[HISTOGRAM_BINS..]
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Little-endian `f32` serialization (2048 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// SHA-256 of [`to_bytes`](Self::to_bytes); the message that gets signed.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.to_bytes()).into()
    }
}

impl std::fmt::Debug for Embedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedding")
            .field("dim", &EMBEDDING_DIM)
            .field("digest", &hex::encode(&self.digest()[..8]))
            .finish()
    }
}

/// Streaming accumulator for face and motion histograms.
///
/// Feed one entry per decoded frame, in decode order, with `None` for frames
/// without a usable face.
#[derive(Debug, Clone)]
pub struct EmbeddingBuilder {
    hist_face: [f64; HISTOGRAM_BINS],
    hist_motion: [f64; HISTOGRAM_BINS],
    previous: Option<FacePatch>,
    frames_seen: usize,
    usable_frames: usize,
}

impl Default for EmbeddingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingBuilder {
    pub fn new() -> Self {
        Self {
            hist_face: [0.0; HISTOGRAM_BINS],
            hist_motion: [0.0; HISTOGRAM_BINS],
            previous: None,
            frames_seen: 0,
            usable_frames: 0,
        }
    }

    /// Account for one frame.
    pub fn push(&mut self, patch: Option<FacePatch>) {
        self.frames_seen += 1;
        let Some(patch) = patch else {
            return;
        };
        self.usable_frames += 1;

        for (acc, v) in self.hist_face.iter_mut().zip(patch.histogram()) {
            *acc += v;
        }
        if let Some(previous) = &self.previous {
            for (acc, v) in self.hist_motion.iter_mut().zip(patch.motion_histogram(previous)) {
                *acc += v;
            }
        }
        self.previous = Some(patch);
    }

    /// Detect, crop and push one RGB frame.
    ///
    /// Returns the face region used, if any.
    pub fn push_frame<D>(&mut self, frame: &RgbImage, detector: &D) -> Option<FaceRegion>
    where
        D: FaceDetector + ?Sized,
    {
        let gray = to_grayscale(frame);
        let detected = detector
            .detect(&gray)
            .and_then(|region| region.clamp_to(gray.width(), gray.height()));
        let patch = detected.and_then(|region| FacePatch::extract(&gray, region));
        self.push(patch);
        detected
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    pub fn usable_frames(&self) -> usize {
        self.usable_frames
    }

    /// Average, concatenate and normalize the accumulated histograms.
    pub fn finish(self) -> Result<Embedding> {
        if self.usable_frames == 0 {
            return Err(FacemarkError::NoFaceDetected);
        }
        let face_div = self.usable_frames as f64;
        let motion_div = (self.usable_frames - 1).max(1) as f64;

        let mut raw = [0f64; EMBEDDING_DIM];
        for (out, v) in raw[..HISTOGRAM_BINS].iter_mut().zip(self.hist_face.iter()) {
            *out = v / face_div;
        }
        for (out, v) in raw[HISTOGRAM_BINS..].iter_mut().zip(self.hist_motion.iter()) {
            *out = v / motion_div;
        }

        debug!(
            frames = self.frames_seen,
            usable = self.usable_frames,
            "Finalizing embedding"
        );
        Embedding::normalize(&raw)
    }
}

/// Build an embedding from an ordered sequence of optional patches.
pub fn build_embedding<I>(patches: I) -> Result<Embedding>
where
    I: IntoIterator<Item = Option<FacePatch>>,
{
    let mut builder = EmbeddingBuilder::new();
    for patch in patches {
        builder.push(patch);
    }
    builder.finish()
}

/// Read every frame of `source` and compute its embedding.
pub fn embed_video<S, D>(source: &mut S, detector: &D) -> Result<Embedding>
where
    S: VideoSource + ?Sized,
    D: FaceDetector + ?Sized,
{
    let mut builder = EmbeddingBuilder::new();
    while let Some(frame) = source.next_frame()? {
        builder.push_frame(&frame, detector);
    }
    info!(
        frames = builder.frames_seen(),
        usable = builder.usable_frames(),
        "Computed video embedding"
    );
    builder.finish()
}
