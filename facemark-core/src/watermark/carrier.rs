//! Least-significant-bit carrier in the top-left block of a frame.
//!
//! # Layout
//!
//! The carrier block is the top-left `min(32, W) × min(32, H)` pixels of the
//! frame. Its `P` pixels are enumerated row-major (y outer, x inner) and
//! viewed as three bit planes, one per channel LSB, in channel order R, G, B.
//! Payload bit `i` lives in plane `i / P` at pixel `i % P`.
//!
//! When the payload fits in one plane (always the case for a 64-byte
//! signature on a full block), every channel of a pixel receives the same bit:
//! one bit per pixel, stored three times. Larger payloads fill R, then G, then
//! B, up to 3072 bits.
//!
//! Pixels past the payload and everything outside the block are left as is.
//! Bytes are unpacked most-significant bit first.

use image::RgbImage;

use crate::detect::FaceRegion;
use crate::error::{FacemarkError, Result};

/// Side of the square carrier block.
pub const CARRIER_SIZE: u32 = 32;

/// Number of bit planes (one per color channel).
pub const CARRIER_PLANES: usize = 3;

/// Capacity of a full carrier block in bits.
pub const CARRIER_CAPACITY_BITS: usize =
    (CARRIER_SIZE as usize) * (CARRIER_SIZE as usize) * CARRIER_PLANES;

/// Carrier block position on a frame of at least 32×32.
pub const CARRIER_BLOCK: FaceRegion = FaceRegion::new(0, 0, CARRIER_SIZE, CARRIER_SIZE);

/// Carrier block clipped to a `width`×`height` frame.
pub fn carrier_region(width: u32, height: u32) -> Option<FaceRegion> {
    CARRIER_BLOCK.clamp_to(width, height)
}

/// Number of carrier pixels on a `width`×`height` frame.
pub fn carrier_pixels(width: u32, height: u32) -> usize {
    (width.min(CARRIER_SIZE) as usize) * (height.min(CARRIER_SIZE) as usize)
}

/// Number of payload bits a `width`×`height` frame can carry.
pub fn carrier_capacity(width: u32, height: u32) -> usize {
    carrier_pixels(width, height) * CARRIER_PLANES
}

/// Row-major coordinates of carrier pixel `index`.
fn pixel_at(index: usize, block_width: u32) -> (u32, u32) {
    let index = index as u32;
    (index % block_width, index / block_width)
}

/// Write `bits` into the carrier block of `frame`.
pub fn encode(frame: &mut RgbImage, bits: &[bool]) -> Result<()> {
    if bits.len() > CARRIER_CAPACITY_BITS {
        return Err(FacemarkError::SignatureTooLarge {
            bits: bits.len(),
            capacity: CARRIER_CAPACITY_BITS,
        });
    }
    if bits.is_empty() {
        return Ok(());
    }

    let (width, height) = frame.dimensions();
    let pixels = carrier_pixels(width, height);
    if pixels == 0 {
        return Err(FacemarkError::InsufficientCarrier);
    }
    let capacity = pixels * CARRIER_PLANES;
    if bits.len() > capacity {
        return Err(FacemarkError::SignatureTooLarge {
            bits: bits.len(),
            capacity,
        });
    }

    let block_width = width.min(CARRIER_SIZE);
    let redundant = bits.len() <= pixels;
    for (i, &bit) in bits.iter().enumerate() {
        let (x, y) = pixel_at(i % pixels, block_width);
        let pixel = frame.get_pixel_mut(x, y);
        if redundant {
            for channel in pixel.0.iter_mut() {
                *channel = (*channel & 0xFE) | u8::from(bit);
            }
        } else {
            let channel = &mut pixel.0[i / pixels];
            *channel = (*channel & 0xFE) | u8::from(bit);
        }
    }
    Ok(())
}

/// Read every carrier bit of `frame`: plane R, then G, then B.
///
/// A frame smaller than 32×32 yields fewer bits; nothing is padded.
pub fn decode(frame: &RgbImage) -> Result<Vec<bool>> {
    let (width, height) = frame.dimensions();
    let pixels = carrier_pixels(width, height);
    if pixels == 0 {
        return Err(FacemarkError::InsufficientCarrier);
    }

    let block_width = width.min(CARRIER_SIZE);
    let mut bits = Vec::with_capacity(pixels * CARRIER_PLANES);
    for plane in 0..CARRIER_PLANES {
        for index in 0..pixels {
            let (x, y) = pixel_at(index, block_width);
            bits.push(frame.get_pixel(x, y).0[plane] & 1 == 1);
        }
    }
    Ok(bits)
}

/// Unpack bytes into bits, most significant bit first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// Pack bits into bytes, most significant bit first.
///
/// Only complete bytes are produced; a trailing partial byte is dropped.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
        .collect()
}

/// Encode `payload` bytes into the carrier block.
pub fn embed_bytes(frame: &mut RgbImage, payload: &[u8]) -> Result<()> {
    encode(frame, &bytes_to_bits(payload))
}

/// Decode up to `len` bytes from the carrier block.
///
/// Returns fewer than `len` bytes when the carrier is too small.
pub fn extract_bytes(frame: &RgbImage, len: usize) -> Result<Vec<u8>> {
    let bits = decode(frame)?;
    let take = bits.len().min(len * 8);
    Ok(bits_to_bytes(&bits[..take]))
}
