#![no_main]

//! Fuzz target for watermark extraction
//!
//! Builds a frame from arbitrary bytes, decodes its carrier and checks the
//! recovered signature against a fixed key. None of this may panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_carrier

use facemark_core::watermark::{bits_to_bytes, decode, encode};
use facemark_core::{build_embedding, FacePatch, Identity, PATCH_SIZE, SIGNATURE_BITS};
use image::{GrayImage, RgbImage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let width = u32::from(data[0] % 48);
    let height = u32::from(data[1] % 48);
    let pixels = &data[2..];
    let needed = (width * height * 3) as usize;
    if pixels.len() < needed {
        return;
    }
    let Some(mut frame) = RgbImage::from_raw(width, height, pixels[..needed].to_vec()) else {
        return;
    };

    if let Ok(bits) = decode(&frame) {
        let patch = FacePatch::from_gray(GrayImage::new(PATCH_SIZE, PATCH_SIZE));
        let identity = Identity::from_embedding(build_embedding([patch]).unwrap()).unwrap();
        let take = bits.len().min(SIGNATURE_BITS);
        let signature = bits_to_bytes(&bits[..take]);
        let _ = identity
            .public_key()
            .verify_embedding(identity.embedding(), &signature);

        // Re-encoding what was decoded must always fit
        encode(&mut frame, &bits).unwrap();
    }
});
