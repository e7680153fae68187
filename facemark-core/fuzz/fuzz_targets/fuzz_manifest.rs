#![no_main]

//! Fuzz target for frame-sequence manifest parsing
//!
//! Run with: cargo +nightly fuzz run fuzz_manifest

use facemark_core::FrameSequence;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing must reject garbage without panicking
    if let Ok(manifest) = FrameSequence::from_json(data) {
        let _ = manifest.info();
        let _ = manifest.to_json();
    }
});
