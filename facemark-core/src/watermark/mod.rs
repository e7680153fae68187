//! Pixel watermark carrying the identity signature.
//!
//! The signature is hidden in the least-significant bits of the top-left
//! 32×32 block of a video's first frame. The scheme is fragile on purpose:
//! any re-encoding, cropping or frame reordering that alters those bits
//! invalidates the watermark.
//!
//! # Example
//!
//! ```
//! use facemark_core::watermark::{embed_bytes, extract_bytes};
//! use image::RgbImage;
//!
//! let mut frame = RgbImage::new(64, 64);
//! embed_bytes(&mut frame, b"payload").unwrap();
//! assert_eq!(extract_bytes(&frame, 7).unwrap(), b"payload");
//! ```

pub mod carrier;

pub use carrier::*;
