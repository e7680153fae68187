//! Common utility functions shared across CLI commands.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use facemark_core::{CenteredDetector, FaceDetector, FaceRegion, FixedRegionDetector};
use tracing::debug;

use crate::GlobalOptions;

/// Build the default public key path for a video directory.
///
/// Transforms `talk` into `talk.pub` and `clips/talk/` into `clips/talk.pub`.
pub fn build_key_path(video: &Path) -> PathBuf {
    let mut name = video
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("video"));
    name.push(".pub");
    video.with_file_name(name)
}

/// Parse a face region given as `X,Y,W,H`.
pub fn parse_region(value: &str) -> Result<FaceRegion> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid argument: face region '{value}' is not X,Y,W,H"))?;

    let [x, y, width, height] = parts[..] else {
        bail!("Invalid argument: face region '{value}' needs exactly four values");
    };
    if width == 0 || height == 0 {
        bail!("Invalid argument: face region '{value}' is empty");
    }
    Ok(FaceRegion::new(x, y, width, height))
}

/// Build the face detector selected by the global options.
pub fn build_detector(options: &GlobalOptions) -> Result<Box<dyn FaceDetector>> {
    if let Some(face) = &options.face {
        let region = parse_region(face)?;
        debug!(%region, "Using fixed face region");
        return Ok(Box::new(FixedRegionDetector::new(region)));
    }

    let detector = match options.face_scale {
        Some(scale) if !(scale.is_finite() && scale > 0.0 && scale <= 1.0) => {
            bail!("Invalid argument: face scale {scale} must be in (0, 1]");
        }
        Some(scale) => CenteredDetector::new(scale),
        None => CenteredDetector::default(),
    };
    debug!(scale = detector.scale(), "Using centered face region");
    Ok(Box::new(detector))
}

/// First `len` hex characters of a fingerprint, for compact display.
pub fn short_fingerprint(fingerprint: &str, len: usize) -> &str {
    &fingerprint[..len.min(fingerprint.len())]
}
