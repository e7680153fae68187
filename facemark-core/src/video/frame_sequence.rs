//! Lossless frame-sequence container.
//!
//! A frame sequence is a directory holding one image per frame plus a
//! `manifest.json` describing the stream:
//!
//! ```json
//! {
//!   "version": 1,
//!   "width": 640,
//!   "height": 480,
//!   "frame_rate": 30.0,
//!   "frames": ["000000.png", "000001.png"]
//! }
//! ```
//!
//! Input frames may be PNG or JPEG; frames written by [`FrameSequenceWriter`]
//! are always PNG so carrier bits survive the round trip. The manifest is
//! written last, atomically, so an interrupted write never yields a readable
//! sequence.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{VideoInfo, VideoSink, VideoSource, DEFAULT_FRAME_RATE};
use crate::error::{FacemarkError, Result};

/// Manifest file name inside a frame-sequence directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Parsed frame-sequence manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSequence {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    pub frames: Vec<String>,
}

fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

impl FrameSequence {
    /// Parse and validate a manifest from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| FacemarkError::UnreadableVideo(format!("invalid manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| FacemarkError::VideoWrite(format!("failed to serialize manifest: {e}")))
    }

    /// Read the manifest of the sequence stored in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&path).map_err(|e| {
            FacemarkError::UnreadableVideo(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&bytes)
    }

    /// Open the sequence stored in `dir` for reading.
    pub fn open(dir: impl AsRef<Path>) -> Result<FrameSequenceReader> {
        let dir = dir.as_ref();
        let manifest = Self::load(dir)?;
        info!(
            path = %dir.display(),
            frames = manifest.frames.len(),
            width = manifest.width,
            height = manifest.height,
            "Opened frame sequence"
        );
        Ok(FrameSequenceReader {
            dir: dir.to_path_buf(),
            manifest,
            position: 0,
        })
    }

    /// Create a new sequence in `dir` for writing.
    ///
    /// Any manifest already present is removed first, so the directory is not
    /// a valid sequence until [`VideoSink::finish`] succeeds. Frame files left
    /// by an earlier writer (`NNNNNN.png`) are removed too; other files stay.
    pub fn create(dir: impl AsRef<Path>, info: VideoInfo) -> Result<FrameSequenceWriter> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| {
            FacemarkError::VideoWrite(format!("cannot create {}: {e}", dir.display()))
        })?;
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }
        let stale = remove_stale_frames(dir)?;
        debug!(path = %dir.display(), stale, "Created frame sequence directory");
        Ok(FrameSequenceWriter {
            dir: dir.to_path_buf(),
            info,
            frames: Vec::new(),
            finished: false,
        })
    }

    pub fn info(&self) -> VideoInfo {
        VideoInfo::new(self.width, self.height, self.frame_rate)
    }

    fn validate(&self) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            return Err(FacemarkError::UnreadableVideo(format!(
                "unsupported manifest version {}",
                self.version
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(FacemarkError::UnreadableVideo(format!(
                "invalid frame rate {}",
                self.frame_rate
            )));
        }
        if let Some(bad) = self.frames.iter().find(|name| !is_plain_file_name(name)) {
            return Err(FacemarkError::UnreadableVideo(format!(
                "frame entry {bad:?} is not a plain file name"
            )));
        }
        Ok(())
    }
}

/// File name of frame `index` as written by [`FrameSequenceWriter`].
fn frame_file_name(index: usize) -> String {
    format!("{index:06}.png")
}

/// Whether `name` follows the writer's `NNNNNN.png` naming.
fn is_writer_frame_name(name: &str) -> bool {
    name.strip_suffix(".png")
        .is_some_and(|stem| stem.len() >= 6 && stem.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete writer-named frame files in `dir`, returning how many were removed.
fn remove_stale_frames(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_frame = entry.file_name().to_str().is_some_and(is_writer_frame_name);
        if is_frame && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Frame entries must name files directly inside the sequence directory.
fn is_plain_file_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty() && path.file_name().is_some_and(|f| f == path.as_os_str())
}

/// [`VideoSource`] over a frame-sequence directory.
#[derive(Debug)]
pub struct FrameSequenceReader {
    dir: PathBuf,
    manifest: FrameSequence,
    position: usize,
}

impl FrameSequenceReader {
    pub fn manifest(&self) -> &FrameSequence {
        &self.manifest
    }

    pub fn frame_count(&self) -> usize {
        self.manifest.frames.len()
    }
}

impl VideoSource for FrameSequenceReader {
    fn info(&self) -> VideoInfo {
        self.manifest.info()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(name) = self.manifest.frames.get(self.position) else {
            return Ok(None);
        };
        let path = self.dir.join(name);
        let frame = image::open(&path)
            .map_err(|e| {
                FacemarkError::UnreadableVideo(format!("cannot decode {}: {e}", path.display()))
            })?
            .to_rgb8();
        if !self.manifest.info().matches(&frame) {
            return Err(FacemarkError::UnreadableVideo(format!(
                "{} is {}x{}, manifest declares {}x{}",
                path.display(),
                frame.width(),
                frame.height(),
                self.manifest.width,
                self.manifest.height
            )));
        }
        self.position += 1;
        Ok(Some(frame))
    }
}

/// [`VideoSink`] writing PNG frames and committing a manifest on finish.
#[derive(Debug)]
pub struct FrameSequenceWriter {
    dir: PathBuf,
    info: VideoInfo,
    frames: Vec<String>,
    finished: bool,
}

impl FrameSequenceWriter {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames_written(&self) -> usize {
        self.frames.len()
    }
}

impl VideoSink for FrameSequenceWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.finished {
            return Err(FacemarkError::VideoWrite("sequence already finished".into()));
        }
        if !self.info.matches(frame) {
            return Err(FacemarkError::VideoWrite(format!(
                "frame is {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.info.width,
                self.info.height
            )));
        }
        let name = frame_file_name(self.frames.len());
        let path = self.dir.join(&name);
        frame
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| FacemarkError::VideoWrite(format!("cannot write {}: {e}", path.display())))?;
        self.frames.push(name);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let manifest = FrameSequence {
            version: MANIFEST_VERSION,
            width: self.info.width,
            height: self.info.height,
            frame_rate: self.info.frame_rate,
            frames: self.frames.clone(),
        };
        let staging = self.dir.join(format!("{MANIFEST_FILE}.tmp"));
        fs::write(&staging, manifest.to_json()?)?;
        fs::rename(&staging, self.dir.join(MANIFEST_FILE))?;
        self.finished = true;
        info!(
            path = %self.dir.display(),
            frames = self.frames.len(),
            "Committed frame sequence"
        );
        Ok(())
    }
}
