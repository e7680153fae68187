//! Sequential video access.
//!
//! The signing protocol only ever needs to walk a video front to back, so
//! containers are abstracted behind two small traits:
//!
//! - [`VideoSource`]: yields decoded RGB frames in natural decode order.
//! - [`VideoSink`]: accepts frames in order and commits the artifact on
//!   [`VideoSink::finish`].
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryVideo`]: frames held in memory (tests, embedding in other tools).
//! - [`FrameSequence`]: a directory of lossless PNG frames plus a JSON
//!   manifest. Lossless storage is required because the watermark lives in
//!   pixel least-significant bits.

mod frame_sequence;

pub use frame_sequence::{FrameSequence, FrameSequenceReader, FrameSequenceWriter, MANIFEST_FILE};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{FacemarkError, Result};

/// Frame rate used when a container does not record one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Stream-level properties shared by every frame of a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            width,
            height,
            frame_rate,
        }
    }

    /// Whether `frame` has the dimensions announced for this stream.
    pub fn matches(&self, frame: &RgbImage) -> bool {
        frame.dimensions() == (self.width, self.height)
    }
}

/// Sequential frame reader.
///
/// Sources own their decode session; dropping the source releases it.
pub trait VideoSource {
    /// Stream properties (dimensions, frame rate).
    fn info(&self) -> VideoInfo;

    /// Next frame in decode order, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Sequential frame writer.
///
/// Frames written before [`finish`](VideoSink::finish) must not be treated as
/// a valid artifact.
pub trait VideoSink {
    /// Append one frame.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Commit the artifact. No frames may be written afterwards.
    fn finish(&mut self) -> Result<()>;
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).next_frame()
    }
}

impl<S: VideoSink + ?Sized> VideoSink for Box<S> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// A video held entirely in memory.
///
/// Acts as a sink (frames are appended) and hands out independent readers.
#[derive(Debug, Clone)]
pub struct MemoryVideo {
    info: VideoInfo,
    frames: Vec<RgbImage>,
    finished: bool,
}

impl MemoryVideo {
    /// Empty video ready to receive frames.
    pub fn new(info: VideoInfo) -> Self {
        Self {
            info,
            frames: Vec::new(),
            finished: false,
        }
    }

    /// Build a finished video from existing frames.
    ///
    /// All frames must share the dimensions of the first one.
    pub fn from_frames(frames: Vec<RgbImage>, frame_rate: f64) -> Result<Self> {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let info = VideoInfo::new(width, height, frame_rate);
        if let Some(index) = frames.iter().position(|f| !info.matches(f)) {
            return Err(FacemarkError::UnreadableVideo(format!(
                "frame {index} is {}x{}, expected {width}x{height}",
                frames[index].width(),
                frames[index].height()
            )));
        }
        Ok(Self {
            info,
            frames,
            finished: true,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [RgbImage] {
        &mut self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// A fresh source positioned at the first frame.
    pub fn reader(&self) -> MemoryVideoReader<'_> {
        MemoryVideoReader {
            info: self.info,
            frames: self.frames.iter(),
        }
    }
}

impl VideoSink for MemoryVideo {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.finished {
            return Err(FacemarkError::VideoWrite("video already finished".into()));
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
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Borrowing reader over a [`MemoryVideo`].
#[derive(Debug, Clone)]
pub struct MemoryVideoReader<'a> {
    info: VideoInfo,
    frames: std::slice::Iter<'a, RgbImage>,
}

impl VideoSource for MemoryVideoReader<'_> {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.next().cloned())
    }
}
