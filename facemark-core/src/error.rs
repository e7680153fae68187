use thiserror::Error;

use crate::detect::FaceRegion;

#[derive(Error, Debug)]
pub enum FacemarkError {
    #[error("Unreadable video: {0}")]
    UnreadableVideo(String),

    #[error("No face detected in any frame of the video")]
    NoFaceDetected,

    #[error("Degenerate embedding: feature vector has zero or non-finite norm")]
    DegenerateEmbedding,

    #[error("Signature too large: {bits} bits exceed carrier capacity of {capacity} bits")]
    SignatureTooLarge { bits: usize, capacity: usize },

    #[error("Insufficient carrier: frame has no readable pixels")]
    InsufficientCarrier,

    #[error("Face region {region} overlaps the watermark carrier block")]
    CarrierOverlapsFace { region: FaceRegion },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Video write error: {0}")]
    VideoWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FacemarkError>;
