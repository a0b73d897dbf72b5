use std::path::PathBuf;

use thiserror::Error;

use crate::trajectory::Geometry;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not enough ball detections: {found} of {frames} frames, need at least {required}")]
    InsufficientDetections {
        found: usize,
        required: usize,
        frames: usize,
    },

    #[error("frame geometry mismatch: expected {expected}, got {found}")]
    GeometryMismatch { expected: Geometry, found: Geometry },

    #[error("no usable pitch trajectory in sequence")]
    EmptyBundle,

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("detector failure: {0}")]
    Detector(String),

    #[error("cannot open video {0}")]
    OpenVideo(PathBuf),

    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
