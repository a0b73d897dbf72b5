use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use nalgebra as na;
use opencv::{core::Mat, prelude::*, videoio};

use crate::config::OverlayConfig;
use crate::detector::Detector;
use crate::error::Error;
use crate::report::{Event, Sink};

/// Frame geometry and rate inherited from a source video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
}

impl Geometry {
    /// fps comes back from the container as a float; compare with slack.
    #[inline]
    pub fn matches(&self, other: &Geometry) -> bool {
        self.width == other.width
            && self.height == other.height
            && (self.fps - other.fps).abs() < 0.01
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{:.2}fps", self.width, self.height, self.fps)
    }
}

/// Per-frame accepted ball position for one pitch video, absences included.
///
/// `positions.len()` always equals the video's frame count; index i is
/// frame i.
#[derive(Debug, Clone)]
pub struct PitchTrajectory {
    pub source: PathBuf,
    pub positions: Vec<Option<na::Point2<f32>>>,
    pub geometry: Geometry,
}

impl PitchTrajectory {
    /// Validates the minimum-detections floor and wraps the per-frame
    /// stream into a trajectory.
    pub fn build(
        source: PathBuf,
        positions: Vec<Option<na::Point2<f32>>>,
        geometry: Geometry,
        min_detection_ratio: f32,
    ) -> Result<Self, Error> {
        let frames = positions.len();
        let found = positions.iter().flatten().count();
        let required = (frames as f32 * min_detection_ratio).ceil() as usize;

        if found < required {
            return Err(Error::InsufficientDetections {
                found,
                required,
                frames,
            });
        }

        Ok(Self {
            source,
            positions,
            geometry,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn detections(&self) -> usize {
        self.positions.iter().flatten().count()
    }
}

/// Runs the detector over every frame of one pitch video and produces its
/// trajectory. A failed inference call on a single frame degrades to an
/// absence for that frame; the whole pitch fails only on I/O problems or
/// when the minimum-detections floor is not met.
pub fn extract<D: Detector + ?Sized>(
    video: &Path,
    detector: &Mutex<D>,
    config: &OverlayConfig,
    sink: &dyn Sink,
) -> Result<PitchTrajectory, Error> {
    let mut cam = videoio::VideoCapture::from_file(&video.to_string_lossy(), videoio::CAP_ANY)?;

    if !cam.is_opened()? {
        return Err(Error::OpenVideo(video.to_path_buf()));
    }

    let geometry = Geometry {
        width: cam.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32,
        height: cam.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32,
        fps: cam.get(videoio::CAP_PROP_FPS)?,
    };

    if geometry.width <= 0 || geometry.height <= 0 {
        return Err(Error::OpenVideo(video.to_path_buf()));
    }

    let filter = config.filter();
    let mut dump = if config.dump_detections {
        let file = std::fs::File::create(video.with_extension("dets"))?;
        Some(std::io::BufWriter::new(file))
    } else {
        None
    };

    let mut positions = Vec::new();
    let mut frame = Mat::default();
    let mut frame_index = 0usize;

    loop {
        if !cam.read(&mut frame)? {
            break;
        }

        if frame.cols() == 0 || frame.rows() == 0 {
            break;
        }

        let dets = {
            let mut guard = detector.lock().unwrap_or_else(PoisonError::into_inner);
            guard.detect(&frame)
        };

        let dets = match dets {
            Ok(dets) => dets,
            Err(error) => {
                sink.event(Event::DetectorFailed {
                    video: video.to_path_buf(),
                    frame_index,
                    error,
                });
                positions.push(None);
                frame_index += 1;
                continue;
            }
        };

        if let Some(out) = dump.as_mut() {
            writeln!(out, "{}: {}", frame_index, serde_json::to_string(&dets)?)?;
        }

        positions.push(filter.select(dets).map(|d| na::Point2::new(d.x, d.y)));
        frame_index += 1;
    }

    if positions.is_empty() {
        return Err(Error::OpenVideo(video.to_path_buf()));
    }

    if let Some(mut out) = dump {
        out.flush()?;
    }

    PitchTrajectory::build(
        video.to_path_buf(),
        positions,
        geometry,
        config.min_detection_ratio,
    )
}
