use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};

use crate::bundle::SequenceBundle;
use crate::error::Error;
use crate::report::{Event, Sink};

/// Trail mark radius in pixels.
const MARK_RADIUS: i32 = 4;

/// BGR palette, one stable color per trajectory, cycling when a sequence
/// has more pitches than entries.
const PALETTE: [(f64, f64, f64); 8] = [
    (0.0, 0.0, 255.0),
    (0.0, 255.0, 0.0),
    (255.0, 0.0, 0.0),
    (0.0, 255.0, 255.0),
    (255.0, 0.0, 255.0),
    (255.0, 255.0, 0.0),
    (0.0, 128.0, 255.0),
    (255.0, 128.0, 0.0),
];

#[inline]
pub fn trail_color(index: usize) -> core::Scalar {
    let (b, g, r) = PALETTE[index % PALETTE.len()];
    core::Scalar::new(b, g, r, 0.0)
}

/// Lazy composite-frame stream: one frame per index `0..bundle.max_len()`.
///
/// Background frames are consumed from the bundle's background pitch video
/// as the iterator advances; once the source is exhausted (or if it cannot
/// be opened at all) a blank canvas is substituted. Trails accumulate
/// monotonically: every accepted position with frame index `<= i` is drawn
/// on composite frame `i`.
pub struct OverlayCompositor<'a> {
    bundle: &'a SequenceBundle,
    sink: &'a dyn Sink,
    background: Option<videoio::VideoCapture>,
    index: usize,
    len: usize,
}

impl<'a> OverlayCompositor<'a> {
    pub fn new(bundle: &'a SequenceBundle, sink: &'a dyn Sink) -> Self {
        let source = &bundle.background().source;
        let background =
            match videoio::VideoCapture::from_file(&source.to_string_lossy(), videoio::CAP_ANY) {
                Ok(cam) if cam.is_opened().unwrap_or(false) => Some(cam),
                _ => {
                    sink.event(Event::BackgroundUnavailable {
                        video: source.clone(),
                    });
                    None
                }
            };

        Self {
            bundle,
            sink,
            background,
            index: 0,
            len: bundle.max_len(),
        }
    }

    fn blank(&self) -> Result<Mat, Error> {
        let geometry = self.bundle.geometry();

        Ok(Mat::new_rows_cols_with_default(
            geometry.height,
            geometry.width,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )?)
    }

    fn background_frame(&mut self) -> Result<Mat, Error> {
        if let Some(cam) = self.background.as_mut() {
            let mut frame = Mat::default();

            if cam.read(&mut frame)? && frame.cols() > 0 && frame.rows() > 0 {
                return Ok(frame);
            }

            // exhausted; blank canvas from here on
            self.background = None;
        }

        self.blank()
    }

    fn render(&mut self) -> Result<Mat, Error> {
        let mut frame = self.background_frame()?;

        for (idx, trajectory) in self.bundle.trajectories().iter().enumerate() {
            let color = trail_color(idx);
            let until = trajectory.positions.len().min(self.index + 1);

            for pos in trajectory.positions[..until].iter().flatten() {
                imgproc::circle(
                    &mut frame,
                    core::Point::new(pos.x as i32, pos.y as i32),
                    MARK_RADIUS,
                    color,
                    imgproc::FILLED,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }

        Ok(frame)
    }
}

impl Iterator for OverlayCompositor<'_> {
    type Item = Mat;

    fn next(&mut self) -> Option<Mat> {
        if self.index >= self.len {
            return None;
        }

        // one bad frame never aborts the stream
        let frame = match self.render() {
            Ok(frame) => frame,
            Err(error) => {
                self.sink.event(Event::FrameRenderFailed {
                    frame_index: self.index,
                    error,
                });
                self.blank().unwrap_or_default()
            }
        };

        self.index += 1;
        Some(frame)
    }
}
