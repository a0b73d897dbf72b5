use std::path::PathBuf;

use crate::error::Error;

/// Structured diagnostic events emitted by the pipeline components.
///
/// Components never log on their own; they hand events to a [`Sink`] and a
/// top-level collector decides how to render them. This keeps verbosity a
/// reporting concern, not an algorithmic one.
#[derive(Debug)]
pub enum Event {
    SequenceStarted {
        dir: PathBuf,
        index: usize,
        total: usize,
    },
    /// The overlay file already exists; nothing was read or written.
    SequenceSkipped { dir: PathBuf, output: PathBuf },
    SequenceFailed { dir: PathBuf, error: Error },
    PitchStarted { video: PathBuf },
    PitchSkipped { video: PathBuf, error: Error },
    /// One frame's inference call failed; counted as an absence.
    DetectorFailed {
        video: PathBuf,
        frame_index: usize,
        error: Error,
    },
    TrajectoryExtracted {
        video: PathBuf,
        frames: usize,
        detections: usize,
    },
    BackgroundUnavailable { video: PathBuf },
    FrameRenderFailed { frame_index: usize, error: Error },
    OutputWritten { output: PathBuf, frames: usize },
}

pub trait Sink: Send + Sync {
    fn event(&self, event: Event);
}

/// Default collector: renders events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn event(&self, event: Event) {
        match event {
            Event::SequenceStarted { dir, index, total } => {
                tracing::info!("[{}/{}] processing {}", index, total, dir.display());
            }
            Event::SequenceSkipped { dir, output } => {
                tracing::info!(
                    "overlay {} already present, skipping {}",
                    output.display(),
                    dir.display()
                );
            }
            Event::SequenceFailed { dir, error } => {
                tracing::error!("sequence {} skipped: {}", dir.display(), error);
            }
            Event::PitchStarted { video } => {
                tracing::info!("tracking ball in {}", video.display());
            }
            Event::PitchSkipped { video, error } => {
                tracing::warn!("pitch {} skipped: {}", video.display(), error);
            }
            Event::DetectorFailed {
                video,
                frame_index,
                error,
            } => {
                tracing::debug!(
                    "detector failed on {} frame {}: {}",
                    video.display(),
                    frame_index,
                    error
                );
            }
            Event::TrajectoryExtracted {
                video,
                frames,
                detections,
            } => {
                tracing::debug!(
                    "{}: {} detections over {} frames",
                    video.display(),
                    detections,
                    frames
                );
            }
            Event::BackgroundUnavailable { video } => {
                tracing::warn!(
                    "background source {} unavailable, using blank canvas",
                    video.display()
                );
            }
            Event::FrameRenderFailed { frame_index, error } => {
                tracing::warn!("frame {} render failed: {}", frame_index, error);
            }
            Event::OutputWritten { output, frames } => {
                tracing::info!("wrote {} ({} frames)", output.display(), frames);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_sink {
    use std::sync::Mutex;

    use super::{Event, Sink};

    /// Test collector that records every event it receives.
    #[derive(Debug, Default)]
    pub struct CollectSink {
        pub events: Mutex<Vec<Event>>,
    }

    impl Sink for CollectSink {
        fn event(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }
}
