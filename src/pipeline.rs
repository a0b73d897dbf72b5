use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::bundle::SequenceBundle;
use crate::config::OverlayConfig;
use crate::detector::Detector;
use crate::error::Error;
use crate::overlay::OverlayCompositor;
use crate::report::{Event, Sink};
use crate::sink::VideoSink;
use crate::trajectory;

/// What happened to one sequence directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written { output: PathBuf, frames: usize },
    /// The overlay already existed; nothing was read or written.
    AlreadyPresent,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Output file for a sequence directory: `<dir-name>_overlay.mp4` inside it.
pub fn overlay_path(dir: &Path) -> PathBuf {
    let stem = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sequence".to_string());

    dir.join(format!("{stem}_overlay.mp4"))
}

fn pitch_videos(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut videos = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;

        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if name.starts_with('.') || name.ends_with(".dets") || name.ends_with("_overlay.mp4") {
            continue;
        }

        videos.push(path);
    }

    // directory iteration order is platform-dependent; pitch order decides
    // color assignment, so pin it down
    videos.sort();

    Ok(videos)
}

/// Runs the whole per-directory pipeline: extract each pitch, align, render
/// and encode. Pitch-level failures are reported and skipped; directory-level
/// failures bubble up to the batch driver.
pub fn process_sequence<D: Detector + ?Sized>(
    dir: &Path,
    detector: &Mutex<D>,
    config: &OverlayConfig,
    sink: &dyn Sink,
) -> Result<Outcome, Error> {
    let output = overlay_path(dir);

    if output.exists() {
        sink.event(Event::SequenceSkipped {
            dir: dir.to_path_buf(),
            output,
        });
        return Ok(Outcome::AlreadyPresent);
    }

    let mut trajectories = Vec::new();

    for video in pitch_videos(dir)? {
        sink.event(Event::PitchStarted {
            video: video.clone(),
        });

        match trajectory::extract(&video, detector, config, sink) {
            Ok(t) => {
                sink.event(Event::TrajectoryExtracted {
                    video,
                    frames: t.len(),
                    detections: t.detections(),
                });
                trajectories.push(t);
            }
            Err(error) => sink.event(Event::PitchSkipped { video, error }),
        }
    }

    let bundle = SequenceBundle::collect(trajectories)?;

    let encoded = (|| {
        let mut out = VideoSink::create(&output, bundle.geometry())?;

        for frame in OverlayCompositor::new(&bundle, sink) {
            out.write(&frame)?;
        }

        out.finish()
    })();

    let frames = match encoded {
        Ok(frames) => frames,
        Err(error) => {
            // a partial overlay would be mistaken for a finished one next run
            let _ = fs::remove_file(&output);
            return Err(error);
        }
    };

    sink.event(Event::OutputWritten {
        output: output.clone(),
        frames,
    });

    Ok(Outcome::Written { output, frames })
}

/// Batch driver: one independent pipeline per sequence directory, run on the
/// rayon pool. Unit failures are reported and never abort the batch; only an
/// unreadable input root is an error.
pub fn run_batch<D: Detector + Send + ?Sized>(
    root: &Path,
    detector: &Mutex<D>,
    config: &OverlayConfig,
    sink: &dyn Sink,
) -> Result<BatchSummary, Error> {
    let mut dirs = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    let total = dirs.len();

    let summary = dirs
        .par_iter()
        .enumerate()
        .map(|(idx, dir)| {
            sink.event(Event::SequenceStarted {
                dir: dir.clone(),
                index: idx + 1,
                total,
            });

            match process_sequence(dir.as_path(), detector, config, sink) {
                Ok(Outcome::Written { .. }) => BatchSummary {
                    written: 1,
                    ..Default::default()
                },
                Ok(Outcome::AlreadyPresent) => BatchSummary {
                    skipped: 1,
                    ..Default::default()
                },
                Err(error) => {
                    sink.event(Event::SequenceFailed {
                        dir: dir.clone(),
                        error,
                    });
                    BatchSummary {
                        failed: 1,
                        ..Default::default()
                    }
                }
            }
        })
        .reduce(BatchSummary::default, |a, b| BatchSummary {
            written: a.written + b.written,
            skipped: a.skipped + b.skipped,
            failed: a.failed + b.failed,
        });

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::report::test_sink::CollectSink;
    use opencv::core::Mat;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts inference calls; the idempotence tests assert it stays at 0.
    #[derive(Default)]
    struct CountingDetector {
        calls: AtomicUsize,
    }

    impl Detector for CountingDetector {
        fn detect(&mut self, _frame: &Mat) -> Result<Vec<Detection>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn setup() -> (Mutex<CountingDetector>, OverlayConfig, CollectSink) {
        (
            Mutex::new(CountingDetector::default()),
            OverlayConfig::default(),
            CollectSink::default(),
        )
    }

    #[test]
    fn overlay_path_uses_directory_name() {
        assert_eq!(
            overlay_path(Path::new("/data/seq1")),
            PathBuf::from("/data/seq1/seq1_overlay.mp4")
        );
    }

    #[test]
    fn existing_output_skips_without_any_reads() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("seq1");
        fs::create_dir(&seq).unwrap();
        fs::write(seq.join("pitch1.mp4"), b"not really a video").unwrap();
        fs::write(seq.join("seq1_overlay.mp4"), b"existing overlay").unwrap();

        let (detector, config, sink) = setup();
        let outcome = process_sequence(&seq, &detector, &config, &sink).unwrap();

        assert_eq!(outcome, Outcome::AlreadyPresent);
        assert_eq!(detector.lock().unwrap().calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            fs::read(seq.join("seq1_overlay.mp4")).unwrap(),
            b"existing overlay"
        );

        let events = sink.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SequenceSkipped { .. })));
    }

    #[test]
    fn unreadable_pitches_degrade_to_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("seq1");
        fs::create_dir(&seq).unwrap();
        fs::write(seq.join("pitch1.mp4"), b"garbage").unwrap();
        fs::write(seq.join("pitch2.mp4"), b"more garbage").unwrap();

        let (detector, config, sink) = setup();
        let err = process_sequence(&seq, &detector, &config, &sink).unwrap_err();

        assert!(matches!(err, Error::EmptyBundle));

        let events = sink.events.lock().unwrap();
        let skipped = events
            .iter()
            .filter(|e| matches!(e, Event::PitchSkipped { .. }))
            .count();
        assert_eq!(skipped, 2);
    }

    #[test]
    fn sidecar_and_hidden_files_are_not_pitches() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("seq1");
        fs::create_dir(&seq).unwrap();
        fs::write(seq.join("b.mp4"), b"x").unwrap();
        fs::write(seq.join("a.mp4"), b"x").unwrap();
        fs::write(seq.join("a.dets"), b"x").unwrap();
        fs::write(seq.join(".hidden"), b"x").unwrap();

        let videos = pitch_videos(&seq).unwrap();

        assert_eq!(videos, vec![seq.join("a.mp4"), seq.join("b.mp4")]);
    }

    #[test]
    fn batch_continues_past_failing_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["seq_a", "seq_b"] {
            let seq = dir.path().join(name);
            fs::create_dir(&seq).unwrap();
            fs::write(seq.join("pitch1.mp4"), b"garbage").unwrap();
        }
        let done = dir.path().join("seq_c");
        fs::create_dir(&done).unwrap();
        fs::write(done.join("seq_c_overlay.mp4"), b"existing").unwrap();

        let (detector, config, sink) = setup();
        let summary = run_batch(dir.path(), &detector, &config, &sink).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                written: 0,
                skipped: 1,
                failed: 2,
            }
        );
    }

    #[test]
    fn invalid_root_is_an_error() {
        let (detector, config, sink) = setup();

        assert!(run_batch(Path::new("/no/such/root"), &detector, &config, &sink).is_err());
    }
}
