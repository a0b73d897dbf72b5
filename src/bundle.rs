use crate::error::Error;
use crate::trajectory::{Geometry, PitchTrajectory};

/// All trajectories of one pitching-sequence directory, aligned on a common
/// frame-index timeline and validated to share frame geometry.
///
/// The background frame source is the longest trajectory; ties go to the
/// earliest one in extraction order, which is lexicographic by file name,
/// so the choice is stable across runs.
#[derive(Debug)]
pub struct SequenceBundle {
    trajectories: Vec<PitchTrajectory>,
    geometry: Geometry,
    background: usize,
}

impl SequenceBundle {
    /// Synchronization point after all pitch extractions: validates shared
    /// geometry (taken from the first extracted pitch) and picks the
    /// background source.
    pub fn collect(trajectories: Vec<PitchTrajectory>) -> Result<Self, Error> {
        let first = trajectories.first().ok_or(Error::EmptyBundle)?;
        let geometry = first.geometry;

        for t in &trajectories[1..] {
            if !geometry.matches(&t.geometry) {
                return Err(Error::GeometryMismatch {
                    expected: geometry,
                    found: t.geometry,
                });
            }
        }

        let mut background = 0;
        for (idx, t) in trajectories.iter().enumerate() {
            if t.len() > trajectories[background].len() {
                background = idx;
            }
        }

        Ok(Self {
            trajectories,
            geometry,
            background,
        })
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[inline]
    pub fn trajectories(&self) -> &[PitchTrajectory] {
        &self.trajectories
    }

    #[inline]
    pub fn background(&self) -> &PitchTrajectory {
        &self.trajectories[self.background]
    }

    /// Length of the output video in frames.
    #[inline]
    pub fn max_len(&self) -> usize {
        self.trajectories.iter().map(|t| t.len()).max().unwrap_or(0)
    }
}
