use std::path::{Path, PathBuf};

use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio,
};

use crate::error::Error;
use crate::trajectory::Geometry;

/// Encodes a composite frame stream to an mp4 file at the source geometry.
pub struct VideoSink {
    writer: videoio::VideoWriter,
    path: PathBuf,
    frames: usize,
}

impl VideoSink {
    pub fn create(path: &Path, geometry: Geometry) -> Result<Self, Error> {
        let fourcc = videoio::VideoWriter::fourcc(b'm' as _, b'p' as _, b'4' as _, b'v' as _)?;

        let writer = videoio::VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            geometry.fps,
            core::Size::new(geometry.width, geometry.height),
            true,
        )?;

        if !writer.is_opened()? {
            return Err(Error::Encode(format!(
                "cannot open {} for writing",
                path.display()
            )));
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            frames: 0,
        })
    }

    pub fn write(&mut self, frame: &Mat) -> Result<(), Error> {
        self.writer.write(frame)?;
        self.frames += 1;
        Ok(())
    }

    /// Flushes the container. An empty stream is an encode error, not a
    /// valid zero-length video.
    pub fn finish(mut self) -> Result<usize, Error> {
        if self.frames == 0 {
            return Err(Error::Encode(format!(
                "no frames written to {}",
                self.path.display()
            )));
        }

        self.writer.release()?;
        Ok(self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> Geometry {
        Geometry {
            width: 64,
            height: 48,
            fps: 30.0,
        }
    }

    #[test]
    fn unwritable_target_is_an_encode_error() {
        let path = Path::new("/nonexistent-dir/深/out_overlay.mp4");

        match VideoSink::create(path, geom()) {
            Err(Error::Encode(_)) => {}
            Err(Error::OpenCv(_)) => {} // some backends throw instead
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected encode failure"),
        }
    }
}
