use std::path::Path;

use opencv::{
    core::{self, Mat},
    dnn,
    prelude::*,
};

use crate::detection::Detection;
use crate::error::Error;

/// External inference collaborator: given a decoded frame, returns zero or
/// more candidate ball boxes in pixel units. Implementations are free to be
/// noisy; the detection filter owns score/IoU policy.
pub trait Detector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>, Error>;
}

pub struct DnnDetectorConfig {
    /// Square side of the network input, e.g. 416.
    pub input_size: i32,
    /// Candidates below this are not worth returning at all. The real
    /// score threshold is applied later by the detection filter.
    pub candidate_floor: f32,
}

impl DnnDetectorConfig {
    pub fn new(input_size: i32) -> Self {
        Self {
            input_size,
            candidate_floor: 0.1,
        }
    }
}

/// YOLO-style single-class ball detector running on the OpenCV DNN module.
///
/// Expects each output row as `[cx, cy, w, h, score..]` with box coordinates
/// normalized to the network input; the best per-row score is the candidate
/// confidence.
pub struct DnnDetector {
    net: dnn::Net,
    config: DnnDetectorConfig,
}

impl DnnDetector {
    pub fn new(model: &Path, config: DnnDetectorConfig) -> Result<Self, Error> {
        let net = dnn::read_net_from_onnx(&model.to_string_lossy())?;

        Ok(Self { net, config })
    }

    fn decode(&self, out: &Mat, fw: f32, fh: f32, results: &mut Vec<Detection>) -> Result<(), Error> {
        let dims = out.mat_size();
        let pred_size = dims[dims.len() - 1] as usize;

        if pred_size < 5 {
            return Err(Error::Detector(format!(
                "unexpected model output row size {}",
                pred_size
            )));
        }

        let data = out.data_typed::<f32>()?;

        for pred in data.chunks_exact(pred_size) {
            let confidence = pred[4..].iter().copied().fold(0.0f32, f32::max);

            if confidence < self.config.candidate_floor {
                continue;
            }

            let (x, y, w, h) = (pred[0] * fw, pred[1] * fh, pred[2] * fw, pred[3] * fh);

            // the ball is small; a box this large is garbage
            if w * h > (fw / 2.0) * (fh / 2.0) {
                continue;
            }

            results.push(Detection {
                x,
                y,
                w,
                h,
                confidence,
            });
        }

        Ok(())
    }
}

impl Detector for DnnDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>, Error> {
        let (fw, fh) = (frame.cols() as f32, frame.rows() as f32);
        let size = core::Size::new(self.config.input_size, self.config.input_size);

        let blob = dnn::blob_from_image(
            frame,
            1.0 / 255.0,
            size,
            core::Scalar::default(),
            true,
            false,
            core::CV_32F,
        )?;

        self.net
            .set_input(&blob, "", 1.0, core::Scalar::default())?;

        let names = self.net.get_unconnected_out_layers_names()?;
        let mut outputs = core::Vector::<Mat>::new();
        self.net.forward(&mut outputs, &names)?;

        let mut results = Vec::new();
        for out in outputs.iter() {
            self.decode(&out, fw, fh, &mut results)?;
        }

        Ok(results)
    }
}
