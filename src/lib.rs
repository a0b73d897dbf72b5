pub mod bundle;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod filter;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod trajectory;

pub use bundle::SequenceBundle;
pub use config::OverlayConfig;
pub use detection::Detection;
pub use detector::{Detector, DnnDetector, DnnDetectorConfig};
pub use error::Error;
pub use filter::DetectionFilter;
pub use overlay::OverlayCompositor;
pub use pipeline::{run_batch, BatchSummary, Outcome};
pub use report::{Event, Sink, TracingSink};
pub use sink::VideoSink;
pub use trajectory::{Geometry, PitchTrajectory};
