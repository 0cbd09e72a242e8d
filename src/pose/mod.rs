pub mod landmark;
pub mod source;

pub use landmark::{FaceBlend, Landmark, LandmarkIndex, PoseFrame, MIN_VISIBILITY};
pub use source::{FrameResult, LandmarkSource, TraceSource};
