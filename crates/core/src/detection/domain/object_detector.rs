use std::sync::{Arc, Mutex};

use crate::shared::color::ClassPalette;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

use super::detection_result::DetectionResult;
use super::segmentation::{SegmentationRequest, SegmentationResult};

/// Domain interface for the detection/segmentation model.
///
/// Implementations may be stateful (e.g., tracking across frames),
/// hence `&mut self`.
pub trait ObjectDetector: Send {
    /// Detects and tracks objects in one frame.
    fn track(&mut self, frame: &Frame) -> Result<DetectionResult, BoxError>;

    /// Segments instances of the requested classes in one frame.
    fn segment(
        &mut self,
        frame: &Frame,
        request: &SegmentationRequest,
    ) -> Result<SegmentationResult, BoxError>;

    /// Class labels indexed by class id.
    fn class_names(&self) -> &[String];

    /// Deterministic per-class colours, fixed for the model's lifetime.
    fn palette(&self) -> ClassPalette {
        ClassPalette::for_class_count(self.class_names().len())
    }
}

/// A detector shared between the background worker and on-demand
/// segmentation passes. The lock serializes inference only; it is never
/// held together with the pipeline state lock.
pub type SharedDetector = Arc<Mutex<Box<dyn ObjectDetector>>>;

pub fn share(detector: Box<dyn ObjectDetector>) -> SharedDetector {
    Arc::new(Mutex::new(detector))
}
