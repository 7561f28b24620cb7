use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::segmentation::SegmentationResult;
use crate::shared::frame::Frame;

/// What to draw on one outgoing frame, borrowed from a pipeline snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayLayers<'a> {
    pub show_boxes: bool,
    pub detection: Option<&'a DetectionResult>,
    /// Only live (unexpired) segmentation is ever passed in.
    pub segmentation: Option<&'a SegmentationResult>,
}

/// Record of what an annotation pass actually drew.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayReport {
    /// Track ids of drawn boxes, in draw order. Untracked boxes are
    /// recorded as `None`.
    pub boxes: Vec<Option<u32>>,
    /// Frame index the drawn boxes were computed from.
    pub detection_frame: Option<usize>,
    /// Class names of drawn segmentation instances, in draw order.
    pub instances: Vec<String>,
}

impl OverlayReport {
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.instances.is_empty()
    }
}

/// Domain interface for drawing inference results onto a frame.
///
/// Implementations modify the frame in place and never run inference.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &mut Frame, layers: OverlayLayers<'_>) -> OverlayReport;
}
