use crate::shared::bounding_box::BoundingBox;

/// One tracked box from a detector cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedBox {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    /// Stable across cycles for the same physical object. `None` when the
    /// detector does not track.
    pub track_id: Option<u32>,
}

/// Ordered boxes from one detector cycle, tagged with the index of the
/// frame they were computed from.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DetectionResult {
    pub boxes: Vec<DetectedBox>,
    pub source_frame: usize,
}

impl DetectionResult {
    pub fn new(boxes: Vec<DetectedBox>, source_frame: usize) -> Self {
        Self {
            boxes,
            source_frame,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn track_ids(&self) -> Vec<u32> {
        self.boxes.iter().filter_map(|b| b.track_id).collect()
    }
}
