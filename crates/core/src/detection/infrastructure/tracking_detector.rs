use crate::detection::domain::detection_result::{DetectedBox, DetectionResult};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::segmentation::{SegmentationRequest, SegmentationResult};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::TRACKER_MAX_LOST;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

use super::bytetrack_tracker::{ByteTracker, Detection};

/// Decorator that gives an untracked detector stable track ids.
///
/// Boxes from the inner detector are fed to a [`ByteTracker`]; only boxes
/// that end up on an active track are returned, each stamped with the
/// track's id. Segmentation passes straight through.
pub struct TrackingDetector {
    inner: Box<dyn ObjectDetector>,
    tracker: ByteTracker,
}

impl TrackingDetector {
    pub fn new(inner: Box<dyn ObjectDetector>) -> Self {
        Self::with_max_lost(inner, TRACKER_MAX_LOST)
    }

    pub fn with_max_lost(inner: Box<dyn ObjectDetector>, max_lost: usize) -> Self {
        Self {
            inner,
            tracker: ByteTracker::new(max_lost),
        }
    }
}

impl ObjectDetector for TrackingDetector {
    fn track(&mut self, frame: &Frame) -> Result<DetectionResult, BoxError> {
        let raw = self.inner.track(frame)?;
        let detections: Vec<Detection> = raw
            .boxes
            .iter()
            .map(|b| Detection {
                bbox: b.bbox.corners(),
                score: b.confidence as f64,
                class_id: b.class_id,
            })
            .collect();

        let boxes = self
            .tracker
            .update(&detections)
            .into_iter()
            .filter_map(|track| {
                let source = &raw.boxes[track.det_index?];
                Some(DetectedBox {
                    bbox: BoundingBox::from_corners(track.bbox),
                    confidence: source.confidence,
                    class_id: track.class_id,
                    track_id: Some(track.id),
                })
            })
            .collect();

        Ok(DetectionResult::new(boxes, raw.source_frame))
    }

    fn segment(
        &mut self,
        frame: &Frame,
        request: &SegmentationRequest,
    ) -> Result<SegmentationResult, BoxError> {
        self.inner.segment(frame, request)
    }

    fn class_names(&self) -> &[String] {
        self.inner.class_names()
    }
}
