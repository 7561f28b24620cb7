use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::detection::domain::detection_result::{DetectedBox, DetectionResult};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::segmentation::{SegmentationRequest, SegmentationResult};
use crate::shared::frame::Frame;
use crate::shared::BoxError;

enum Scripted<T> {
    Value(T),
    Failure(String),
}

/// Replays pre-computed detector output, one scripted entry per call.
///
/// Used to re-run recorded model output through the pipeline and to
/// drive the pipeline deterministically in tests. Once a script runs out
/// the detector returns empty results, or starts over when built with
/// [`ScriptedDetector::repeating`].
pub struct ScriptedDetector {
    class_names: Vec<String>,
    tracks: VecDeque<Scripted<Vec<DetectedBox>>>,
    segments: VecDeque<Scripted<SegmentationResult>>,
    repeat: bool,
    delay: Duration,
    probe: ScriptProbe,
}

/// Call counters that stay readable after the detector moves into a worker.
#[derive(Clone, Debug, Default)]
pub struct ScriptProbe {
    track_calls: Arc<AtomicUsize>,
    segment_calls: Arc<AtomicUsize>,
}

impl ScriptProbe {
    pub fn track_calls(&self) -> usize {
        self.track_calls.load(Ordering::SeqCst)
    }

    pub fn segment_calls(&self) -> usize {
        self.segment_calls.load(Ordering::SeqCst)
    }
}

impl ScriptedDetector {
    pub fn new(class_names: Vec<String>) -> Self {
        Self {
            class_names,
            tracks: VecDeque::new(),
            segments: VecDeque::new(),
            repeat: false,
            delay: Duration::ZERO,
            probe: ScriptProbe::default(),
        }
    }

    pub fn with_cycle(mut self, boxes: Vec<DetectedBox>) -> Self {
        self.tracks.push_back(Scripted::Value(boxes));
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.tracks.push_back(Scripted::Failure(message.to_string()));
        self
    }

    pub fn with_segmentation(mut self, result: SegmentationResult) -> Self {
        self.segments.push_back(Scripted::Value(result));
        self
    }

    pub fn with_segmentation_failure(mut self, message: &str) -> Self {
        self.segments
            .push_back(Scripted::Failure(message.to_string()));
        self
    }

    /// Simulated inference latency applied to every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn probe(&self) -> ScriptProbe {
        self.probe.clone()
    }

    fn next<T: Clone>(queue: &mut VecDeque<Scripted<T>>, repeat: bool) -> Option<Result<T, BoxError>> {
        let entry = queue.pop_front()?;
        let result = match &entry {
            Scripted::Value(v) => Ok(v.clone()),
            Scripted::Failure(msg) => Err(msg.clone().into()),
        };
        if repeat {
            queue.push_back(entry);
        }
        Some(result)
    }
}

impl ObjectDetector for ScriptedDetector {
    fn track(&mut self, frame: &Frame) -> Result<DetectionResult, BoxError> {
        self.probe.track_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let boxes = Self::next(&mut self.tracks, self.repeat).unwrap_or(Ok(Vec::new()))?;
        Ok(DetectionResult::new(boxes, frame.index()))
    }

    fn segment(
        &mut self,
        _frame: &Frame,
        _request: &SegmentationRequest,
    ) -> Result<SegmentationResult, BoxError> {
        self.probe.segment_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Self::next(&mut self.segments, self.repeat).unwrap_or(Ok(SegmentationResult::default()))
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    fn frame(index: usize) -> Frame {
        Frame::solid(10, 10, [0, 0, 0], index)
    }

    fn boxed(track_id: u32) -> DetectedBox {
        DetectedBox {
            bbox: BoundingBox::new(1, 1, 5, 5),
            confidence: 0.9,
            class_id: 0,
            track_id: Some(track_id),
        }
    }

    #[test]
    fn test_replays_cycles_in_order() {
        let mut detector = ScriptedDetector::new(vec!["cup".into()])
            .with_cycle(vec![boxed(1)])
            .with_cycle(vec![boxed(2), boxed(3)]);

        assert_eq!(detector.track(&frame(0)).unwrap().track_ids(), vec![1]);
        assert_eq!(detector.track(&frame(1)).unwrap().track_ids(), vec![2, 3]);
        assert!(detector.track(&frame(2)).unwrap().is_empty());
    }

    #[test]
    fn test_result_tagged_with_frame_index() {
        let mut detector = ScriptedDetector::new(vec![]).with_cycle(vec![boxed(1)]);
        assert_eq!(detector.track(&frame(42)).unwrap().source_frame, 42);
    }

    #[test]
    fn test_repeating_script_wraps() {
        let mut detector = ScriptedDetector::new(vec![])
            .with_cycle(vec![boxed(1)])
            .with_failure("boom")
            .repeating();

        assert!(detector.track(&frame(0)).is_ok());
        assert!(detector.track(&frame(1)).is_err());
        assert!(detector.track(&frame(2)).is_ok());
    }

    #[test]
    fn test_probe_counts_calls() {
        let mut detector = ScriptedDetector::new(vec![]);
        let probe = detector.probe();
        detector.track(&frame(0)).unwrap();
        detector
            .segment(&frame(0), &SegmentationRequest::new(["cup"]))
            .unwrap();
        detector
            .segment(&frame(0), &SegmentationRequest::new(["cup"]))
            .unwrap();
        assert_eq!(probe.track_calls(), 1);
        assert_eq!(probe.segment_calls(), 2);
    }

    #[test]
    fn test_segmentation_failure() {
        let mut detector =
            ScriptedDetector::new(vec![]).with_segmentation_failure("out of memory");
        let err = detector
            .segment(&frame(0), &SegmentationRequest::new(["cup"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "out of memory");
    }
}
