use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::segmentation::{SegmentationRequest, SegmentationResult};
use crate::shared::frame::Frame;

use super::segmentation_cache::SegmentationCache;

/// The live search as seen in a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationSnapshot {
    pub request: SegmentationRequest,
    pub result: Option<SegmentationResult>,
    pub created_at: Instant,
}

/// Deep copy of every slot, taken under one lock acquisition.
///
/// Fields may be stale relative to each other (detection lags the newest
/// frame) but always come from the same lock epoch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineSnapshot {
    pub frame: Option<Frame>,
    pub detection: Option<DetectionResult>,
    pub segmentation: Option<SegmentationSnapshot>,
}

/// What the detection worker needs for one cycle.
#[derive(Clone, Debug)]
pub struct WorkerInput {
    pub frame: Frame,
    /// Active search still waiting on (or refreshing) its segmentation,
    /// with the generation to publish the result under.
    pub pending: Option<(u64, SegmentationRequest)>,
}

/// Result of one worker cycle, published atomically.
#[derive(Clone, Debug, Default)]
pub struct CycleOutput {
    pub detection: Option<DetectionResult>,
    pub segmentation: Option<(u64, SegmentationResult)>,
}

#[derive(Debug)]
struct Slots {
    frame: Option<Frame>,
    detection: Option<DetectionResult>,
    segmentation: SegmentationCache,
    accepting: bool,
}

/// The single mutex-guarded bundle every execution context goes through.
///
/// Frames are last-write-wins. All reads hand back deep copies. Once
/// [`SharedPipelineState::stop_accepting`] is called every write is
/// ignored, so a worker that is still finishing its cycle cannot repopulate
/// state that is about to be cleared.
#[derive(Debug)]
pub struct SharedPipelineState {
    slots: Mutex<Slots>,
    /// Box display toggle. Read without the slot lock, so a box computed
    /// while enabled can still be drawn right after it is disabled.
    show_boxes: AtomicBool,
}

impl SharedPipelineState {
    pub fn new(segmentation_window: Duration, show_boxes: bool) -> Self {
        Self {
            slots: Mutex::new(Slots {
                frame: None,
                detection: None,
                segmentation: SegmentationCache::new(segmentation_window),
                accepting: true,
            }),
            show_boxes: AtomicBool::new(show_boxes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn show_boxes(&self) -> bool {
        self.show_boxes.load(Ordering::Acquire)
    }

    pub fn set_show_boxes(&self, enabled: bool) {
        self.show_boxes.store(enabled, Ordering::Release);
    }

    /// Copies `frame` in. Returns false once ingestion has stopped.
    pub fn set_frame(&self, frame: &Frame) -> bool {
        let mut slots = self.lock();
        if !slots.accepting {
            return false;
        }
        slots.frame = Some(frame.clone());
        true
    }

    pub fn set_detection(&self, detection: Option<DetectionResult>) {
        let mut slots = self.lock();
        if slots.accepting {
            slots.detection = detection;
        }
    }

    /// Starts a new search stamped `at`. Returns its generation, or `None`
    /// if it was not stored (empty request, older than the live search,
    /// or ingestion stopped).
    pub fn set_segmentation(
        &self,
        request: SegmentationRequest,
        result: Option<SegmentationResult>,
        at: Instant,
    ) -> Option<u64> {
        let mut slots = self.lock();
        if !slots.accepting {
            return None;
        }
        slots.segmentation.set(request, result, at)
    }

    /// Writes one worker cycle's detection and segmentation together.
    /// Segmentation for a superseded or expired search is dropped.
    pub fn publish_cycle(&self, output: CycleOutput) {
        let mut slots = self.lock();
        if !slots.accepting {
            return;
        }
        slots.detection = output.detection;
        if let Some((generation, result)) = output.segmentation {
            if !slots.segmentation.update_result(generation, result) {
                log::debug!("Dropped segmentation for superseded search {generation}");
            }
        }
    }

    /// Copies every slot under one lock. An expired search is cleared
    /// before copying and reads as absent.
    pub fn snapshot(&self, now: Instant) -> PipelineSnapshot {
        let mut slots = self.lock();
        let segmentation = slots
            .segmentation
            .current(now)
            .map(|entry| SegmentationSnapshot {
                request: entry.value.request.clone(),
                result: entry.value.result.clone(),
                created_at: entry.created_at,
            });
        PipelineSnapshot {
            frame: slots.frame.clone(),
            detection: slots.detection.clone(),
            segmentation,
        }
    }

    pub fn latest_frame(&self) -> Option<Frame> {
        self.lock().frame.clone()
    }

    /// The newest frame plus any search awaiting segmentation, or `None`
    /// when no frame has arrived yet.
    pub fn worker_input(&self, now: Instant) -> Option<WorkerInput> {
        let mut slots = self.lock();
        let frame = slots.frame.clone()?;
        let pending = slots
            .segmentation
            .current(now)
            .map(|entry| (entry.value.generation, entry.value.request.clone()));
        Some(WorkerInput { frame, pending })
    }

    /// Refuses every later write. Reads keep working until [`clear`].
    ///
    /// [`clear`]: SharedPipelineState::clear
    pub fn stop_accepting(&self) {
        self.lock().accepting = false;
    }

    pub fn is_accepting(&self) -> bool {
        self.lock().accepting
    }

    /// Resets every slot to absent.
    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.frame = None;
        slots.detection = None;
        slots.segmentation.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use crate::detection::domain::detection_result::DetectedBox;
    use crate::shared::bounding_box::BoundingBox;

    const WINDOW: Duration = Duration::from_secs(20);

    fn state() -> SharedPipelineState {
        SharedPipelineState::new(WINDOW, true)
    }

    fn frame(index: usize) -> Frame {
        Frame::solid(8, 8, [index as u8, 0, 0], index)
    }

    fn detection(tag: u32) -> DetectionResult {
        DetectionResult::new(
            vec![DetectedBox {
                bbox: BoundingBox::new(10, 10, 40, 40),
                confidence: 0.9,
                class_id: 0,
                track_id: Some(tag),
            }],
            tag as usize,
        )
    }

    fn request(name: &str) -> SegmentationRequest {
        SegmentationRequest::new([name])
    }

    #[test]
    fn test_empty_state_snapshot() {
        let snap = state().snapshot(Instant::now());
        assert_eq!(snap, PipelineSnapshot::default());
    }

    #[test]
    fn test_frame_last_write_wins() {
        let state = state();
        state.set_frame(&frame(1));
        state.set_frame(&frame(2));
        assert_eq!(state.latest_frame().unwrap().index(), 2);
    }

    #[test]
    fn test_latest_frame_returns_independent_copies() {
        let state = state();
        state.set_frame(&frame(1));
        let mut first = state.latest_frame().unwrap();
        state.set_frame(&frame(2));
        let second = state.latest_frame().unwrap();

        first.put_rgb(0, 0, [255, 255, 255]);
        assert_eq!(first.index(), 1);
        assert_eq!(second.index(), 2);
        assert_eq!(second.rgb_at(0, 0), [2, 0, 0]);
        assert_eq!(state.latest_frame().unwrap().rgb_at(0, 0), [2, 0, 0]);
    }

    #[test]
    fn test_snapshot_expires_segmentation() {
        let state = state();
        let t = Instant::now();
        state.set_segmentation(request("key"), Some(SegmentationResult::default()), t);

        assert!(state.snapshot(t + Duration::from_secs(19)).segmentation.is_some());
        assert!(state.snapshot(t + Duration::from_secs(21)).segmentation.is_none());
        // Cleared, not hidden: rewinding the clock does not bring it back.
        assert!(state.snapshot(t).segmentation.is_none());
    }

    #[test]
    fn test_publish_cycle_drops_superseded_segmentation() {
        let state = state();
        let t = Instant::now();
        let old = state.set_segmentation(request("key"), None, t).unwrap();
        state.set_segmentation(request("phone"), None, t + Duration::from_secs(1));

        state.publish_cycle(CycleOutput {
            detection: Some(detection(1)),
            segmentation: Some((old, SegmentationResult::default())),
        });

        let snap = state.snapshot(t + Duration::from_secs(1));
        assert_eq!(snap.detection, Some(detection(1)));
        let seg = snap.segmentation.unwrap();
        assert_eq!(seg.request, request("phone"));
        assert!(seg.result.is_none());
    }

    #[test]
    fn test_worker_input_carries_pending_search() {
        let state = state();
        let t = Instant::now();
        assert!(state.worker_input(t).is_none());

        state.set_frame(&frame(3));
        let generation = state.set_segmentation(request("cup"), None, t).unwrap();
        let input = state.worker_input(t).unwrap();
        assert_eq!(input.frame.index(), 3);
        assert_eq!(input.pending, Some((generation, request("cup"))));
        assert!(state
            .worker_input(t + Duration::from_secs(21))
            .unwrap()
            .pending
            .is_none());
    }

    #[test]
    fn test_writes_ignored_after_stop_accepting() {
        let state = state();
        let t = Instant::now();
        state.set_frame(&frame(1));
        state.stop_accepting();

        assert!(!state.set_frame(&frame(2)));
        state.set_detection(Some(detection(1)));
        state.publish_cycle(CycleOutput {
            detection: Some(detection(2)),
            segmentation: None,
        });
        assert!(state.set_segmentation(request("cup"), None, t).is_none());

        state.clear();
        assert_eq!(state.snapshot(t), PipelineSnapshot::default());
        assert!(!state.is_accepting());
    }

    #[test]
    fn test_show_boxes_toggle() {
        let state = state();
        state.set_show_boxes(false);
        assert!(!state.show_boxes());
    }

    #[test]
    fn test_snapshot_never_torn_across_cycles() {
        // Each cycle publishes a detection and segmentation tagged with the
        // same cycle number; a reader must never see two different tags.
        let state = Arc::new(state());
        let t = Instant::now();
        let generation = state.set_segmentation(request("cup"), None, t).unwrap();

        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for cycle in 1..=500u32 {
                    let seg = SegmentationResult::new(vec![
                        crate::detection::domain::segmentation::SegmentedInstance {
                            class_id: cycle,
                            class_name: "cup".into(),
                            confidence: 1.0,
                            bbox: BoundingBox::new(0, 0, 1, 1),
                            mask: ndarray::Array2::from_elem((1, 1), true),
                            colors: crate::shared::color::ColorPair::from_fill(
                                crate::shared::color::Rgb::WHITE,
                            ),
                        },
                    ]);
                    state.publish_cycle(CycleOutput {
                        detection: Some(detection(cycle)),
                        segmentation: Some((generation, seg)),
                    });
                }
            })
        };

        for _ in 0..500 {
            let snap = state.snapshot(t);
            if let (Some(det), Some(seg)) = (&snap.detection, snap.segmentation) {
                let seg_tag = seg.result.unwrap().instances[0].class_id;
                assert_eq!(det.boxes[0].track_id, Some(seg_tag));
            }
        }
        writer.join().unwrap();
    }
}
