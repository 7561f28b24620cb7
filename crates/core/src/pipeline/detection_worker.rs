use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::detection::domain::object_detector::SharedDetector;
use crate::shared::clock::Clock;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::shared_pipeline_state::{CycleOutput, SharedPipelineState};

/// What one worker iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No frame has arrived yet.
    Idle,
    Completed { frame_index: usize },
    /// An inference call failed; its output was published as absent.
    Degraded { frame_index: usize },
}

/// Background loop that keeps detection and segmentation fresh.
///
/// Each cycle works on a private copy of the newest frame, so results lag
/// the stream by however many frames arrived during inference. The cycle
/// interval, not frame arrival, sets the refresh rate.
pub struct DetectionWorker {
    state: Arc<SharedPipelineState>,
    detector: SharedDetector,
    clock: Arc<dyn Clock>,
    dynamic_segmentation: bool,
    logger: Box<dyn PipelineLogger>,
    cycles: usize,
}

impl DetectionWorker {
    pub fn new(
        state: Arc<SharedPipelineState>,
        detector: SharedDetector,
        clock: Arc<dyn Clock>,
        dynamic_segmentation: bool,
    ) -> Self {
        Self {
            state,
            detector,
            clock,
            dynamic_segmentation,
            logger: Box::new(NullPipelineLogger),
            cycles: 0,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn into_logger(self) -> Box<dyn PipelineLogger> {
        self.logger
    }

    /// Runs one iteration. Inference errors are logged and degrade to
    /// absent results for this cycle; they never end the worker.
    pub fn run_once(&mut self) -> CycleOutcome {
        let Some(input) = self.state.worker_input(self.clock.now()) else {
            return CycleOutcome::Idle;
        };
        let frame_index = input.frame.index();
        let mut failed = false;

        let output = {
            let mut detector = self.detector.lock().unwrap_or_else(PoisonError::into_inner);

            let detection = if self.state.show_boxes() {
                let started = Instant::now();
                let tracked = detector.track(&input.frame);
                self.logger.timing("track", elapsed_ms(started));
                match tracked {
                    Ok(result) => {
                        self.logger.metric("boxes", result.len() as f64);
                        Some(result)
                    }
                    Err(e) => {
                        log::warn!("Tracking failed on frame {frame_index}: {e}");
                        failed = true;
                        None
                    }
                }
            } else {
                None
            };

            let segmentation = match input.pending.filter(|_| self.dynamic_segmentation) {
                Some((generation, request)) => {
                    let started = Instant::now();
                    let segmented = detector.segment(&input.frame, &request);
                    self.logger.timing("segment", elapsed_ms(started));
                    match segmented {
                        Ok(result) => Some((generation, result)),
                        Err(e) => {
                            log::warn!("Segmentation failed on frame {frame_index}: {e}");
                            failed = true;
                            None
                        }
                    }
                }
                None => None,
            };

            CycleOutput {
                detection,
                segmentation,
            }
        };

        self.state.publish_cycle(output);
        self.cycles += 1;
        self.logger.progress(self.cycles, 0);
        log::debug!("Worker cycle {} on frame {frame_index}", self.cycles);

        if failed {
            CycleOutcome::Degraded { frame_index }
        } else {
            CycleOutcome::Completed { frame_index }
        }
    }

    /// Moves the worker onto its own thread, running a cycle every
    /// `interval` until the returned handle is stopped or dropped.
    pub fn spawn(mut self, interval: Duration) -> std::io::Result<WorkerHandle> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name("detection-worker".into())
            .spawn(move || {
                self.logger.info("Detection worker started");
                loop {
                    self.run_once();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                self.logger
                    .info(&format!("Detection worker stopped after {} cycles", self.cycles));
                self.logger
            })?;
        Ok(WorkerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Owns the running worker thread. Stopping lets the current cycle finish,
/// then joins. Dropping the handle stops the worker.
pub struct WorkerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<Box<dyn PipelineLogger>>>,
}

impl WorkerHandle {
    /// Signals the loop and waits for it to exit. Returns the worker's
    /// logger on the first call, `None` afterwards or if the thread
    /// panicked.
    pub fn stop(&mut self) -> Option<Box<dyn PipelineLogger>> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(logger) => Some(logger),
            Err(_) => {
                log::error!("Detection worker panicked");
                None
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::detection::domain::detection_result::DetectedBox;
    use crate::detection::domain::object_detector::share;
    use crate::detection::domain::segmentation::{SegmentationRequest, SegmentationResult};
    use crate::detection::infrastructure::scripted_detector::{ScriptProbe, ScriptedDetector};
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::clock::ManualClock;
    use crate::shared::frame::Frame;

    const WINDOW: Duration = Duration::from_secs(20);

    fn boxed(track_id: u32) -> DetectedBox {
        DetectedBox {
            bbox: BoundingBox::new(10, 10, 40, 40),
            confidence: 0.9,
            class_id: 0,
            track_id: Some(track_id),
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::solid(16, 16, [0, 0, 0], index)
    }

    struct Fixture {
        state: Arc<SharedPipelineState>,
        clock: Arc<ManualClock>,
        probe: ScriptProbe,
        worker: DetectionWorker,
    }

    fn fixture(detector: ScriptedDetector, dynamic: bool) -> Fixture {
        let state = Arc::new(SharedPipelineState::new(WINDOW, true));
        let clock = Arc::new(ManualClock::new());
        let probe = detector.probe();
        let worker = DetectionWorker::new(
            Arc::clone(&state),
            share(Box::new(detector)),
            clock.clone(),
            dynamic,
        );
        Fixture {
            state,
            clock,
            probe,
            worker,
        }
    }

    #[derive(Clone, Default)]
    struct RecordingLogger {
        stages: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn progress(&mut self, _current: usize, _total: usize) {}
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.stages.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    #[test]
    fn test_idle_until_first_frame() {
        let mut f = fixture(ScriptedDetector::new(vec![]), false);
        assert_eq!(f.worker.run_once(), CycleOutcome::Idle);
        assert_eq!(f.probe.track_calls(), 0);
        assert_eq!(f.worker.cycles(), 0);
    }

    #[test]
    fn test_cycle_publishes_detection_for_latest_frame() {
        let mut f = fixture(ScriptedDetector::new(vec![]).with_cycle(vec![boxed(1)]), false);
        f.state.set_frame(&frame(1));
        f.state.set_frame(&frame(2));

        assert_eq!(f.worker.run_once(), CycleOutcome::Completed { frame_index: 2 });
        let det = f.state.snapshot(f.clock.now()).detection.unwrap();
        assert_eq!(det.track_ids(), vec![1]);
        assert_eq!(det.source_frame, 2);
    }

    #[test]
    fn test_boxes_disabled_clears_detection_without_inference() {
        let mut f = fixture(ScriptedDetector::new(vec![]).with_cycle(vec![boxed(1)]), false);
        f.state.set_frame(&frame(1));
        f.worker.run_once();
        f.state.set_show_boxes(false);
        f.worker.run_once();

        assert!(f.state.snapshot(f.clock.now()).detection.is_none());
        assert_eq!(f.probe.track_calls(), 1);
    }

    #[test]
    fn test_tracking_failure_degrades_then_recovers() {
        let detector = ScriptedDetector::new(vec![])
            .with_cycle(vec![boxed(1)])
            .with_failure("model crashed")
            .with_cycle(vec![boxed(2)]);
        let mut f = fixture(detector, false);
        f.state.set_frame(&frame(1));

        f.worker.run_once();
        assert_eq!(f.worker.run_once(), CycleOutcome::Degraded { frame_index: 1 });
        assert!(f.state.snapshot(f.clock.now()).detection.is_none());

        f.worker.run_once();
        let det = f.state.snapshot(f.clock.now()).detection.unwrap();
        assert_eq!(det.track_ids(), vec![2]);
    }

    #[test]
    fn test_dynamic_mode_segments_pending_search() {
        let mut f = fixture(
            ScriptedDetector::new(vec![]).with_segmentation(SegmentationResult::default()),
            true,
        );
        f.state.set_frame(&frame(1));
        f.worker.run_once();
        assert_eq!(f.probe.segment_calls(), 0);

        f.state
            .set_segmentation(SegmentationRequest::new(["cup"]), None, f.clock.now());
        f.worker.run_once();

        assert_eq!(f.probe.segment_calls(), 1);
        let seg = f.state.snapshot(f.clock.now()).segmentation.unwrap();
        assert_eq!(seg.result, Some(SegmentationResult::default()));
    }

    #[test]
    fn test_static_mode_never_segments() {
        let mut f = fixture(ScriptedDetector::new(vec![]), false);
        f.state.set_frame(&frame(1));
        f.state
            .set_segmentation(SegmentationRequest::new(["cup"]), None, f.clock.now());
        f.worker.run_once();
        assert_eq!(f.probe.segment_calls(), 0);
    }

    #[test]
    fn test_expired_search_is_not_segmented() {
        let mut f = fixture(ScriptedDetector::new(vec![]), true);
        f.state.set_frame(&frame(1));
        f.state
            .set_segmentation(SegmentationRequest::new(["cup"]), None, f.clock.now());
        f.clock.advance(Duration::from_secs(21));

        f.worker.run_once();
        assert_eq!(f.probe.segment_calls(), 0);
        assert!(f.state.snapshot(f.clock.now()).segmentation.is_none());
    }

    #[test]
    fn test_segmentation_failure_keeps_previous_result() {
        let detector = ScriptedDetector::new(vec![])
            .with_segmentation(SegmentationResult::default())
            .with_segmentation_failure("out of memory");
        let mut f = fixture(detector, true);
        f.state.set_frame(&frame(1));
        f.state
            .set_segmentation(SegmentationRequest::new(["cup"]), None, f.clock.now());

        f.worker.run_once();
        assert_eq!(f.worker.run_once(), CycleOutcome::Degraded { frame_index: 1 });
        let seg = f.state.snapshot(f.clock.now()).segmentation.unwrap();
        assert!(seg.result.is_some());
    }

    #[test]
    fn test_stage_timings_recorded() {
        let logger = RecordingLogger::default();
        let mut f = fixture(ScriptedDetector::new(vec![]), true);
        f.worker = f.worker.with_logger(Box::new(logger.clone()));
        f.state.set_frame(&frame(1));
        f.state
            .set_segmentation(SegmentationRequest::new(["cup"]), None, f.clock.now());
        f.worker.run_once();

        assert_eq!(*logger.stages.lock().unwrap(), vec!["track", "segment"]);
    }

    #[test]
    fn test_spawned_worker_runs_until_stopped() {
        let f = fixture(ScriptedDetector::new(vec![]).with_cycle(vec![boxed(1)]).repeating(), false);
        f.state.set_frame(&frame(1));
        let mut handle = f.worker.spawn(Duration::from_millis(1)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while f.probe.track_calls() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.is_running());
        assert!(handle.stop().is_some());
        assert!(!handle.is_running());

        let calls = f.probe.track_calls();
        assert!(calls >= 3);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(f.probe.track_calls(), calls);
        assert!(handle.stop().is_none());
    }

    #[test]
    fn test_dropping_handle_stops_worker() {
        let f = fixture(ScriptedDetector::new(vec![]).repeating(), false);
        f.state.set_frame(&frame(1));
        let handle = f.worker.spawn(Duration::from_millis(1)).unwrap();
        drop(handle);

        let calls = f.probe.track_calls();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(f.probe.track_calls(), calls);
    }
}
