use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::annotation::domain::frame_annotator::{FrameAnnotator, OverlayLayers, OverlayReport};
use crate::annotation::infrastructure::overlay_compositor::OverlayCompositor;
use crate::detection::domain::object_detector::{share, ObjectDetector};
use crate::query::domain::query_collaborators::{SceneDescriber, SearchClassifier};
use crate::query::domain::query_result::QueryResult;
use crate::query::domain::utterance::Utterance;
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::frame::Frame;

use super::detection_worker::{CycleOutcome, DetectionWorker, WorkerHandle};
use super::pipeline_error::PipelineError;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::pipeline_settings::PipelineSettings;
use super::query_orchestrator::QueryOrchestrator;
use super::shared_pipeline_state::SharedPipelineState;

/// One outgoing frame plus what was drawn on it.
#[derive(Clone, Debug)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub report: OverlayReport,
}

/// How the detection worker is driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerMode {
    /// Its own thread, cycling every `worker_interval_ms`.
    #[default]
    Background,
    /// No thread; the caller steps cycles with
    /// [`ScenePipeline::step_worker`]. Gives reproducible replays.
    Manual,
}

enum Worker {
    Background(WorkerHandle),
    Manual(DetectionWorker),
    Stopped,
}

/// Assembles a [`ScenePipeline`].
pub struct ScenePipelineBuilder {
    settings: PipelineSettings,
    detector: Box<dyn ObjectDetector>,
    classifier: Arc<dyn SearchClassifier>,
    describer: Arc<dyn SceneDescriber>,
    clock: Arc<dyn Clock>,
    logger: Box<dyn PipelineLogger>,
    mode: WorkerMode,
}

impl ScenePipelineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn worker_mode(mut self, mode: WorkerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Starts the pipeline. In background mode this spawns the worker.
    pub fn start(self) -> std::io::Result<ScenePipeline> {
        let settings = self.settings;
        let state = Arc::new(SharedPipelineState::new(
            settings.segmentation_window(),
            settings.show_boxes,
        ));
        let compositor = OverlayCompositor::new(
            self.detector.class_names().to_vec(),
            self.detector.palette(),
        )
        .with_style(settings.mask_opacity, settings.box_thickness);
        let detector = share(self.detector);

        let orchestrator = QueryOrchestrator::new(
            self.classifier,
            self.describer,
            Arc::clone(&state),
            Arc::clone(&detector),
            settings.dynamic_segmentation,
            &settings.response_language,
        );

        let worker = DetectionWorker::new(
            Arc::clone(&state),
            Arc::clone(&detector),
            Arc::clone(&self.clock),
            settings.dynamic_segmentation,
        )
        .with_logger(self.logger);
        let worker = match self.mode {
            WorkerMode::Background => Worker::Background(worker.spawn(settings.worker_interval())?),
            WorkerMode::Manual => Worker::Manual(worker),
        };

        log::info!(
            "Pipeline started (boxes: {}, dynamic segmentation: {}, window: {}s)",
            settings.show_boxes,
            settings.dynamic_segmentation,
            settings.segmentation_window_secs
        );

        Ok(ScenePipeline {
            state,
            clock: self.clock,
            compositor: Box::new(compositor),
            orchestrator,
            worker: Mutex::new(worker),
            next_index: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        })
    }
}

/// Frame-in, annotated-frame-out pipeline with background detection and
/// spoken queries.
///
/// All methods take `&self`, so ingestion, queries and display can run on
/// different threads against one shared pipeline. Released on drop.
pub struct ScenePipeline {
    state: Arc<SharedPipelineState>,
    clock: Arc<dyn Clock>,
    compositor: Box<dyn FrameAnnotator>,
    orchestrator: QueryOrchestrator,
    worker: Mutex<Worker>,
    next_index: AtomicUsize,
    released: AtomicBool,
}

impl ScenePipeline {
    pub fn builder(
        settings: PipelineSettings,
        detector: Box<dyn ObjectDetector>,
        classifier: Arc<dyn SearchClassifier>,
        describer: Arc<dyn SceneDescriber>,
    ) -> ScenePipelineBuilder {
        ScenePipelineBuilder {
            settings,
            detector,
            classifier,
            describer,
            clock: Arc::new(SystemClock),
            logger: Box::new(NullPipelineLogger),
            mode: WorkerMode::Background,
        }
    }

    /// Ingests one frame and returns it annotated. Never waits on
    /// inference: the overlay shows whatever the worker last published.
    pub fn process(&self, mut frame: Frame) -> Result<AnnotatedFrame, PipelineError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PipelineError::Released);
        }
        frame.set_index(self.next_index.fetch_add(1, Ordering::Relaxed));
        if !self.state.set_frame(&frame) {
            return Err(PipelineError::Released);
        }

        let snapshot = self.state.snapshot(self.clock.now());
        let layers = OverlayLayers {
            show_boxes: self.state.show_boxes(),
            detection: snapshot.detection.as_ref(),
            segmentation: snapshot
                .segmentation
                .as_ref()
                .and_then(|s| s.result.as_ref()),
        };
        let report = self.compositor.annotate(&mut frame, layers);
        Ok(AnnotatedFrame { frame, report })
    }

    pub fn on_frame(&self, frame: Frame) -> Result<Frame, PipelineError> {
        self.process(frame).map(|annotated| annotated.frame)
    }

    /// Copy of the newest ingested frame, unannotated.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.state.latest_frame()
    }

    /// Like [`latest_frame`](Self::latest_frame), but reports why no frame
    /// is available.
    pub fn capture(&self) -> Result<Frame, PipelineError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PipelineError::Released);
        }
        self.latest_frame().ok_or(PipelineError::NoFrameAvailable)
    }

    /// Answers `utterance` against the frame visible right now. Blocks the
    /// caller until both query tasks finish; frame ingestion is unaffected.
    pub fn ask(&self, utterance: &Utterance) -> Result<QueryResult, PipelineError> {
        let frame = self.capture()?;
        Ok(self.orchestrator.answer(&frame, utterance))
    }

    pub fn set_show_boxes(&self, enabled: bool) {
        self.state.set_show_boxes(enabled);
    }

    pub fn show_boxes(&self) -> bool {
        self.state.show_boxes()
    }

    /// Runs one worker cycle in manual mode. `None` in background mode or
    /// after release.
    pub fn step_worker(&self) -> Option<CycleOutcome> {
        match &mut *self.worker.lock().unwrap_or_else(PoisonError::into_inner) {
            Worker::Manual(worker) => Some(worker.run_once()),
            _ => None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Stops ingestion, joins the worker, then clears all state. Returns
    /// the worker's logger on the first call; later calls are no-ops.
    pub fn release(&self) -> Option<Box<dyn PipelineLogger>> {
        if self.released.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.state.stop_accepting();

        let worker = std::mem::replace(
            &mut *self.worker.lock().unwrap_or_else(PoisonError::into_inner),
            Worker::Stopped,
        );
        let logger = match worker {
            Worker::Background(mut handle) => handle.stop(),
            Worker::Manual(worker) => Some(worker.into_logger()),
            Worker::Stopped => None,
        };

        self.state.clear();
        log::info!("Pipeline released");
        logger
    }
}

impl Drop for ScenePipeline {
    fn drop(&mut self) {
        self.release();
    }
}
