use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use scene_narrator_core::detection::infrastructure::color_blob_detector::{
    ColorBlobDetector, DEFAULT_MIN_SATURATION, DEFAULT_MIN_VALUE, HUE_CLASSES,
};
use scene_narrator_core::detection::infrastructure::tracking_detector::TrackingDetector;
use scene_narrator_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use scene_narrator_core::pipeline::pipeline_settings::PipelineSettings;
use scene_narrator_core::pipeline::scene_pipeline::{ScenePipeline, WorkerMode};
use scene_narrator_core::query::domain::query_collaborators::SearchClassifier;
use scene_narrator_core::query::domain::query_result::QueryResult;
use scene_narrator_core::query::domain::utterance::Utterance;
use scene_narrator_core::query::infrastructure::canned_collaborators::{
    CannedSceneDescriber, CannedSearchClassifier,
};
use scene_narrator_core::query::infrastructure::keyword_search_classifier::KeywordSearchClassifier;
use scene_narrator_core::shared::BoxError;
use scene_narrator_core::video::domain::frame_source::FrameSource;
use scene_narrator_core::video::domain::frame_writer::FrameWriter;
use scene_narrator_core::video::infrastructure::image_file_writer::ImageFileWriter;
use scene_narrator_core::video::infrastructure::image_sequence_reader::ImageSequenceReader;

/// Replays a directory of frames through the scene narration pipeline and
/// writes the annotated frames.
#[derive(Parser)]
#[command(name = "scene-narrator")]
struct Cli {
    /// Directory of input frames (read in file-name order).
    input: PathBuf,

    /// Directory for annotated PNG frames.
    output: PathBuf,

    /// Settings JSON (default: user config dir, then built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Draw tracked bounding boxes.
    #[arg(long)]
    show_boxes: Option<bool>,

    /// Re-segment the active search on every worker cycle.
    #[arg(long)]
    dynamic_segmentation: bool,

    /// Seconds a search result stays on screen.
    #[arg(long)]
    window_secs: Option<u64>,

    /// Milliseconds between background worker cycles.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Replay rate in frames per second (0 = as fast as possible).
    #[arg(long, default_value = "15")]
    fps: f64,

    /// Step the worker after every Nth frame instead of running it in the
    /// background. Makes output reproducible.
    #[arg(long)]
    worker_every: Option<usize>,

    /// Ask the question after this many frames.
    #[arg(long)]
    ask_at: Option<usize>,

    /// Question text.
    #[arg(long, default_value = "Where is the red object?")]
    question: String,

    /// Raw search-classifier response to replay instead of keyword matching.
    #[arg(long)]
    search_response: Option<String>,

    /// Narration returned for the question.
    #[arg(long, default_value = "No narrator configured.")]
    narration: String,

    /// Response language passed to the narrator.
    #[arg(long)]
    language: Option<String>,

    /// Minimum blob size in pixels for the colour detector.
    #[arg(long, default_value = "64")]
    min_area: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), BoxError> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = load_settings(&cli)?;

    let mut reader = ImageSequenceReader::open(&cli.input)?;
    let total = reader.len_hint().unwrap_or(0);
    let mut writer = ImageFileWriter::new(&cli.output)?;

    let detector = TrackingDetector::new(Box::new(ColorBlobDetector::new(
        DEFAULT_MIN_SATURATION,
        DEFAULT_MIN_VALUE,
        cli.min_area,
    )));
    let classifier: Arc<dyn SearchClassifier> = match &cli.search_response {
        Some(raw) => Arc::new(CannedSearchClassifier::new(raw)),
        None => Arc::new(KeywordSearchClassifier::new(HUE_CLASSES)),
    };
    let mode = if cli.worker_every.is_some() {
        WorkerMode::Manual
    } else {
        WorkerMode::Background
    };

    let pipeline = ScenePipeline::builder(
        settings,
        Box::new(detector),
        classifier,
        Arc::new(CannedSceneDescriber::new(&cli.narration)),
    )
    .logger(Box::new(StdoutPipelineLogger::default()))
    .worker_mode(mode)
    .start()?;

    let frame_interval = if cli.fps > 0.0 {
        Some(Duration::from_secs_f64(1.0 / cli.fps))
    } else {
        None
    };

    let query = thread::scope(|scope| -> Result<_, BoxError> {
        let mut query = None;
        for (i, frame) in reader.frames().enumerate() {
            let started = Instant::now();
            let annotated = pipeline.process(frame?)?;
            writer.write(&annotated.frame)?;
            eprint!("\rFrame {}/{total}", i + 1);

            if cli.worker_every.is_some_and(|n| (i + 1) % n == 0) {
                pipeline.step_worker();
            }
            if cli.ask_at == Some(i + 1) {
                let utterance = Utterance::from_text(&cli.question, Instant::now());
                let pipeline = &pipeline;
                query = Some(scope.spawn(move || pipeline.ask(&utterance)));
            }

            if let Some(interval) = frame_interval {
                if let Some(rest) = interval.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
        }
        eprintln!();
        Ok(query.map(|handle| handle.join()))
    })?;

    if let Some(joined) = query {
        match joined {
            Ok(answer) => report(&answer?),
            Err(_) => log::error!("Query thread panicked"),
        }
    }

    if let Some(logger) = pipeline.release() {
        logger.summary();
    }
    log::info!(
        "Wrote {} frames to {}",
        writer.written(),
        cli.output.display()
    );
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<PipelineSettings, BoxError> {
    let mut settings = match &cli.config {
        Some(path) => PipelineSettings::load_from(path)?,
        None => PipelineSettings::load(),
    };
    if let Some(show) = cli.show_boxes {
        settings.show_boxes = show;
    }
    if cli.dynamic_segmentation {
        settings.dynamic_segmentation = true;
    }
    if let Some(secs) = cli.window_secs {
        settings.segmentation_window_secs = secs;
    }
    if let Some(ms) = cli.interval_ms {
        settings.worker_interval_ms = ms;
    }
    if let Some(language) = &cli.language {
        settings.response_language = language.clone();
    }
    Ok(settings)
}

fn report(result: &QueryResult) {
    if let Some(error) = &result.error {
        log::error!("Error during query processing: {error}");
        return;
    }
    for warning in &result.warnings {
        log::warn!("{warning}");
    }
    if !result.searched_objects.is_empty() {
        log::info!("Searching for: {}", result.searched_objects.join(", "));
    }
    println!("{}", result.narration);
}

fn validate(cli: &Cli) -> Result<(), BoxError> {
    if !cli.input.is_dir() {
        return Err(format!("Input directory not found: {}", cli.input.display()).into());
    }
    if !cli.fps.is_finite() || cli.fps < 0.0 {
        return Err(format!("FPS must be zero or positive, got {}", cli.fps).into());
    }
    if cli.worker_every == Some(0) {
        return Err("--worker-every must be at least 1".into());
    }
    if cli.ask_at == Some(0) {
        return Err("--ask-at counts frames from 1".into());
    }
    if cli.min_area == 0 {
        return Err("--min-area must be at least 1".into());
    }
    Ok(())
}
