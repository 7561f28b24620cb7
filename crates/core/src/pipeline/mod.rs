pub mod detection_worker;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod pipeline_settings;
pub mod query_orchestrator;
pub mod scene_pipeline;
pub mod segmentation_cache;
pub mod shared_pipeline_state;
