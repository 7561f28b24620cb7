pub mod bytetrack_tracker;
pub mod color_blob_detector;
mod math;
pub mod scripted_detector;
pub mod tracking_detector;
