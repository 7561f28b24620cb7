pub mod detection_result;
pub mod object_detector;
pub mod segmentation;
