use std::time::Duration;

/// How long a search-triggered segmentation stays on screen.
pub const DEFAULT_SEGMENTATION_WINDOW: Duration = Duration::from_secs(20);

/// Sleep between detection worker iterations. This, not frame arrival,
/// sets the detection refresh rate.
pub const DEFAULT_WORKER_INTERVAL: Duration = Duration::from_millis(10);

pub const DEFAULT_MASK_OPACITY: f32 = 0.5;

pub const DEFAULT_BOX_THICKNESS: u32 = 2;

pub const DEFAULT_RESPONSE_LANGUAGE: &str = "English";

/// Max detector cycles a track can go unmatched before removal.
pub const TRACKER_MAX_LOST: usize = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
