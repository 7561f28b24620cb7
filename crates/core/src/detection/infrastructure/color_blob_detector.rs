use std::collections::HashMap;

use ndarray::Array2;

use crate::detection::domain::detection_result::{DetectedBox, DetectionResult};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::segmentation::{
    SegmentationRequest, SegmentationResult, SegmentedInstance,
};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::color::ClassPalette;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

use super::math::label_components;

/// Hue classes, centred every 60 degrees starting at red.
pub const HUE_CLASSES: [&str; 6] = ["red", "yellow", "green", "cyan", "blue", "magenta"];

pub const DEFAULT_MIN_SATURATION: f64 = 0.5;
pub const DEFAULT_MIN_VALUE: f64 = 0.3;
pub const DEFAULT_MIN_AREA: usize = 64;

/// Model-free detector that finds saturated colour blobs.
///
/// Every pixel whose saturation and value clear the thresholds is binned
/// into the nearest hue class; 4-connected runs of one class form an
/// instance. Confidence is the blob's mean saturation. Boxes are
/// untracked; wrap in a `TrackingDetector` for stable ids.
pub struct ColorBlobDetector {
    class_names: Vec<String>,
    palette: ClassPalette,
    min_saturation: f64,
    min_value: f64,
    min_area: usize,
}

struct Blob {
    class_id: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixels: Vec<(u32, u32)>,
    saturation_sum: f64,
}

impl Blob {
    fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as i32,
            self.min_y as i32,
            (self.max_x - self.min_x + 1) as i32,
            (self.max_y - self.min_y + 1) as i32,
        )
    }

    fn confidence(&self) -> f32 {
        (self.saturation_sum / self.pixels.len() as f64) as f32
    }
}

impl ColorBlobDetector {
    pub fn new(min_saturation: f64, min_value: f64, min_area: usize) -> Self {
        let class_names: Vec<String> = HUE_CLASSES.iter().map(|s| s.to_string()).collect();
        let palette = ClassPalette::for_class_count(class_names.len());
        Self {
            class_names,
            palette,
            min_saturation,
            min_value,
            min_area: min_area.max(1),
        }
    }

    fn classify(&self, rgb: [u8; 3]) -> Option<(u8, f64)> {
        let [r, g, b] = rgb.map(|c| c as f64 / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        if max < self.min_value || max == 0.0 {
            return None;
        }
        let saturation = delta / max;
        if saturation < self.min_saturation {
            return None;
        }
        let hue = if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let class = ((hue / 60.0).round() as usize % HUE_CLASSES.len()) as u8;
        Some((class + 1, saturation))
    }

    fn find_blobs(&self, frame: &Frame) -> Vec<Blob> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let mut grid = vec![0u8; width * height];
        let mut saturation = vec![0.0f64; width * height];

        for y in 0..height {
            for x in 0..width {
                if let Some((class, sat)) = self.classify(frame.rgb_at(x as u32, y as u32)) {
                    grid[y * width + x] = class;
                    saturation[y * width + x] = sat;
                }
            }
        }

        let labels = label_components(&grid, width, height);
        let mut blobs: HashMap<usize, Blob> = HashMap::new();
        let mut order: Vec<usize> = Vec::new();

        for (i, label) in labels.iter().enumerate() {
            let Some(root) = *label else {
                continue;
            };
            let x = (i % width) as u32;
            let y = (i / width) as u32;
            let blob = blobs.entry(root).or_insert_with(|| {
                order.push(root);
                Blob {
                    class_id: (grid[i] - 1) as u32,
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    pixels: Vec::new(),
                    saturation_sum: 0.0,
                }
            });
            blob.min_x = blob.min_x.min(x);
            blob.min_y = blob.min_y.min(y);
            blob.max_x = blob.max_x.max(x);
            blob.max_y = blob.max_y.max(y);
            blob.pixels.push((x, y));
            blob.saturation_sum += saturation[i];
        }

        order
            .into_iter()
            .filter_map(|root| blobs.remove(&root))
            .filter(|blob| blob.pixels.len() >= self.min_area)
            .collect()
    }
}

impl Default for ColorBlobDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SATURATION, DEFAULT_MIN_VALUE, DEFAULT_MIN_AREA)
    }
}

impl ObjectDetector for ColorBlobDetector {
    fn track(&mut self, frame: &Frame) -> Result<DetectionResult, BoxError> {
        let boxes = self
            .find_blobs(frame)
            .iter()
            .map(|blob| DetectedBox {
                bbox: blob.bbox(),
                confidence: blob.confidence(),
                class_id: blob.class_id,
                track_id: None,
            })
            .collect();
        Ok(DetectionResult::new(boxes, frame.index()))
    }

    fn segment(
        &mut self,
        frame: &Frame,
        request: &SegmentationRequest,
    ) -> Result<SegmentationResult, BoxError> {
        let shape = (frame.height() as usize, frame.width() as usize);
        let instances = self
            .find_blobs(frame)
            .into_iter()
            .filter(|blob| request.contains(&self.class_names[blob.class_id as usize]))
            .map(|blob| {
                let mut mask = Array2::from_elem(shape, false);
                for &(x, y) in &blob.pixels {
                    mask[[y as usize, x as usize]] = true;
                }
                SegmentedInstance {
                    class_id: blob.class_id,
                    class_name: self.class_names[blob.class_id as usize].clone(),
                    confidence: blob.confidence(),
                    bbox: blob.bbox(),
                    mask,
                    colors: self.palette.pair_for(blob.class_id),
                }
            })
            .collect();
        Ok(SegmentationResult::new(instances))
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn palette(&self) -> ClassPalette {
        self.palette.clone()
    }
}
