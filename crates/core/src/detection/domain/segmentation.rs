use ndarray::Array2;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::color::ColorPair;

/// Class names the user asked to find, in the order they were asked.
///
/// Names are trimmed and lower-cased; duplicates keep their first
/// position. An empty request means "no active search".
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SegmentationRequest {
    class_names: Vec<String>,
}

impl SegmentationRequest {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut class_names: Vec<String> = Vec::new();
        for name in names {
            let normalized = name.as_ref().trim().to_lowercase();
            if !normalized.is_empty() && !class_names.contains(&normalized) {
                class_names.push(normalized);
            }
        }
        Self { class_names }
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn is_empty(&self) -> bool {
        self.class_names.is_empty()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.class_names.iter().any(|n| n == class_name)
    }
}

/// Per-pixel membership field, `(height, width)`-shaped like the frame.
pub type Mask = Array2<bool>;

/// One segmented object instance.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentedInstance {
    pub class_id: u32,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub mask: Mask,
    pub colors: ColorPair,
}

impl SegmentedInstance {
    /// Number of pixels covered by the mask.
    pub fn pixel_count(&self) -> usize {
        self.mask.iter().filter(|&&on| on).count()
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SegmentationResult {
    pub instances: Vec<SegmentedInstance>,
}

impl SegmentationResult {
    pub fn new(instances: Vec<SegmentedInstance>) -> Self {
        Self { instances }
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }
}
