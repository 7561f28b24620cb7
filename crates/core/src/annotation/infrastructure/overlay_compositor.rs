use crate::annotation::domain::frame_annotator::{FrameAnnotator, OverlayLayers, OverlayReport};
use crate::detection::domain::detection_result::DetectedBox;
use crate::detection::domain::segmentation::SegmentedInstance;
use crate::shared::color::ClassPalette;
use crate::shared::constants::{DEFAULT_BOX_THICKNESS, DEFAULT_MASK_OPACITY};
use crate::shared::frame::Frame;

use super::raster::{blend_mask, draw_label, draw_mask_contour, draw_rect, label_top};

/// CPU overlay renderer for boxes and segmentation masks.
///
/// Box colours come from the class palette fixed at construction; mask
/// colours travel with each segmented instance. Cost is linear in frame
/// size and independent of model latency.
pub struct OverlayCompositor {
    class_names: Vec<String>,
    palette: ClassPalette,
    mask_opacity: f32,
    box_thickness: u32,
}

impl OverlayCompositor {
    pub fn new(class_names: Vec<String>, palette: ClassPalette) -> Self {
        Self {
            class_names,
            palette,
            mask_opacity: DEFAULT_MASK_OPACITY,
            box_thickness: DEFAULT_BOX_THICKNESS,
        }
    }

    pub fn with_style(mut self, mask_opacity: f32, box_thickness: u32) -> Self {
        self.mask_opacity = mask_opacity.clamp(0.0, 1.0);
        self.box_thickness = box_thickness.max(1);
        self
    }

    fn class_name(&self, class_id: u32) -> String {
        self.class_names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class {class_id}"))
    }

    fn box_label(&self, det: &DetectedBox) -> String {
        let name = self.class_name(det.class_id);
        match det.track_id {
            Some(id) => format!("#{id} {name} {:.2}", det.confidence),
            None => format!("{name} {:.2}", det.confidence),
        }
    }

    fn draw_box(&self, frame: &mut Frame, det: &DetectedBox) {
        let colors = self.palette.pair_for(det.class_id);
        draw_rect(frame, &det.bbox, colors.fill, self.box_thickness);
        draw_label(
            frame,
            &self.box_label(det),
            det.bbox.x as i64,
            label_top(&det.bbox),
            colors.fill,
            colors.label,
        );
    }

    fn draw_instance(&self, frame: &mut Frame, instance: &SegmentedInstance) {
        blend_mask(frame, &instance.mask, instance.colors.fill, self.mask_opacity);
        draw_mask_contour(frame, &instance.mask, instance.colors.fill);
        draw_label(
            frame,
            &format!("{} {:.2}", instance.class_name, instance.confidence),
            instance.bbox.x as i64,
            label_top(&instance.bbox),
            instance.colors.fill,
            instance.colors.label,
        );
    }
}

impl FrameAnnotator for OverlayCompositor {
    fn annotate(&self, frame: &mut Frame, layers: OverlayLayers<'_>) -> OverlayReport {
        let mut report = OverlayReport::default();

        if layers.show_boxes {
            if let Some(detection) = layers.detection {
                for det in &detection.boxes {
                    self.draw_box(frame, det);
                    report.boxes.push(det.track_id);
                }
                report.detection_frame = Some(detection.source_frame);
            }
        }

        if let Some(segmentation) = layers.segmentation {
            for instance in &segmentation.instances {
                self.draw_instance(frame, instance);
                report.instances.push(instance.class_name.clone());
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::DetectionResult;
    use crate::detection::domain::segmentation::SegmentationResult;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::color::{ColorPair, Rgb};
    use crate::shared::frame::PixelFormat;
    use ndarray::Array2;

    fn compositor() -> OverlayCompositor {
        let names = vec!["cup".to_string(), "key".to_string()];
        OverlayCompositor::new(names, ClassPalette::for_class_count(2))
    }

    fn detection() -> DetectionResult {
        DetectionResult::new(
            vec![DetectedBox {
                bbox: BoundingBox::new(10, 20, 30, 30),
                confidence: 0.9,
                class_id: 1,
                track_id: Some(7),
            }],
            4,
        )
    }

    fn instance(fill: Rgb) -> SegmentedInstance {
        let mut mask = Array2::from_elem((64, 64), false);
        for r in 30..40 {
            for c in 30..40 {
                mask[[r, c]] = true;
            }
        }
        SegmentedInstance {
            class_id: 0,
            class_name: "cup".into(),
            confidence: 0.8,
            bbox: BoundingBox::new(30, 30, 10, 10),
            mask,
            colors: ColorPair::from_fill(fill),
        }
    }

    fn grey() -> Frame {
        Frame::solid(64, 64, [100, 100, 100], 5)
    }

    #[test]
    fn test_boxes_drawn_in_class_color() {
        let compositor = compositor();
        let det = detection();
        let mut frame = grey();
        let report = compositor.annotate(
            &mut frame,
            OverlayLayers {
                show_boxes: true,
                detection: Some(&det),
                segmentation: None,
            },
        );

        assert_eq!(report.boxes, vec![Some(7)]);
        assert_eq!(report.detection_frame, Some(4));
        let expected = ClassPalette::for_class_count(2).color_for(1);
        assert_eq!(frame.rgb_at(10, 49), expected.0);
        assert_eq!(frame.rgb_at(25, 35), [100, 100, 100]);
    }

    #[test]
    fn test_boxes_hidden_when_display_disabled() {
        let compositor = compositor();
        let det = detection();
        let mut frame = grey();
        let report = compositor.annotate(
            &mut frame,
            OverlayLayers {
                show_boxes: false,
                detection: Some(&det),
                segmentation: None,
            },
        );

        assert!(report.is_empty());
        assert_eq!(frame, grey());
    }

    #[test]
    fn test_nothing_to_draw_leaves_frame_untouched() {
        let mut frame = grey();
        let report = compositor().annotate(&mut frame, OverlayLayers::default());
        assert!(report.is_empty());
        assert_eq!(frame, grey());
    }

    #[test]
    fn test_mask_blended_with_contour() {
        let compositor = compositor().with_style(0.5, 2);
        let seg = SegmentationResult::new(vec![instance(Rgb([200, 0, 0]))]);
        let mut frame = grey();
        let report = compositor.annotate(
            &mut frame,
            OverlayLayers {
                show_boxes: true,
                detection: None,
                segmentation: Some(&seg),
            },
        );

        assert_eq!(report.instances, vec!["cup".to_string()]);
        assert_eq!(frame.rgb_at(35, 35), [150, 50, 50]);
        assert_eq!(frame.rgb_at(30, 35), [200, 0, 0]);
        assert_eq!(frame.rgb_at(50, 50), [100, 100, 100]);
    }

    #[test]
    fn test_segmentation_drawn_even_with_boxes_hidden() {
        let seg = SegmentationResult::new(vec![instance(Rgb([200, 0, 0]))]);
        let mut frame = grey();
        let report = compositor().annotate(
            &mut frame,
            OverlayLayers {
                show_boxes: false,
                detection: None,
                segmentation: Some(&seg),
            },
        );
        assert_eq!(report.instances.len(), 1);
    }

    #[test]
    fn test_bgr_frame_keeps_true_colors() {
        let compositor = compositor();
        let det = detection();
        let mut frame = grey().to_format(PixelFormat::Bgr);
        compositor.annotate(
            &mut frame,
            OverlayLayers {
                show_boxes: true,
                detection: Some(&det),
                segmentation: None,
            },
        );
        let expected = ClassPalette::for_class_count(2).color_for(1);
        assert_eq!(frame.rgb_at(10, 49), expected.0);
        assert_eq!(frame.format(), PixelFormat::Bgr);
    }

    #[test]
    fn test_unknown_class_gets_fallback_label() {
        assert_eq!(compositor().class_name(9), "class 9");
    }
}
