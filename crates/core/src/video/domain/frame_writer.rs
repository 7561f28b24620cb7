use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// Consumes the annotated frame stream.
pub trait FrameWriter: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), BoxError>;

    /// Number of frames written so far.
    fn written(&self) -> usize;
}
