use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("cannot open frame source {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no frames found in {0}")]
    Empty(PathBuf),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Pushes frames into the pipeline in arrival order.
///
/// Rate and pixel format are up to the source; frames only need a
/// consistent buffer and dimensions.
pub trait FrameSource: Send {
    /// Number of frames, when known up front.
    fn len_hint(&self) -> Option<usize>;

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, FrameSourceError>> + '_>;
}
