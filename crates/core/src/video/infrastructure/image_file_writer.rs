use std::path::{Path, PathBuf};

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::BoxError;
use crate::video::domain::frame_writer::FrameWriter;

/// Writes each frame as a numbered PNG (`frame_00000.png`, ...) in an
/// output directory, using the `image` crate.
///
/// BGR frames are converted so files always hold true colours.
pub struct ImageFileWriter {
    dir: PathBuf,
    written: usize,
}

impl ImageFileWriter {
    pub fn new(dir: &Path) -> Result<Self, BoxError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.png"))
    }
}

/// Encodes one frame to `path`.
pub fn write_png(path: &Path, frame: &Frame) -> Result<(), BoxError> {
    let rgb = frame.to_format(PixelFormat::Rgb);
    let channels = rgb.channels() as usize;
    let data = if channels == 3 {
        rgb.into_data()
    } else {
        rgb.data()
            .chunks_exact(channels)
            .flat_map(|px| px[..3].iter().copied())
            .collect()
    };
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), data)
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}

impl FrameWriter for ImageFileWriter {
    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        write_png(&self.path_for(self.written), frame)?;
        self.written += 1;
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }
}
