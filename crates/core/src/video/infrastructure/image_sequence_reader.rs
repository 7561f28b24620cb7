use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

/// Replays a directory of still images as a frame stream.
///
/// Files are taken in file-name order and decoded lazily as RGB with the
/// `image` crate. Files without an image extension are skipped.
pub struct ImageSequenceReader {
    paths: Vec<PathBuf>,
}

impl ImageSequenceReader {
    pub fn open(dir: &Path) -> Result<Self, FrameSourceError> {
        let entries = fs::read_dir(dir).map_err(|source| FrameSourceError::Open {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        if paths.is_empty() {
            return Err(FrameSourceError::Empty(dir.to_path_buf()));
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        log::info!("Found {} frames in {}", paths.len(), dir.display());
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn decode(path: &Path, index: usize) -> Result<Frame, FrameSourceError> {
    let img = image::open(path)
        .map_err(|source| FrameSourceError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index))
}

impl FrameSource for ImageSequenceReader {
    fn len_hint(&self) -> Option<usize> {
        Some(self.paths.len())
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, FrameSourceError>> + '_> {
        Box::new(
            self.paths
                .iter()
                .enumerate()
                .map(|(index, path)| decode(path, index)),
        )
    }
}
