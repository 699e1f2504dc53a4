use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::video_source::{CaptureError, VideoSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays still images from disk as if they came from a camera.
///
/// Accepts a single image or a directory; directory entries are played in
/// file-name order and loop forever.
pub struct ImageDirSource {
    stills: Vec<PathBuf>,
    next: usize,
}

impl ImageDirSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let stills = if path.is_dir() {
            list_stills(path)?
        } else if is_image(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };

        if stills.is_empty() {
            return Err(CaptureError::NoFrames(path.to_path_buf()));
        }
        log::info!("Replaying {} still(s) from {}", stills.len(), path.display());
        Ok(Self { stills, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.stills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stills.is_empty()
    }
}

fn list_stills(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    let entries = fs::read_dir(dir).map_err(|e| CaptureError::ListDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut stills: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    stills.sort();
    Ok(stills)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl VideoSource for ImageDirSource {
    fn is_ready(&self) -> bool {
        !self.stills.is_empty()
    }

    fn capture_still(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.stills.is_empty() {
            return Ok(None);
        }
        let path = &self.stills[self.next];
        self.next = (self.next + 1) % self.stills.len();

        let img = image::open(path).map_err(|e| CaptureError::Read {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(Frame::from_rgb_image(img.to_rgb8())))
    }
}
