use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to list frames in {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no still images found in {0}")]
    NoFrames(PathBuf),
    #[error("failed to read still from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame data does not match {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    #[error("failed to encode frame as JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// A live video feed that still frames can be grabbed from.
///
/// A source is exclusively owned by one capture pipeline. Grabbing a still
/// is momentary, so overlapping capture cycles only contend for it briefly.
pub trait VideoSource: Send {
    /// Whether the feed is attached and warmed up.
    fn is_ready(&self) -> bool;

    /// Grabs the current still. `Ok(None)` means no image was available
    /// right now (e.g. camera warm-up), which callers treat as a skipped
    /// cycle rather than an error.
    fn capture_still(&mut self) -> Result<Option<Frame>, CaptureError>;
}
