use serde::Deserialize;
use thiserror::Error;

use crate::capture::domain::captured_frame::CapturedFrame;
use crate::roster::domain::attendance_record::AttendanceRecord;
use crate::shared::classroom_id::ClassroomId;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to build request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("{url} returned {status}: {detail}")]
    Status {
        url: String,
        status: u16,
        detail: String,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BackendError {
    /// Transport failures and server-side errors are worth waiting out until
    /// the next tick; client errors (4xx) and undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Transport { .. } => true,
            BackendError::Status { status, .. } => *status >= 500,
            BackendError::Request(_) | BackendError::Decode { .. } => false,
        }
    }
}

/// Response of a frame submission.
///
/// Backends that only acknowledge the frame (`{"message": ...}`) report zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct FrameResult {
    #[serde(default)]
    pub recognized_count: u32,
}

/// Response of a manual attendance mark.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkResult {
    pub message: String,
    #[serde(default)]
    pub attendance_id: Option<i64>,
}

/// Port to the face-recognition backend.
///
/// Every call is a single blocking request; callers decide which thread it
/// runs on. Implementations must be shareable across overlapping capture
/// cycles.
pub trait RecognitionBackend: Send + Sync {
    fn open_session(&self, classroom_id: ClassroomId) -> Result<(), BackendError>;

    fn close_session(&self) -> Result<(), BackendError>;

    /// Submits one still. The frame is consumed: it is never retried.
    fn process_frame(&self, frame: CapturedFrame) -> Result<FrameResult, BackendError>;

    /// Today's attendance records for a classroom, as a full snapshot.
    fn today_attendance(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Vec<AttendanceRecord>, BackendError>;

    fn mark_attendance(
        &self,
        student_id: &str,
        classroom_id: ClassroomId,
    ) -> Result<MarkResult, BackendError>;
}
