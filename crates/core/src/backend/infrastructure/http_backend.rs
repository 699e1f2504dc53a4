use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::backend::domain::recognition_backend::{
    BackendError, FrameResult, MarkResult, RecognitionBackend,
};
use crate::capture::domain::captured_frame::CapturedFrame;
use crate::roster::domain::attendance_record::AttendanceRecord;
use crate::shared::classroom_id::ClassroomId;
use crate::shared::constants::{FRAME_FILE_NAME, FRAME_MIME_TYPE};
use crate::shared::settings::ClientSettings;

/// Talks to the recognition backend over HTTP with a blocking client.
///
/// Every request carries the configured timeout so a hung backend cannot
/// hold a capture cycle open indefinitely.
pub struct HttpRecognitionBackend {
    client: Client,
    base_url: String,
}

impl HttpRecognitionBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::Request)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, BackendError> {
        Self::new(&settings.api_base_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, BackendError> {
        log::debug!("-> {url}");
        let response = request.send().map_err(|e| BackendError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(BackendError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            detail: error_detail(&body, status.canonical_reason()),
        })
    }

    fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, BackendError> {
        let bytes = response.bytes().map_err(|e| BackendError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
            url: url.to_string(),
            source: e,
        })
    }
}

/// Pulls the `detail` message out of an error body, falling back to the raw
/// body or the status reason.
fn error_detail(body: &str, reason: Option<&str>) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        match map.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        trimmed.to_string()
    } else {
        reason.unwrap_or("unknown error").to_string()
    }
}

impl RecognitionBackend for HttpRecognitionBackend {
    fn open_session(&self, classroom_id: ClassroomId) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("attendance/session/start/{classroom_id}"));
        self.send(&url, self.client.post(&url))?;
        Ok(())
    }

    fn close_session(&self) -> Result<(), BackendError> {
        let url = self.endpoint("attendance/session/stop");
        self.send(&url, self.client.post(&url))?;
        Ok(())
    }

    fn process_frame(&self, frame: CapturedFrame) -> Result<FrameResult, BackendError> {
        let url = self.endpoint("attendance/process-frame");
        let (classroom_id, jpeg) = frame.into_parts();
        let image = Part::bytes(jpeg)
            .file_name(FRAME_FILE_NAME)
            .mime_str(FRAME_MIME_TYPE)
            .map_err(BackendError::Request)?;
        let form = Form::new()
            .text("classroom_id", classroom_id.to_string())
            .part("image", image);

        let response = self.send(&url, self.client.post(&url).multipart(form))?;
        Self::decode(&url, response)
    }

    fn today_attendance(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        let url = self.endpoint(&format!("attendance/classroom/{classroom_id}/today"));
        let response = self.send(&url, self.client.get(&url))?;
        Self::decode(&url, response)
    }

    fn mark_attendance(
        &self,
        student_id: &str,
        classroom_id: ClassroomId,
    ) -> Result<MarkResult, BackendError> {
        let url = self.endpoint("attendance/mark");
        let form = Form::new()
            .text("student_id", student_id.to_string())
            .text("classroom_id", classroom_id.to_string());
        let response = self.send(&url, self.client.post(&url).multipart(form))?;
        Self::decode(&url, response)
    }
}
