use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::backend::domain::recognition_backend::RecognitionBackend;
use crate::capture::domain::captured_frame::CapturedFrame;
use crate::capture::domain::video_source::{CaptureError, VideoSource};
use crate::capture::infrastructure::jpeg_encoder::JpegFrameEncoder;
use crate::shared::classroom_id::ClassroomId;

/// What one capture-submit cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No still was available; nothing was sent.
    Skipped,
    /// The backend accepted the frame.
    Submitted { recognized_count: u32 },
    /// The submission failed. The next tick is the retry.
    Failed,
}

/// One capture → encode → submit cycle, run once per timer tick.
///
/// Cycles may overlap when a submission outlives the tick interval. The
/// video source is only held while grabbing the still; encoding and the
/// network request run without it.
pub struct FramePipeline {
    source: Mutex<Box<dyn VideoSource>>,
    encoder: JpegFrameEncoder,
    backend: Arc<dyn RecognitionBackend>,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn VideoSource>,
        encoder: JpegFrameEncoder,
        backend: Arc<dyn RecognitionBackend>,
    ) -> Self {
        Self {
            source: Mutex::new(source),
            encoder,
            backend,
        }
    }

    /// Runs a single best-effort cycle. Never fails: capture problems skip
    /// the cycle and submission errors are logged and reported as
    /// [`CycleOutcome::Failed`].
    pub fn capture_and_submit(&self, classroom_id: ClassroomId) -> CycleOutcome {
        let frame = match self.capture(classroom_id) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::debug!("Video source not ready, skipping capture");
                return CycleOutcome::Skipped;
            }
            Err(e) => {
                log::warn!("Capture failed, skipping cycle: {e}");
                return CycleOutcome::Skipped;
            }
        };

        let started = Instant::now();
        let result = self.backend.process_frame(frame);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(result) => {
                log::debug!(
                    "Frame for classroom {classroom_id} processed in {elapsed_ms:.0}ms, {} recognized",
                    result.recognized_count
                );
                CycleOutcome::Submitted {
                    recognized_count: result.recognized_count,
                }
            }
            Err(e) if e.is_transient() => {
                log::warn!("Frame submission failed, retrying next tick: {e}");
                CycleOutcome::Failed
            }
            Err(e) => {
                log::error!("Frame submission rejected: {e}");
                CycleOutcome::Failed
            }
        }
    }

    fn capture(&self, classroom_id: ClassroomId) -> Result<Option<CapturedFrame>, CaptureError> {
        let still = {
            let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
            if !source.is_ready() {
                return Ok(None);
            }
            source.capture_still()?
        };

        match still {
            Some(frame) => {
                let jpeg = self.encoder.encode(&frame)?;
                Ok(Some(CapturedFrame::new(classroom_id, jpeg)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::recognition_backend::{BackendError, FrameResult};
    use crate::testing::{transport_error, BackendCall, StubBackend, StubVideoSource};

    fn pipeline(source: StubVideoSource, backend: Arc<StubBackend>) -> FramePipeline {
        FramePipeline::new(Box::new(source), JpegFrameEncoder::new(32, 24, 80), backend)
    }

    #[test]
    fn test_successful_cycle_reports_count() {
        let backend = Arc::new(StubBackend::new());
        backend.push_frame_result(Ok(FrameResult {
            recognized_count: 2,
        }));
        let pipeline = pipeline(StubVideoSource::ready(), backend.clone());

        let outcome = pipeline.capture_and_submit(ClassroomId(1));

        assert_eq!(
            outcome,
            CycleOutcome::Submitted {
                recognized_count: 2
            }
        );
        assert_eq!(backend.frame_submissions(), 1);
    }

    #[test]
    fn test_submitted_frame_is_jpeg_for_classroom() {
        let backend = Arc::new(StubBackend::new());
        let pipeline = pipeline(StubVideoSource::ready(), backend.clone());

        pipeline.capture_and_submit(ClassroomId(5));

        match backend.calls().as_slice() {
            [BackendCall::ProcessFrame {
                classroom_id,
                jpeg_header,
                ..
            }] => {
                assert_eq!(*classroom_id, ClassroomId(5));
                assert_eq!(jpeg_header, &[0xFF, 0xD8]);
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[test]
    fn test_not_ready_source_skips_silently() {
        let backend = Arc::new(StubBackend::new());
        let source = StubVideoSource::not_ready();
        let captures = source.captures();
        let pipeline = pipeline(source, backend.clone());

        assert_eq!(
            pipeline.capture_and_submit(ClassroomId(1)),
            CycleOutcome::Skipped
        );
        assert_eq!(captures.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_empty_still_skips_cycle() {
        let backend = Arc::new(StubBackend::new());
        let pipeline = pipeline(StubVideoSource::warming_up(), backend.clone());

        assert_eq!(
            pipeline.capture_and_submit(ClassroomId(1)),
            CycleOutcome::Skipped
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_capture_error_skips_cycle() {
        let backend = Arc::new(StubBackend::new());
        let pipeline = pipeline(StubVideoSource::broken(), backend.clone());

        assert_eq!(
            pipeline.capture_and_submit(ClassroomId(1)),
            CycleOutcome::Skipped
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_failed_submission_is_swallowed() {
        let backend = Arc::new(StubBackend::new());
        backend.push_frame_result(Err(transport_error()));
        let pipeline = pipeline(StubVideoSource::ready(), backend.clone());

        assert_eq!(
            pipeline.capture_and_submit(ClassroomId(1)),
            CycleOutcome::Failed
        );
        // No immediate retry.
        assert_eq!(backend.frame_submissions(), 1);
    }

    #[test]
    fn test_rejected_submission_is_failed() {
        let backend = Arc::new(StubBackend::new());
        backend.push_frame_result(Err(BackendError::Status {
            url: "http://backend/attendance/process-frame".into(),
            status: 404,
            detail: "Classroom not found".into(),
        }));
        let pipeline = pipeline(StubVideoSource::ready(), backend.clone());

        assert_eq!(
            pipeline.capture_and_submit(ClassroomId(1)),
            CycleOutcome::Failed
        );
    }

    #[test]
    fn test_overlapping_cycles_each_submit() {
        let backend = Arc::new(StubBackend::new());
        backend.set_frame_delay(std::time::Duration::from_millis(50));
        let pipeline = Arc::new(pipeline(StubVideoSource::ready(), backend.clone()));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let pipeline = pipeline.clone();
                std::thread::spawn(move || pipeline.capture_and_submit(ClassroomId(1)))
            })
            .collect();
        for handle in handles {
            assert!(matches!(
                handle.join().unwrap(),
                CycleOutcome::Submitted { .. }
            ));
        }

        assert_eq!(backend.frame_submissions(), 3);
        assert!(backend.max_concurrent_frames() > 1);
    }
}
