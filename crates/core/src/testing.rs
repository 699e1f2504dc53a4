//! Hand-written stubs of the crate's ports, shared by unit tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;

use crate::backend::domain::recognition_backend::{
    BackendError, FrameResult, MarkResult, RecognitionBackend,
};
use crate::capture::domain::captured_frame::CapturedFrame;
use crate::capture::domain::video_source::{CaptureError, VideoSource};
use crate::roster::domain::attendance_record::{AttendanceRecord, AttendanceStatus};
use crate::session::domain::session_notifier::{Notification, SessionNotifier};
use crate::session::domain::task_scheduler::{
    RepeatingFn, RepeatingTask, Task, TaskScheduler, TimerHandle,
};
use crate::shared::classroom_id::ClassroomId;
use crate::shared::frame::Frame;

pub(crate) fn transport_error() -> BackendError {
    BackendError::Transport {
        url: "http://backend/test".into(),
        source: "connection refused".into(),
    }
}

pub(crate) fn record(id: i64, status: AttendanceStatus) -> AttendanceRecord {
    let time = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    AttendanceRecord::new(id, format!("STU{id:03}"), format!("Student {id}"), time, status, 0.9)
}

// --- Backend ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendCall {
    OpenSession(ClassroomId),
    CloseSession,
    ProcessFrame {
        classroom_id: ClassroomId,
        jpeg_header: Vec<u8>,
        size: usize,
    },
    TodayAttendance(ClassroomId),
    Mark {
        student_id: String,
        classroom_id: ClassroomId,
    },
}

/// Records every call; answers from queued results, defaulting to success.
#[derive(Default)]
pub(crate) struct StubBackend {
    calls: Mutex<Vec<BackendCall>>,
    frame_results: Mutex<VecDeque<Result<FrameResult, BackendError>>>,
    rosters: Mutex<VecDeque<Result<Vec<AttendanceRecord>, BackendError>>>,
    fail_sessions: AtomicBool,
    frame_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    on_process_frame: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame_result(&self, result: Result<FrameResult, BackendError>) {
        self.frame_results.lock().unwrap().push_back(result);
    }

    pub fn push_roster(&self, result: Result<Vec<AttendanceRecord>, BackendError>) {
        self.rosters.lock().unwrap().push_back(result);
    }

    pub fn fail_sessions(&self) {
        self.fail_sessions.store(true, Ordering::SeqCst);
    }

    pub fn set_frame_delay(&self, delay: Duration) {
        *self.frame_delay.lock().unwrap() = delay;
    }

    /// Runs `hook` inside every frame submission, after it is recorded.
    pub fn on_process_frame(&self, hook: Box<dyn Fn() + Send>) {
        *self.on_process_frame.lock().unwrap() = Some(hook);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn frame_submissions(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::ProcessFrame { .. }))
            .count()
    }

    pub fn roster_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::TodayAttendance(_)))
            .count()
    }

    pub fn max_concurrent_frames(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record_call(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn session_result(&self) -> Result<(), BackendError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            Err(transport_error())
        } else {
            Ok(())
        }
    }
}

impl RecognitionBackend for StubBackend {
    fn open_session(&self, classroom_id: ClassroomId) -> Result<(), BackendError> {
        self.record_call(BackendCall::OpenSession(classroom_id));
        self.session_result()
    }

    fn close_session(&self) -> Result<(), BackendError> {
        self.record_call(BackendCall::CloseSession);
        self.session_result()
    }

    fn process_frame(&self, frame: CapturedFrame) -> Result<FrameResult, BackendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.record_call(BackendCall::ProcessFrame {
            classroom_id: frame.classroom_id(),
            jpeg_header: frame.jpeg().iter().take(2).copied().collect(),
            size: frame.jpeg().len(),
        });
        if let Some(ref hook) = *self.on_process_frame.lock().unwrap() {
            hook();
        }
        let delay = *self.frame_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.frame_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(FrameResult::default()))
    }

    fn today_attendance(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        self.record_call(BackendCall::TodayAttendance(classroom_id));
        self.rosters
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn mark_attendance(
        &self,
        student_id: &str,
        classroom_id: ClassroomId,
    ) -> Result<MarkResult, BackendError> {
        self.record_call(BackendCall::Mark {
            student_id: student_id.to_string(),
            classroom_id,
        });
        Ok(MarkResult {
            message: "Attendance marked successfully".into(),
            attendance_id: Some(1),
        })
    }
}

// --- Video source ---

enum SourceMode {
    Ready,
    NotReady,
    WarmingUp,
    Broken,
}

pub(crate) struct StubVideoSource {
    mode: SourceMode,
    captures: Arc<AtomicUsize>,
}

impl StubVideoSource {
    fn with_mode(mode: SourceMode) -> Self {
        Self {
            mode,
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ready() -> Self {
        Self::with_mode(SourceMode::Ready)
    }

    pub fn not_ready() -> Self {
        Self::with_mode(SourceMode::NotReady)
    }

    /// Ready, but yields no image.
    pub fn warming_up() -> Self {
        Self::with_mode(SourceMode::WarmingUp)
    }

    pub fn broken() -> Self {
        Self::with_mode(SourceMode::Broken)
    }

    pub fn captures(&self) -> Arc<AtomicUsize> {
        self.captures.clone()
    }
}

impl VideoSource for StubVideoSource {
    fn is_ready(&self) -> bool {
        !matches!(self.mode, SourceMode::NotReady)
    }

    fn capture_still(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            SourceMode::Ready => Ok(Some(Frame::new(vec![128u8; 8 * 6 * 3], 8, 6))),
            SourceMode::NotReady | SourceMode::WarmingUp => Ok(None),
            SourceMode::Broken => Err(CaptureError::NoFrames(PathBuf::from("/dev/video0"))),
        }
    }
}

// --- Scheduler ---

struct ManualTimer {
    interval: Duration,
    task: RepeatingFn,
    cancelled: Arc<AtomicBool>,
}

struct ManualTimerHandle {
    cancelled: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(&mut self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Runs spawned tasks inline and fires repeating tasks only on demand.
#[derive(Default)]
pub(crate) struct ManualScheduler {
    timers: Mutex<Vec<ManualTimer>>,
    live: Arc<AtomicUsize>,
    spawned: AtomicUsize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires one tick of every live timer; returns how many fired.
    pub fn tick(&self) -> usize {
        let tasks: Vec<RepeatingFn> = self
            .timers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .map(|t| t.task.clone())
            .collect();
        for task in &tasks {
            task();
        }
        tasks.len()
    }

    pub fn live_timers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn timers_created(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    pub fn last_interval(&self) -> Option<Duration> {
        self.timers.lock().unwrap().last().map(|t| t.interval)
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl TaskScheduler for ManualScheduler {
    fn spawn(&self, task: Task) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        task();
    }

    fn schedule_repeating(&self, interval: Duration, task: RepeatingFn) -> RepeatingTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.timers.lock().unwrap().push(ManualTimer {
            interval,
            task,
            cancelled: cancelled.clone(),
        });
        self.live.fetch_add(1, Ordering::SeqCst);
        RepeatingTask::new(Box::new(ManualTimerHandle {
            cancelled,
            live: self.live.clone(),
        }))
    }
}

// --- Notifier ---

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications()
            .iter()
            .map(|n| n.to_string())
            .collect()
    }
}

impl SessionNotifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
