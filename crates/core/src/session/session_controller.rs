use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::backend::domain::recognition_backend::RecognitionBackend;
use crate::capture::frame_pipeline::{CycleOutcome, FramePipeline};
use crate::roster::roster_view_model::RosterViewModel;
use crate::session::domain::session::{Session, SessionError, SessionStatus};
use crate::session::domain::session_notifier::{Notification, RemoteAction, SessionNotifier};
use crate::session::domain::task_scheduler::{RepeatingFn, RepeatingTask, TaskScheduler};
use crate::shared::classroom_id::ClassroomId;

/// Resources that exist only while a session is active. Dropping this value
/// cancels the capture timer.
struct ActiveSession {
    classroom_id: ClassroomId,
    started_at: DateTime<Local>,
    /// Cleared on stop so trailing responses from in-flight cycles are
    /// ignored instead of resurrecting the stopped session's display.
    live: Arc<AtomicBool>,
    timer: RepeatingTask,
}

enum SessionState {
    Idle { last_classroom: Option<ClassroomId> },
    Active(ActiveSession),
}

/// Owns the Idle/Active lifecycle of one live attendance session and its
/// periodic capture timer.
///
/// `start` arms exactly one timer; `stop`, and dropping the controller, cancel
/// it before returning. Remote session open/close requests are best effort:
/// their failures are logged and reported, never fatal.
pub struct SessionController {
    backend: Arc<dyn RecognitionBackend>,
    pipeline: Arc<FramePipeline>,
    roster: Arc<RosterViewModel>,
    scheduler: Arc<dyn TaskScheduler>,
    notifier: Arc<dyn SessionNotifier>,
    interval: Duration,
    state: SessionState,
    rejected_starts: usize,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn RecognitionBackend>,
        pipeline: Arc<FramePipeline>,
        roster: Arc<RosterViewModel>,
        scheduler: Arc<dyn TaskScheduler>,
        notifier: Arc<dyn SessionNotifier>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            pipeline,
            roster,
            scheduler,
            notifier,
            interval,
            state: SessionState::Idle {
                last_classroom: None,
            },
            rejected_starts: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Idle { .. } => SessionStatus::Idle,
            SessionState::Active(_) => SessionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Active
    }

    pub fn session(&self) -> Session {
        match &self.state {
            SessionState::Idle { last_classroom } => Session::idle(*last_classroom),
            SessionState::Active(active) => Session::active(active.classroom_id, active.started_at),
        }
    }

    pub fn roster(&self) -> &Arc<RosterViewModel> {
        &self.roster
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of `start` calls rejected because a session was already active.
    pub fn rejected_starts(&self) -> usize {
        self.rejected_starts
    }

    /// Enters the Active state for `classroom_id`: asks the backend to open
    /// a recognition session, fetches the baseline roster, then arms the
    /// capture timer.
    ///
    /// Starting while already active is rejected without touching the
    /// running session.
    pub fn start(&mut self, classroom_id: ClassroomId) -> Result<(), SessionError> {
        if let SessionState::Active(active) = &self.state {
            self.rejected_starts += 1;
            log::warn!(
                "Ignoring start for classroom {classroom_id}: classroom {} is already active",
                active.classroom_id
            );
            return Err(SessionError::AlreadyActive {
                active: active.classroom_id,
                requested: classroom_id,
            });
        }

        log::info!(
            "Starting live attendance for classroom {classroom_id} (every {}ms)",
            self.interval.as_millis()
        );
        self.open_remote_session(classroom_id);

        if self
            .roster
            .snapshot()
            .classroom_id()
            .is_some_and(|shown| shown != classroom_id)
        {
            self.roster.reset();
        }

        let live = Arc::new(AtomicBool::new(true));
        let started_at = Local::now();

        // Issued before the timer exists, so the baseline always precedes
        // any tick-driven refresh.
        let baseline = self.roster.issue(classroom_id);
        let roster = self.roster.clone();
        let baseline_live = live.clone();
        self.scheduler.spawn(Box::new(move || {
            if let Err(e) = roster.complete(baseline, || baseline_live.load(Ordering::SeqCst)) {
                log::warn!("Baseline roster fetch failed: {e}");
            }
        }));

        let timer = self
            .scheduler
            .schedule_repeating(self.interval, self.tick_task(classroom_id, live.clone()));

        self.state = SessionState::Active(ActiveSession {
            classroom_id,
            started_at,
            live,
            timer,
        });
        self.notifier
            .notify(Notification::SessionStarted { classroom_id });
        Ok(())
    }

    /// Returns to Idle. The capture timer is cancelled before this returns;
    /// the remote close request may still be in flight. Calling it while
    /// idle does nothing.
    pub fn stop(&mut self) {
        let active = match &self.state {
            SessionState::Idle { .. } => {
                log::debug!("Stop requested with no active session");
                return;
            }
            SessionState::Active(active) => active.classroom_id,
        };
        let previous = std::mem::replace(
            &mut self.state,
            SessionState::Idle {
                last_classroom: Some(active),
            },
        );

        if let SessionState::Active(session) = previous {
            session.live.store(false, Ordering::SeqCst);
            session.timer.cancel();
            log::info!(
                "Stopped live attendance for classroom {} after {}s",
                session.classroom_id,
                (Local::now() - session.started_at).num_seconds()
            );
        }

        self.close_remote_session();
        self.notifier.notify(Notification::SessionStopped {
            classroom_id: active,
        });
    }

    fn open_remote_session(&self, classroom_id: ClassroomId) {
        let backend = self.backend.clone();
        let notifier = self.notifier.clone();
        self.scheduler.spawn(Box::new(move || {
            if let Err(e) = backend.open_session(classroom_id) {
                log::warn!("Could not open recognition session for classroom {classroom_id}: {e}");
                notifier.notify(Notification::RemoteSessionFailed {
                    action: RemoteAction::Open,
                    message: e.to_string(),
                });
            }
        }));
    }

    fn close_remote_session(&self) {
        let backend = self.backend.clone();
        let notifier = self.notifier.clone();
        self.scheduler.spawn(Box::new(move || {
            if let Err(e) = backend.close_session() {
                log::warn!("Could not close recognition session: {e}");
                notifier.notify(Notification::RemoteSessionFailed {
                    action: RemoteAction::Close,
                    message: e.to_string(),
                });
            }
        }));
    }

    fn tick_task(&self, classroom_id: ClassroomId, live: Arc<AtomicBool>) -> RepeatingFn {
        let pipeline = self.pipeline.clone();
        let roster = self.roster.clone();
        let notifier = self.notifier.clone();
        Arc::new(move || run_cycle(&pipeline, &roster, &*notifier, classroom_id, &live))
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One tick: capture and submit a frame, then refresh the roster. Each tick
/// owns its classroom id and frame; only `live` is shared with other ticks.
fn run_cycle(
    pipeline: &FramePipeline,
    roster: &RosterViewModel,
    notifier: &dyn SessionNotifier,
    classroom_id: ClassroomId,
    live: &AtomicBool,
) {
    if !live.load(Ordering::SeqCst) {
        return;
    }

    let outcome = pipeline.capture_and_submit(classroom_id);
    if outcome == CycleOutcome::Skipped {
        return;
    }
    if !live.load(Ordering::SeqCst) {
        log::debug!("Session stopped during frame submission, ignoring result");
        return;
    }

    if let CycleOutcome::Submitted { recognized_count } = outcome {
        if recognized_count > 0 {
            notifier.notify(Notification::StudentsRecognized {
                count: recognized_count,
            });
        }
    }

    if let Err(e) = roster.refresh_if(classroom_id, || live.load(Ordering::SeqCst)) {
        log::warn!("Roster refresh failed, retrying next tick: {e}");
    }
}
