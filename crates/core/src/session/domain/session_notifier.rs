use std::fmt;

use crate::shared::classroom_id::ClassroomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Open,
    Close,
}

/// A user-facing event of a live attendance session.
///
/// Transient frame and roster failures are deliberately absent: they are
/// retried by the next tick and never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    SessionStarted { classroom_id: ClassroomId },
    SessionStopped { classroom_id: ClassroomId },
    RemoteSessionFailed { action: RemoteAction, message: String },
    StudentsRecognized { count: u32 },
}

impl Notification {
    pub fn is_failure(&self) -> bool {
        matches!(self, Notification::RemoteSessionFailed { .. })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::SessionStarted { .. } => write!(f, "Live attendance started"),
            Notification::SessionStopped { .. } => write!(f, "Live attendance stopped"),
            Notification::RemoteSessionFailed { action, message } => {
                let verb = match action {
                    RemoteAction::Open => "open",
                    RemoteAction::Close => "close",
                };
                write!(f, "Failed to {verb} recognition session: {message}")
            }
            Notification::StudentsRecognized { count } => {
                write!(f, "Recognized {count} student(s)")
            }
        }
    }
}

/// Delivers session notifications to whatever surface shows them.
///
/// Called from capture threads, so implementations must be shareable.
pub trait SessionNotifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications through the `log` facade: failures at `warn`,
/// everything else at `info`.
pub struct LogSessionNotifier;

impl SessionNotifier for LogSessionNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_failure() {
            log::warn!("{notification}");
        } else {
            log::info!("{notification}");
        }
    }
}
