use chrono::{DateTime, Local};
use thiserror::Error;

use crate::shared::classroom_id::ClassroomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Active,
}

/// Point-in-time view of the controller's session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The active classroom, or the last one a session ran for while idle.
    pub classroom_id: Option<ClassroomId>,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Local>>,
}

impl Session {
    pub fn idle(last_classroom: Option<ClassroomId>) -> Self {
        Self {
            classroom_id: last_classroom,
            status: SessionStatus::Idle,
            started_at: None,
        }
    }

    pub fn active(classroom_id: ClassroomId, started_at: DateTime<Local>) -> Self {
        Self {
            classroom_id: Some(classroom_id),
            status: SessionStatus::Active,
            started_at: Some(started_at),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot start classroom {requested}: session for classroom {active} is already active")]
    AlreadyActive {
        active: ClassroomId,
        requested: ClassroomId,
    },
}
