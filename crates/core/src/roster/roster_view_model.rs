use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::backend::domain::recognition_backend::{BackendError, RecognitionBackend};
use crate::roster::domain::attendance_record::AttendanceRecord;
use crate::roster::domain::roster_snapshot::{RosterCounts, RosterSnapshot};
use crate::shared::classroom_id::ClassroomId;

/// Which response wins when roster refreshes resolve out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOrdering {
    /// Whichever response resolves last is shown.
    #[default]
    LastResolved,
    /// A response is shown only if it was issued after the one on display.
    LatestIssued,
}

/// Issue-time identity of one roster refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    sequence: u64,
    classroom_id: ClassroomId,
}

impl RefreshTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn classroom_id(&self) -> ClassroomId {
        self.classroom_id
    }
}

/// Called with each newly applied snapshot, while the roster lock is held.
/// Must not call back into the view model.
pub type RosterUpdateFn = Box<dyn Fn(&RosterSnapshot) + Send + Sync>;

struct RosterState {
    snapshot: RosterSnapshot,
    highest_applied: u64,
}

/// Today's attendance for a classroom, as shown to the user.
///
/// The held snapshot is only ever replaced whole, under a lock, so readers
/// see either the previous fetch or the next one and never a mix.
pub struct RosterViewModel {
    backend: Arc<dyn RecognitionBackend>,
    ordering: RefreshOrdering,
    next_sequence: AtomicU64,
    state: Mutex<RosterState>,
    on_update: Option<RosterUpdateFn>,
}

impl RosterViewModel {
    pub fn new(backend: Arc<dyn RecognitionBackend>, ordering: RefreshOrdering) -> Self {
        Self {
            backend,
            ordering,
            next_sequence: AtomicU64::new(1),
            state: Mutex::new(RosterState {
                snapshot: RosterSnapshot::empty(),
                highest_applied: 0,
            }),
            on_update: None,
        }
    }

    pub fn with_on_update(mut self, on_update: RosterUpdateFn) -> Self {
        self.on_update = Some(on_update);
        self
    }

    pub fn ordering(&self) -> RefreshOrdering {
        self.ordering
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        self.lock_state().snapshot.clone()
    }

    pub fn counts(&self) -> RosterCounts {
        self.snapshot().counts()
    }

    /// Drops the held roster, e.g. when switching classrooms. Sequence
    /// numbering carries on, so responses issued before the reset still
    /// compare correctly.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.snapshot = RosterSnapshot::empty();
        if let Some(ref on_update) = self.on_update {
            on_update(&state.snapshot);
        }
    }

    /// Stamps a new refresh with the next sequence number.
    pub fn issue(&self, classroom_id: ClassroomId) -> RefreshTicket {
        RefreshTicket {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            classroom_id,
        }
    }

    /// Fetches and applies the current roster unconditionally.
    pub fn refresh(&self, classroom_id: ClassroomId) -> Result<bool, BackendError> {
        self.refresh_if(classroom_id, || true)
    }

    /// Fetches the current roster and applies it if `still_wanted` holds
    /// once the response arrives. Returns whether it was applied.
    pub fn refresh_if(
        &self,
        classroom_id: ClassroomId,
        still_wanted: impl FnOnce() -> bool,
    ) -> Result<bool, BackendError> {
        let ticket = self.issue(classroom_id);
        self.complete(ticket, still_wanted)
    }

    /// Performs the fetch for an already issued ticket.
    pub fn complete(
        &self,
        ticket: RefreshTicket,
        still_wanted: impl FnOnce() -> bool,
    ) -> Result<bool, BackendError> {
        let records = self.backend.today_attendance(ticket.classroom_id)?;
        Ok(self.apply_if(ticket, records, still_wanted))
    }

    pub fn apply(&self, ticket: RefreshTicket, records: Vec<AttendanceRecord>) -> bool {
        self.apply_if(ticket, records, || true)
    }

    /// Replaces the held roster with `records` unless the response is no
    /// longer wanted or, under [`RefreshOrdering::LatestIssued`], is older
    /// than what is already shown.
    pub fn apply_if(
        &self,
        ticket: RefreshTicket,
        records: Vec<AttendanceRecord>,
        still_wanted: impl FnOnce() -> bool,
    ) -> bool {
        let mut state = self.lock_state();

        if !still_wanted() {
            log::debug!("Dropping roster refresh #{}: no longer wanted", ticket.sequence);
            return false;
        }
        if self.ordering == RefreshOrdering::LatestIssued && ticket.sequence <= state.highest_applied
        {
            log::debug!(
                "Dropping stale roster refresh #{} (showing #{})",
                ticket.sequence,
                state.highest_applied
            );
            return false;
        }

        state.snapshot = RosterSnapshot::new(ticket.classroom_id, records, ticket.sequence);
        state.highest_applied = state.highest_applied.max(ticket.sequence);

        if let Some(ref on_update) = self.on_update {
            on_update(&state.snapshot);
        }
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, RosterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
