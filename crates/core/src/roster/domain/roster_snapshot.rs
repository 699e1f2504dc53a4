use std::sync::Arc;

use crate::roster::domain::attendance_record::{AttendanceRecord, AttendanceStatus};
use crate::shared::classroom_id::ClassroomId;

/// Status tallies derived from a roster snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RosterCounts {
    pub present: usize,
    pub late: usize,
    pub total: usize,
}

/// An immutable, cheaply clonable view of one roster fetch.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    classroom_id: Option<ClassroomId>,
    records: Arc<[AttendanceRecord]>,
    sequence: u64,
}

impl RosterSnapshot {
    pub fn empty() -> Self {
        Self {
            classroom_id: None,
            records: Arc::from(Vec::new()),
            sequence: 0,
        }
    }

    pub fn new(classroom_id: ClassroomId, records: Vec<AttendanceRecord>, sequence: u64) -> Self {
        Self {
            classroom_id: Some(classroom_id),
            records: Arc::from(records),
            sequence,
        }
    }

    pub fn classroom_id(&self) -> Option<ClassroomId> {
        self.classroom_id
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// Issue sequence of the refresh that produced this snapshot (0 if none).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Computed on every call; there is no cached counter to drift.
    pub fn counts(&self) -> RosterCounts {
        let mut counts = RosterCounts {
            total: self.records.len(),
            ..RosterCounts::default()
        };
        for record in self.records.iter() {
            match record.status() {
                AttendanceStatus::Present => counts.present += 1,
                AttendanceStatus::Late => counts.late += 1,
                AttendanceStatus::Other(_) => {}
            }
        }
        counts
    }
}

impl Default for RosterSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
