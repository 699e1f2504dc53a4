use crate::shared::classroom_id::ClassroomId;

/// One encoded still bound to the classroom it was captured for.
///
/// Built fresh on every tick and consumed by the submission; it is never
/// stored, queued or retried.
#[derive(Debug, PartialEq, Eq)]
pub struct CapturedFrame {
    classroom_id: ClassroomId,
    jpeg: Vec<u8>,
}

impl CapturedFrame {
    pub fn new(classroom_id: ClassroomId, jpeg: Vec<u8>) -> Self {
        Self { classroom_id, jpeg }
    }

    pub fn classroom_id(&self) -> ClassroomId {
        self.classroom_id
    }

    pub fn jpeg(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn into_parts(self) -> (ClassroomId, Vec<u8>) {
        (self.classroom_id, self.jpeg)
    }
}
