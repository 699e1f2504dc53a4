use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend identifier of a classroom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassroomId(pub i64);

impl From<i64> for ClassroomId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ClassroomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
