use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// How a student checked in. Unknown values from the backend are kept
/// verbatim so they still show up in the total.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Late,
    Other(String),
}

impl From<&str> for AttendanceStatus {
    fn from(value: &str) -> Self {
        match value {
            "present" => AttendanceStatus::Present,
            "late" => AttendanceStatus::Late,
            other => AttendanceStatus::Other(other.to_string()),
        }
    }
}

impl Default for AttendanceStatus {
    /// The backend records check-ins as present unless told otherwise.
    fn default() -> Self {
        AttendanceStatus::Present
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or_else(AttendanceStatus::default, |raw| {
            AttendanceStatus::from(raw.as_str())
        }))
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Late => write!(f, "late"),
            AttendanceStatus::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// One check-in as reported by the backend. Records are never edited
/// locally; a newer roster snapshot replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendanceRecord {
    id: i64,
    student_id: String,
    student_name: String,
    #[serde(deserialize_with = "deserialize_check_in_time")]
    check_in_time: NaiveDateTime,
    #[serde(default)]
    status: AttendanceStatus,
    /// Absent for rows marked by hand.
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    is_verified: Option<bool>,
}

impl AttendanceRecord {
    pub fn new(
        id: i64,
        student_id: impl Into<String>,
        student_name: impl Into<String>,
        check_in_time: NaiveDateTime,
        status: AttendanceStatus,
        confidence_score: impl Into<Option<f64>>,
    ) -> Self {
        Self {
            id,
            student_id: student_id.into(),
            student_name: student_name.into(),
            check_in_time,
            status,
            confidence_score: confidence_score.into(),
            is_verified: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn check_in_time(&self) -> NaiveDateTime {
        self.check_in_time
    }

    pub fn status(&self) -> &AttendanceStatus {
        &self.status
    }

    pub fn confidence_score(&self) -> Option<f64> {
        self.confidence_score
    }

    pub fn is_verified(&self) -> Option<bool> {
        self.is_verified
    }

    /// Confidence as a display percentage, clamped to 0-100. `None` when
    /// the backend reported no score.
    pub fn confidence_percent(&self) -> Option<f64> {
        self.confidence_score
            .filter(|score| !score.is_nan())
            .map(|score| score.clamp(0.0, 1.0) * 100.0)
    }
}

/// Accepts RFC 3339 timestamps as well as the naive ISO timestamps the
/// backend emits for local check-in times.
fn deserialize_check_in_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_check_in_time(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid check_in_time '{raw}'"))
    })
}

fn parse_check_in_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
}
