use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::application::ApplicationStatus;

/// Status recorded on a timeline entry. Superset of the application statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineStatus {
    Pending,
    Approved,
    Rejected,
    InterviewScheduled,
}

impl TimelineStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TimelineStatus::Pending => "Pending",
            TimelineStatus::Approved => "Approved",
            TimelineStatus::Rejected => "Rejected",
            TimelineStatus::InterviewScheduled => "InterviewScheduled",
        }
    }
}

impl From<ApplicationStatus> for TimelineStatus {
    fn from(value: ApplicationStatus) -> Self {
        match value {
            ApplicationStatus::Pending => TimelineStatus::Pending,
            ApplicationStatus::Approved => TimelineStatus::Approved,
            ApplicationStatus::Rejected => TimelineStatus::Rejected,
        }
    }
}

impl std::str::FromStr for TimelineStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TimelineStatus::Pending),
            "Approved" => Ok(TimelineStatus::Approved),
            "Rejected" => Ok(TimelineStatus::Rejected),
            "InterviewScheduled" => Ok(TimelineStatus::InterviewScheduled),
            other => Err(crate::error::Error::InvalidArgument(format!(
                "Unknown timeline status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: TimelineStatus,
    pub comment: Option<String>,
    pub updated_by: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit trail. Entries are never reordered, edited or removed; the
/// insertion order is the chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline(Vec<TimelineEntry>);

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        status: TimelineStatus,
        comment: Option<String>,
        updated_by: Option<Uuid>,
        timestamp: DateTime<Utc>,
    ) -> &TimelineEntry {
        self.0.push(TimelineEntry {
            status,
            comment,
            updated_by,
            timestamp,
        });
        &self.0[self.0.len() - 1]
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&TimelineEntry> {
        self.0.last()
    }
}

impl From<Vec<TimelineEntry>> for Timeline {
    fn from(value: Vec<TimelineEntry>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_existing_prefix() {
        let mut timeline = Timeline::new();
        let t0 = Utc::now();
        timeline.append(TimelineStatus::Pending, None, None, t0);
        let before = timeline.entries().to_vec();

        timeline.append(TimelineStatus::Approved, Some("ok".into()), None, t0);
        timeline.append(TimelineStatus::Approved, Some("ok".into()), None, t0);

        assert_eq!(timeline.len(), 3);
        assert_eq!(&timeline.entries()[..1], before.as_slice());
        assert_eq!(timeline.last().map(|e| e.status), Some(TimelineStatus::Approved));
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut timeline = Timeline::new();
        timeline.append(TimelineStatus::InterviewScheduled, None, None, Utc::now());
        let value = serde_json::to_value(&timeline).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["status"], "InterviewScheduled");
    }
}
