use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewStatus {
    #[default]
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl InterviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InterviewStatus::Pending => "Pending",
            InterviewStatus::Scheduled => "Scheduled",
            InterviewStatus::Completed => "Completed",
            InterviewStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Interview {
    pub scheduled: bool,
    pub date_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub interviewers: Vec<Uuid>,
    pub notes: Option<String>,
    pub status: InterviewStatus,
}

impl Interview {
    /// Records (or re-records) the slot. `scheduled` only ever goes from false to true;
    /// date, location and notes are overwritten on every call.
    pub fn schedule(
        &mut self,
        date_time: DateTime<Utc>,
        location: String,
        notes: Option<String>,
        interviewers: Option<Vec<Uuid>>,
    ) {
        self.scheduled = true;
        self.date_time = Some(date_time);
        self.location = Some(location);
        self.notes = notes;
        self.status = InterviewStatus::Scheduled;

        if let Some(list) = interviewers {
            let mut unique: Vec<Uuid> = Vec::with_capacity(list.len());
            for id in list {
                if !unique.contains(&id) {
                    unique.push(id);
                }
            }
            self.interviewers = unique;
        }
    }

    /// Label used by reports: an interview that was never booked reads as "Not Scheduled".
    pub fn report_label(&self) -> &'static str {
        if !self.scheduled && self.status == InterviewStatus::Pending {
            "Not Scheduled"
        } else {
            self.status.label()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_interview_is_pending_and_unscheduled() {
        let interview = Interview::default();
        assert!(!interview.scheduled);
        assert_eq!(interview.status, InterviewStatus::Pending);
        assert_eq!(interview.report_label(), "Not Scheduled");
    }

    #[test]
    fn rescheduling_overwrites_slot_but_keeps_flag() {
        let mut interview = Interview::default();
        let first = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap();
        let panel = Uuid::new_v4();

        interview.schedule(first, "Main Hall".into(), Some("bring transcript".into()), Some(vec![panel, panel]));
        interview.schedule(second, "Room 4".into(), None, None);

        assert!(interview.scheduled);
        assert_eq!(interview.status, InterviewStatus::Scheduled);
        assert_eq!(interview.date_time, Some(second));
        assert_eq!(interview.location.as_deref(), Some("Room 4"));
        assert_eq!(interview.notes, None);
        assert_eq!(interview.interviewers, vec![panel]);
        assert_eq!(interview.report_label(), "Scheduled");
    }
}
