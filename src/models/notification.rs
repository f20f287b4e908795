use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::application::ApplicationStatus;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationChannel {
    Email,
    #[serde(rename = "SMS")]
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// One delivery attempt. Written by the notification worker after the transition that
/// triggered it has already been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(rename = "type")]
    pub channel: NotificationChannel,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl NotificationRecord {
    pub fn email(message: impl Into<String>, status: DeliveryStatus, sent_at: DateTime<Utc>) -> Self {
        Self {
            channel: NotificationChannel::Email,
            message: message.into(),
            sent_at,
            status,
        }
    }
}

/// Email templates known to the mail relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailTemplate {
    Approved,
    Rejected,
    StatusUpdate,
    InterviewScheduled,
}

impl EmailTemplate {
    /// Approved and Rejected have dedicated templates; any other status gets the generic one.
    pub fn for_status(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Approved => EmailTemplate::Approved,
            ApplicationStatus::Rejected => EmailTemplate::Rejected,
            ApplicationStatus::Pending => EmailTemplate::StatusUpdate,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            EmailTemplate::Approved => "Approved",
            EmailTemplate::Rejected => "Rejected",
            EmailTemplate::StatusUpdate => "StatusUpdate",
            EmailTemplate::InterviewScheduled => "InterviewScheduled",
        }
    }

    /// Number of positional parameters, applicant name first.
    pub const fn arity(self) -> usize {
        match self {
            EmailTemplate::Approved | EmailTemplate::Rejected => 1,
            EmailTemplate::StatusUpdate => 2,
            EmailTemplate::InterviewScheduled => 4,
        }
    }
}

impl std::str::FromStr for EmailTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(EmailTemplate::Approved),
            "Rejected" => Ok(EmailTemplate::Rejected),
            "StatusUpdate" => Ok(EmailTemplate::StatusUpdate),
            "InterviewScheduled" => Ok(EmailTemplate::InterviewScheduled),
            other => Err(Error::InvalidArgument(format!("Unknown email template: {}", other))),
        }
    }
}

/// Attempts a queued email gets before it is left as failed.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub application_id: Uuid,
    pub applicant_id: Uuid,
    pub template: EmailTemplate,
    /// Parameters following the applicant name.
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Sent,
    Failed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Sent => "sent",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "sent" => Ok(JobStatus::Sent),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Internal(format!("Unknown notification job status: {}", other))),
        }
    }
}

/// A persisted outbox row. Survives restarts until it is sent or out of attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub job: NotificationJob,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueuedNotification {
    pub fn new(job: NotificationJob, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            next_attempt_at: at,
            last_error: None,
            created_at: at,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.next_attempt_at <= now
    }

    /// Applies the outcome of one delivery attempt.
    pub fn resolve(&mut self, resolution: &JobResolution) {
        self.attempts += 1;
        match resolution {
            JobResolution::Sent => {
                self.status = JobStatus::Sent;
                self.last_error = None;
            }
            JobResolution::RetryAt(at, error) => {
                self.status = JobStatus::Pending;
                self.next_attempt_at = *at;
                self.last_error = Some(error.clone());
            }
            JobResolution::GiveUp(error) => {
                self.status = JobStatus::Failed;
                self.last_error = Some(error.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResolution {
    Sent,
    RetryAt(DateTime<Utc>, String),
    GiveUp(String),
}

impl JobResolution {
    pub fn status(&self) -> JobStatus {
        match self {
            JobResolution::Sent => JobStatus::Sent,
            JobResolution::RetryAt(..) => JobStatus::Pending,
            JobResolution::GiveUp(_) => JobStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobResolution::Sent => None,
            JobResolution::RetryAt(_, e) | JobResolution::GiveUp(e) => Some(e),
        }
    }

    pub fn next_attempt_at(&self) -> Option<DateTime<Utc>> {
        match self {
            JobResolution::RetryAt(at, _) => Some(*at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn queued() -> QueuedNotification {
        QueuedNotification::new(
            NotificationJob {
                application_id: Uuid::new_v4(),
                applicant_id: Uuid::new_v4(),
                template: EmailTemplate::Approved,
                params: vec![],
            },
            Utc::now(),
        )
    }

    #[test]
    fn retry_keeps_the_job_pending_until_due() {
        let mut q = queued();
        let later = Utc::now() + Duration::seconds(30);
        q.resolve(&JobResolution::RetryAt(later, "relay down".into()));

        assert_eq!(q.status, JobStatus::Pending);
        assert_eq!(q.attempts, 1);
        assert!(!q.is_due(Utc::now()));
        assert!(q.is_due(later));
    }

    #[test]
    fn give_up_is_terminal() {
        let mut q = queued();
        q.resolve(&JobResolution::GiveUp("no contact".into()));
        assert_eq!(q.status, JobStatus::Failed);
        assert!(!q.is_due(Utc::now() + Duration::days(1)));
    }

    #[test]
    fn template_keys_parse_back() {
        for t in [
            EmailTemplate::Approved,
            EmailTemplate::Rejected,
            EmailTemplate::StatusUpdate,
            EmailTemplate::InterviewScheduled,
        ] {
            assert_eq!(t.key().parse::<EmailTemplate>().unwrap(), t);
        }
        assert!("Welcome".parse::<EmailTemplate>().is_err());
    }
}
