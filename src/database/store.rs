use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::applicant::ApplicantSummary;
use crate::models::application::{Application, ApplicationStatus};
use crate::models::notification::{
    JobResolution, NotificationJob, NotificationRecord, QueuedNotification,
};

/// Filter shared by the review queue and the export projection. Always scoped to one school.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub school_id: Uuid,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl ApplicationFilter {
    pub fn for_school(school_id: Uuid) -> Self {
        Self {
            school_id,
            status: None,
            search: None,
            created_between: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    ApplicationStatus,
    PaymentStatus,
    PaymentAmount,
    InterviewStatus,
    InterviewDateTime,
    ApplicantName,
}

impl SortField {
    /// Column expression for the `applications a LEFT JOIN users u` query. Fixed strings only.
    pub(crate) const fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "a.created_at",
            SortField::UpdatedAt => "a.updated_at",
            SortField::ApplicationStatus => "a.application_status",
            SortField::PaymentStatus => "a.payment_status",
            SortField::PaymentAmount => "a.payment_amount",
            SortField::InterviewStatus => "(a.interview->>'status')",
            SortField::InterviewDateTime => "((a.interview->>'dateTime')::timestamptz)",
            SortField::ApplicantName => "u.name",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortField::UpdatedAt),
            "applicationStatus" | "application_status" => Ok(SortField::ApplicationStatus),
            "payment.status" | "paymentStatus" => Ok(SortField::PaymentStatus),
            "payment.amount" | "paymentAmount" => Ok(SortField::PaymentAmount),
            "interview.status" | "interviewStatus" => Ok(SortField::InterviewStatus),
            "interview.dateTime" | "interviewDateTime" => Ok(SortField::InterviewDateTime),
            "applicant.name" | "applicantName" => Ok(SortField::ApplicantName),
            other => Err(Error::InvalidArgument(format!("Unsupported sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(SortOrder::Asc),
            "desc" | "-1" => Ok(SortOrder::Desc),
            other => Err(Error::InvalidArgument(format!("Unsupported sort order: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

/// An application joined with the safe projection of its applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationListing {
    #[serde(flatten)]
    pub application: Application,
    pub applicant: Option<ApplicantSummary>,
}

/// Persistence collaborator. Implementations must make `save` and `finish_notification`
/// atomic per application.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert(&self, application: Application) -> Result<Application>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>>;

    /// Writes the mutable parts of `application` (status, payment, timeline, documents,
    /// interview) if the stored version still equals `application.version`. Returns the
    /// stored document with the bumped version; `Conflict` on a version mismatch.
    /// Never touches `notifications`.
    async fn save(&self, application: &Application) -> Result<Application>;

    /// Sorted page of listings plus the total number of matches. `limit = None` returns
    /// every match from `skip` on.
    async fn find(
        &self,
        filter: &ApplicationFilter,
        sort: SortSpec,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<(Vec<ApplicationListing>, i64)>;

    async fn find_applicant(&self, id: Uuid) -> Result<Option<ApplicantSummary>>;

    async fn school_exists(&self, id: Uuid) -> Result<bool>;

    /// Persists a pending email job, due immediately.
    async fn enqueue_notification(&self, job: NotificationJob) -> Result<QueuedNotification>;

    /// Marks the oldest due job as running and returns it. Concurrent callers never
    /// receive the same job.
    async fn claim_notification(&self) -> Result<Option<QueuedNotification>>;

    /// Appends `record` to the application's notifications and applies `resolution` to the
    /// job in one atomic step. Never bumps the application version.
    async fn finish_notification(
        &self,
        job_id: Uuid,
        record: NotificationRecord,
        resolution: &JobResolution,
    ) -> Result<()>;

    /// Returns jobs left running by a stopped worker to the pending state.
    async fn release_stalled_notifications(&self) -> Result<u64>;

    async fn find_notification_job(&self, id: Uuid) -> Result<Option<QueuedNotification>>;
}

/// Escapes `%`, `_` and `\` so user input is matched literally inside ILIKE patterns.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_accepts_api_and_column_names() {
        assert_eq!("createdAt".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!("payment.amount".parse::<SortField>().unwrap(), SortField::PaymentAmount);
        assert!("1; DROP TABLE applications".parse::<SortField>().is_err());
    }

    #[test]
    fn sort_order_is_case_insensitive() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("-1".parse::<SortOrder>().unwrap(), SortOrder::Desc);
    }

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
