use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Document;
use super::interview::Interview;
use super::notification::NotificationRecord;
use super::timeline::{Timeline, TimelineStatus};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Decisions are the statuses gated on a completed payment.
    pub const fn is_decision(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ApplicationStatus::Pending),
            "Approved" => Ok(ApplicationStatus::Approved),
            "Rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(Error::InvalidArgument(format!(
                "Invalid application status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Completed" => Ok(PaymentStatus::Completed),
            other => Err(Error::InvalidArgument(format!("Invalid payment status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Ussd,
    Cash,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "BankTransfer",
            PaymentMethod::Ussd => "Ussd",
            PaymentMethod::Cash => "Cash",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Card" => Ok(PaymentMethod::Card),
            "BankTransfer" => Ok(PaymentMethod::BankTransfer),
            "Ussd" | "USSD" => Ok(PaymentMethod::Ussd),
            "Cash" => Ok(PaymentMethod::Cash),
            other => Err(Error::InvalidArgument(format!("Invalid payment method: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub transaction_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl Payment {
    pub fn pending(amount: Decimal) -> Self {
        Self {
            status: PaymentStatus::Pending,
            amount,
            transaction_id: None,
            payment_method: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGrade {
    pub subject: String,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicInfo {
    pub previous_school: String,
    pub last_class: Option<String>,
    #[serde(default)]
    pub grades: Vec<SubjectGrade>,
}

/// One applicant-to-school submission and everything the review workflow hangs off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub school_id: Uuid,
    pub application_status: ApplicationStatus,
    pub personal_info: PersonalInfo,
    pub academic_info: AcademicInfo,
    pub essay_answer: Option<String>,
    pub payment: Payment,
    pub timeline: Timeline,
    pub documents: Vec<Document>,
    pub interview: Interview,
    pub notifications: Vec<NotificationRecord>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        applicant_id: Uuid,
        school_id: Uuid,
        personal_info: PersonalInfo,
        academic_info: AcademicInfo,
        essay_answer: Option<String>,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            applicant_id,
            school_id,
            application_status: ApplicationStatus::Pending,
            personal_info,
            academic_info,
            essay_answer,
            payment: Payment::pending(amount),
            timeline: Timeline::new(),
            documents: Vec::new(),
            interview: Interview::default(),
            notifications: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the application to `new_status` and records it on the timeline.
    ///
    /// Approve/Reject require a completed payment; a refused transition leaves the
    /// application untouched. Re-asserting the current status is allowed and still
    /// produces a timeline entry.
    pub fn transition(
        &mut self,
        new_status: ApplicationStatus,
        comment: Option<String>,
        actor: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if new_status.is_decision() && !self.payment.is_completed() {
            return Err(Error::PaymentRequired(format!(
                "Payment must be completed before the application can be {}",
                new_status.label().to_lowercase()
            )));
        }

        self.application_status = new_status;
        self.timeline
            .append(TimelineStatus::from(new_status), comment, actor, at);
        self.updated_at = at;
        Ok(())
    }

    pub fn applicant_name(&self) -> String {
        format!(
            "{} {}",
            self.personal_info.first_name.trim(),
            self.personal_info.last_name.trim()
        )
        .trim()
        .to_string()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn personal_info() -> PersonalInfo {
        PersonalInfo {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2012, 5, 14).expect("valid date"),
            gender: Gender::Female,
            address: "12 Marina Road".into(),
            phone: None,
        }
    }

    pub fn academic_info() -> AcademicInfo {
        AcademicInfo {
            previous_school: "Hillside Primary".into(),
            last_class: Some("Primary 6".into()),
            grades: vec![SubjectGrade {
                subject: "Mathematics".into(),
                grade: "A".into(),
            }],
        }
    }

    pub fn application() -> Application {
        Application::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            personal_info(),
            academic_info(),
            None,
            Decimal::new(50_000, 0),
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::application;
    use super::*;

    #[test]
    fn new_application_starts_pending() {
        let app = application();
        assert_eq!(app.application_status, ApplicationStatus::Pending);
        assert_eq!(app.payment.status, PaymentStatus::Pending);
        assert!(app.timeline.is_empty());
        assert_eq!(app.created_at, app.updated_at);
    }

    #[test]
    fn decision_without_payment_is_refused_and_nothing_changes() {
        let mut app = application();
        let before = app.clone();

        for status in [ApplicationStatus::Approved, ApplicationStatus::Rejected] {
            let err = app.transition(status, None, None, Utc::now()).unwrap_err();
            assert!(matches!(err, Error::PaymentRequired(_)));
        }
        assert_eq!(app, before);
    }

    #[test]
    fn pending_is_always_allowed() {
        let mut app = application();
        app.transition(ApplicationStatus::Pending, Some("recheck".into()), None, Utc::now())
            .unwrap();
        assert_eq!(app.timeline.len(), 1);
        assert_eq!(app.timeline.entries()[0].comment.as_deref(), Some("recheck"));
    }

    #[test]
    fn decision_after_payment_appends_entry_and_can_be_reverted() {
        let mut app = application();
        app.payment.status = PaymentStatus::Completed;
        let actor = Uuid::new_v4();

        app.transition(ApplicationStatus::Approved, Some("Strong profile".into()), Some(actor), Utc::now())
            .unwrap();
        app.transition(ApplicationStatus::Approved, None, Some(actor), Utc::now())
            .unwrap();
        app.transition(ApplicationStatus::Pending, None, Some(actor), Utc::now())
            .unwrap();

        let statuses: Vec<_> = app.timeline.entries().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                TimelineStatus::Approved,
                TimelineStatus::Approved,
                TimelineStatus::Pending
            ]
        );
        assert_eq!(app.application_status, ApplicationStatus::Pending);
        assert_eq!(app.timeline.entries()[0].updated_by, Some(actor));
    }

    #[test]
    fn status_parsing_rejects_unknown_values() {
        assert_eq!("Approved".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Approved);
        let err = "approved!".parse::<ApplicationStatus>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn applicant_name_joins_first_and_last() {
        assert_eq!(application().applicant_name(), "Ada Obi");
    }
}
