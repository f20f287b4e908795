use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::application::{
    AcademicInfo, ApplicationStatus, Gender, PaymentMethod, PersonalInfo, SubjectGrade,
};
use crate::utils::time::from_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfoPayload {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGradePayload {
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub grade: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcademicInfoPayload {
    #[validate(length(min = 1, max = 200))]
    pub previous_school: String,
    pub last_class: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub grades: Vec<SubjectGradePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationPayload {
    pub school_id: Uuid,
    #[validate(nested)]
    pub personal_info: PersonalInfoPayload,
    #[validate(nested)]
    pub academic_info: AcademicInfoPayload,
    #[validate(length(max = 5000))]
    pub essay_answer: Option<String>,
    pub payment_amount: Decimal,
}

/// Validated submission handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitApplication {
    pub school_id: Uuid,
    pub personal_info: PersonalInfo,
    pub academic_info: AcademicInfo,
    pub essay_answer: Option<String>,
    pub payment_amount: Decimal,
}

impl TryFrom<SubmitApplicationPayload> for SubmitApplication {
    type Error = Error;

    fn try_from(payload: SubmitApplicationPayload) -> Result<Self> {
        payload.validate()?;
        if payload.payment_amount <= Decimal::ZERO {
            return Err(Error::InvalidArgument(
                "Payment amount must be greater than zero".into(),
            ));
        }

        let p = payload.personal_info;
        let a = payload.academic_info;
        Ok(Self {
            school_id: payload.school_id,
            personal_info: PersonalInfo {
                first_name: p.first_name.trim().to_string(),
                last_name: p.last_name.trim().to_string(),
                date_of_birth: p.date_of_birth,
                gender: p.gender,
                address: p.address.trim().to_string(),
                phone: p.phone,
            },
            academic_info: AcademicInfo {
                previous_school: a.previous_school.trim().to_string(),
                last_class: a.last_class,
                grades: a
                    .grades
                    .into_iter()
                    .map(|g| SubjectGrade {
                        subject: g.subject,
                        grade: g.grade,
                    })
                    .collect(),
            },
            essay_answer: non_empty(payload.essay_answer),
            payment_amount: payload.payment_amount,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusPayload {
    pub status: String,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Typed input of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub application_id: Uuid,
    pub new_status: ApplicationStatus,
    pub comment: Option<String>,
}

impl UpdateStatusPayload {
    pub fn into_request(self, application_id: Uuid) -> Result<TransitionRequest> {
        self.validate()?;
        Ok(TransitionRequest {
            application_id,
            new_status: self.status.parse()?,
            comment: non_empty(self.comment),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusPayload {
    #[validate(length(min = 1, max = 500))]
    pub application_ids: Vec<Uuid>,
    pub status: String,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTransitionRequest {
    pub application_ids: Vec<Uuid>,
    pub new_status: ApplicationStatus,
    pub comment: Option<String>,
}

impl TryFrom<BatchStatusPayload> for BatchTransitionRequest {
    type Error = Error;

    fn try_from(payload: BatchStatusPayload) -> Result<Self> {
        payload.validate()?;
        Ok(Self {
            application_ids: payload.application_ids,
            new_status: payload.status.parse()?,
            comment: non_empty(payload.comment),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInterviewPayload {
    pub date_time: String,
    #[serde(default)]
    pub location: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub interviewers: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleInterview {
    pub application_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub notes: Option<String>,
    pub interviewers: Option<Vec<Uuid>>,
}

impl ScheduleInterviewPayload {
    pub fn into_request(self, application_id: Uuid) -> Result<ScheduleInterview> {
        self.validate()?;
        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(Error::InvalidArgument("Interview location is required".into()));
        }
        let date_time = from_rfc3339(self.date_time.trim()).map_err(|_| {
            Error::InvalidArgument(format!("Invalid interview date/time: {}", self.date_time))
        })?;

        Ok(ScheduleInterview {
            application_id,
            date_time,
            location,
            notes: non_empty(self.notes),
            interviewers: self.interviewers,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletePaymentPayload {
    #[validate(length(min = 1, max = 128))]
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletePayment {
    pub transaction_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl TryFrom<CompletePaymentPayload> for CompletePayment {
    type Error = Error;

    fn try_from(payload: CompletePaymentPayload) -> Result<Self> {
        payload.validate()?;
        Ok(Self {
            transaction_id: payload.transaction_id,
            payment_method: payload
                .payment_method
                .as_deref()
                .map(str::parse::<PaymentMethod>)
                .transpose()?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
