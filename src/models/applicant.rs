use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Safe projection of the applicant user attached to review listings and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ApplicantSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
