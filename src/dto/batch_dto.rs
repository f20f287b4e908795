use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    Success,
    NotFound,
    PaymentRequired,
    Forbidden,
    Conflict,
    Failed,
}

impl From<&Error> for BatchOutcome {
    fn from(err: &Error) -> Self {
        match err {
            Error::NotFound(_) => BatchOutcome::NotFound,
            Error::PaymentRequired(_) => BatchOutcome::PaymentRequired,
            Error::Forbidden(_) => BatchOutcome::Forbidden,
            Error::Conflict(_) => BatchOutcome::Conflict,
            _ => BatchOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub id: Uuid,
    pub outcome: BatchOutcome,
}

/// `success` acknowledges that every item settled, not that every item succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success: bool,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn settled(results: Vec<BatchItemResult>) -> Self {
        Self {
            success: true,
            results,
        }
    }

    pub fn outcome_of(&self, id: Uuid) -> Option<BatchOutcome> {
        self.results.iter().find(|r| r.id == id).map(|r| r.outcome)
    }
}
