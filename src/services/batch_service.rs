use futures::future::join_all;
use uuid::Uuid;

use crate::dto::application_dto::{BatchTransitionRequest, TransitionRequest};
use crate::dto::batch_dto::{BatchItemResult, BatchOutcome, BatchReport};
use crate::models::actor::Actor;
use crate::services::application_service::ApplicationService;

/// Runs one status change over many applications. Items are independent: each one goes
/// through the single-item state machine and its failure stays in its own result.
#[derive(Clone)]
pub struct BatchService {
    applications: ApplicationService,
}

impl BatchService {
    pub fn new(applications: ApplicationService) -> Self {
        Self { applications }
    }

    pub async fn transition_many(&self, actor: &Actor, req: BatchTransitionRequest) -> BatchReport {
        let mut ids: Vec<Uuid> = Vec::with_capacity(req.application_ids.len());
        for id in req.application_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let tasks = ids.iter().map(|&id| {
            let single = TransitionRequest {
                application_id: id,
                new_status: req.new_status,
                comment: req.comment.clone(),
            };
            async move {
                let outcome = match self.applications.transition(actor, single).await {
                    Ok(_) => BatchOutcome::Success,
                    Err(e) => {
                        tracing::warn!(application_id = %id, error = %e, "batch item skipped");
                        BatchOutcome::from(&e)
                    }
                };
                BatchItemResult { id, outcome }
            }
        });
        let results = join_all(tasks).await;

        let succeeded = results
            .iter()
            .filter(|r| r.outcome == BatchOutcome::Success)
            .count();
        tracing::info!(
            status = req.new_status.label(),
            total = results.len(),
            succeeded,
            "batch status update settled"
        );
        BatchReport::settled(results)
    }
}
