use std::sync::Arc;

use crate::database::ApplicationStore;
use crate::dto::application_dto::ScheduleInterview;
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::application::Application;
use crate::models::timeline::TimelineStatus;
use crate::services::notification_service::{EmailTemplate, NotificationJob, NotificationOutbox};
use crate::utils::time::{format_clock_time, format_long_date, now};

#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn ApplicationStore>,
    outbox: NotificationOutbox,
}

impl InterviewService {
    pub fn new(store: Arc<dyn ApplicationStore>, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    /// Books (or re-books) the interview slot, logs it on the timeline and queues the
    /// invitation email after the write has committed.
    pub async fn schedule(&self, actor: &Actor, req: ScheduleInterview) -> Result<Application> {
        if req.location.trim().is_empty() {
            return Err(Error::InvalidArgument("Interview location is required".into()));
        }

        let mut application = self
            .store
            .find_by_id(req.application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        actor.ensure_can_review(application.school_id)?;

        let date = format_long_date(req.date_time);
        let time = format_clock_time(req.date_time);
        let comment = format!(
            "Interview scheduled for {} at {} in {}",
            date, time, req.location
        );

        application.interview.schedule(
            req.date_time,
            req.location.clone(),
            req.notes,
            req.interviewers,
        );
        let at = now();
        application.timeline.append(
            TimelineStatus::InterviewScheduled,
            Some(comment),
            Some(actor.id),
            at,
        );
        application.updated_at = at;

        let saved = self.store.save(&application).await?;
        tracing::info!(
            application_id = %saved.id,
            date_time = %req.date_time,
            location = %req.location,
            "interview scheduled"
        );

        self.outbox
            .enqueue(NotificationJob {
                application_id: saved.id,
                applicant_id: saved.applicant_id,
                template: EmailTemplate::InterviewScheduled,
                params: vec![date, time, req.location],
            })
            .await;
        Ok(saved)
    }
}
