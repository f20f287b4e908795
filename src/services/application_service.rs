use std::sync::Arc;

use uuid::Uuid;

use crate::database::ApplicationStore;
use crate::dto::application_dto::{CompletePayment, SubmitApplication, TransitionRequest};
use crate::error::{Error, Result};
use crate::models::actor::{Actor, Role};
use crate::models::application::{Application, PaymentStatus};
use crate::services::notification_service::{EmailTemplate, NotificationJob, NotificationOutbox};
use crate::utils::time::now;

/// Owns the application state machine: submission, status transitions and payment.
#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn ApplicationStore>,
    outbox: NotificationOutbox,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn ApplicationStore>, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    pub async fn submit(&self, actor: &Actor, input: SubmitApplication) -> Result<Application> {
        if actor.role != Role::Applicant {
            return Err(Error::Forbidden("Only applicants can submit applications".into()));
        }
        if self.store.find_applicant(actor.id).await?.is_none() {
            return Err(Error::NotFound("Applicant not found".into()));
        }
        if !self.store.school_exists(input.school_id).await? {
            return Err(Error::NotFound("School not found".into()));
        }

        let application = Application::new(
            actor.id,
            input.school_id,
            input.personal_info,
            input.academic_info,
            input.essay_answer,
            input.payment_amount,
            now(),
        );
        let application = self.store.insert(application).await?;
        tracing::info!(
            application_id = %application.id,
            school_id = %application.school_id,
            "application submitted"
        );
        Ok(application)
    }

    pub async fn load(&self, id: Uuid) -> Result<Application> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Application> {
        let application = self.load(id).await?;
        actor.ensure_can_view(application.applicant_id, application.school_id)?;
        Ok(application)
    }

    /// Applies one status change. The payment gate is checked before anything is written,
    /// and the notification is only queued once the new state has been committed.
    pub async fn transition(&self, actor: &Actor, req: TransitionRequest) -> Result<Application> {
        let mut application = self.load(req.application_id).await?;
        actor.ensure_can_review(application.school_id)?;

        if let Err(e) = application.transition(req.new_status, req.comment, Some(actor.id), now()) {
            tracing::info!(
                application_id = %req.application_id,
                status = req.new_status.label(),
                error = %e,
                "transition refused"
            );
            return Err(e);
        }

        let saved = self.store.save(&application).await?;
        tracing::info!(
            application_id = %saved.id,
            status = saved.application_status.label(),
            actor = %actor.id,
            "application status updated"
        );

        self.notify_status(&saved).await;
        Ok(saved)
    }

    /// Marks the fee as paid. Paying twice is a no-op and returns the stored application.
    pub async fn complete_payment(
        &self,
        actor: &Actor,
        id: Uuid,
        input: CompletePayment,
    ) -> Result<Application> {
        let mut application = self.load(id).await?;
        actor.ensure_can_view(application.applicant_id, application.school_id)?;

        if application.payment.is_completed() {
            return Ok(application);
        }

        application.payment.status = PaymentStatus::Completed;
        if input.transaction_id.is_some() {
            application.payment.transaction_id = input.transaction_id;
        }
        if input.payment_method.is_some() {
            application.payment.payment_method = input.payment_method;
        }
        application.updated_at = now();

        let saved = self.store.save(&application).await?;
        tracing::info!(application_id = %saved.id, "payment completed");
        Ok(saved)
    }

    async fn notify_status(&self, application: &Application) {
        let template = EmailTemplate::for_status(application.application_status);
        let params = match template {
            EmailTemplate::StatusUpdate => vec![application.application_status.label().to_string()],
            _ => Vec::new(),
        };
        self.outbox
            .enqueue(NotificationJob {
                application_id: application.id,
                applicant_id: application.applicant_id,
                template,
                params,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryApplicationStore;
    use crate::models::applicant::ApplicantSummary;
    use crate::models::application::{fixtures, ApplicationStatus};
    use crate::services::notification_service::{self, MockMailer};

    fn reviewer(school_id: Uuid) -> Actor {
        Actor::new(Uuid::new_v4(), Role::Staff, Some(school_id))
    }

    async fn service_with(app: Application) -> (ApplicationService, Arc<MemoryApplicationStore>) {
        let store = Arc::new(MemoryApplicationStore::new());
        store.insert(app).await.unwrap();
        let (outbox, _worker) =
            notification_service::channel(Arc::new(MockMailer::new()), store.clone());
        (ApplicationService::new(store.clone(), outbox), store)
    }

    #[tokio::test]
    async fn transition_requires_reviewer_of_the_school() {
        let app = fixtures::application();
        let id = app.id;
        let (svc, _) = service_with(app).await;

        let outsider = reviewer(Uuid::new_v4());
        let err = svc
            .transition(
                &outsider,
                TransitionRequest {
                    application_id: id,
                    new_status: ApplicationStatus::Pending,
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let (svc, _) = service_with(fixtures::application()).await;
        let err = svc
            .transition(
                &Actor::new(Uuid::new_v4(), Role::SuperAdmin, None),
                TransitionRequest {
                    application_id: Uuid::new_v4(),
                    new_status: ApplicationStatus::Approved,
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn payment_completion_is_idempotent() {
        let app = fixtures::application();
        let (id, school) = (app.id, app.school_id);
        let (svc, _) = service_with(app).await;
        let staff = reviewer(school);

        let first = svc
            .complete_payment(
                &staff,
                id,
                CompletePayment {
                    transaction_id: Some("TX-9".into()),
                    payment_method: None,
                },
            )
            .await
            .unwrap();
        let second = svc
            .complete_payment(&staff, id, CompletePayment::default())
            .await
            .unwrap();

        assert!(first.payment.is_completed());
        assert_eq!(second.version, first.version);
        assert_eq!(second.payment.transaction_id.as_deref(), Some("TX-9"));
        assert!(second.timeline.is_empty());
    }

    fn submission(school_id: Uuid) -> SubmitApplication {
        SubmitApplication {
            school_id,
            personal_info: fixtures::personal_info(),
            academic_info: fixtures::academic_info(),
            essay_answer: None,
            payment_amount: rust_decimal::Decimal::new(50_000, 0),
        }
    }

    async fn registered_applicant(store: &MemoryApplicationStore) -> Actor {
        let id = Uuid::new_v4();
        store
            .insert_applicant(ApplicantSummary {
                id,
                name: "Ada Obi".into(),
                email: "ada@example.com".into(),
            })
            .await;
        Actor::new(id, Role::Applicant, None)
    }

    #[tokio::test]
    async fn submission_to_an_unknown_school_is_not_found() {
        let (svc, store) = service_with(fixtures::application()).await;
        let applicant = registered_applicant(&store).await;

        let err = svc
            .submit(&applicant, submission(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref msg) if msg == "School not found"));

        let school = Uuid::new_v4();
        store.insert_school(school).await;
        let created = svc.submit(&applicant, submission(school)).await.unwrap();
        assert_eq!(created.school_id, school);
        assert_eq!(created.application_status, ApplicationStatus::Pending);
    }

    #[tokio::test]
    async fn only_registered_applicants_can_submit() {
        let (svc, _) = service_with(fixtures::application()).await;
        let input = submission(Uuid::new_v4());

        let staff = reviewer(input.school_id);
        assert!(matches!(
            svc.submit(&staff, input.clone()).await.unwrap_err(),
            Error::Forbidden(_)
        ));

        let stranger = Actor::new(Uuid::new_v4(), Role::Applicant, None);
        assert!(matches!(
            svc.submit(&stranger, input).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
