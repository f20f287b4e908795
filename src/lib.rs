pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::database::ApplicationStore;
use crate::services::{
    application_service::ApplicationService,
    batch_service::BatchService,
    document_service::{DocumentService, MediaStore},
    interview_service::InterviewService,
    notification_service::{self, Mailer, NotificationWorker},
    review_service::ReviewService,
    timeline_service::TimelineService,
};

#[derive(Clone)]
pub struct AppState {
    pub application_service: ApplicationService,
    pub timeline_service: TimelineService,
    pub interview_service: InterviewService,
    pub review_service: ReviewService,
    pub batch_service: BatchService,
    pub document_service: DocumentService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wires every service around one store. The returned worker must be driven
    /// (`run` or `drain`) for queued notifications to be delivered.
    pub fn new(
        store: Arc<dyn ApplicationStore>,
        mailer: Arc<dyn Mailer>,
        media: Arc<dyn MediaStore>,
        jwt_secret: impl Into<Arc<str>>,
    ) -> (Self, NotificationWorker) {
        let (outbox, worker) = notification_service::channel(mailer, store.clone());

        let application_service = ApplicationService::new(store.clone(), outbox.clone());
        let timeline_service = TimelineService::new(store.clone());
        let interview_service = InterviewService::new(store.clone(), outbox);
        let review_service = ReviewService::new(store.clone());
        let batch_service = BatchService::new(application_service.clone());
        let document_service = DocumentService::new(store, media);

        let state = Self {
            application_service,
            timeline_service,
            interview_service,
            review_service,
            batch_service,
            document_service,
            jwt_secret: jwt_secret.into(),
        };
        (state, worker)
    }
}
