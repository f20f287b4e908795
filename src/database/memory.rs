use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{
    ApplicationFilter, ApplicationListing, ApplicationStore, SortField, SortOrder, SortSpec,
};
use crate::error::{Error, Result};
use crate::models::applicant::ApplicantSummary;
use crate::models::application::Application;
use crate::models::notification::{
    JobResolution, JobStatus, NotificationJob, NotificationRecord, QueuedNotification,
};

#[derive(Default)]
struct Inner {
    applications: HashMap<Uuid, Application>,
    applicants: HashMap<Uuid, ApplicantSummary>,
    schools: HashSet<Uuid>,
    /// Insertion order is enqueue order.
    jobs: Vec<QueuedNotification>,
}

/// In-process store with the same contract as the PostgreSQL one. Backs the test-suite
/// and `DATABASE_URL=memory://` demo runs.
#[derive(Clone, Default)]
pub struct MemoryApplicationStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already knows `schools`.
    pub fn with_schools(schools: impl IntoIterator<Item = Uuid>) -> Self {
        let inner = Inner {
            schools: schools.into_iter().collect(),
            ..Default::default()
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub async fn insert_applicant(&self, applicant: ApplicantSummary) {
        self.inner
            .write()
            .await
            .applicants
            .insert(applicant.id, applicant);
    }

    pub async fn insert_school(&self, id: Uuid) {
        self.inner.write().await.schools.insert(id);
    }

    fn matches(filter: &ApplicationFilter, listing: &ApplicationListing) -> bool {
        let app = &listing.application;
        if app.school_id != filter.school_id {
            return false;
        }
        if let Some(status) = filter.status {
            if app.application_status != status {
                return false;
            }
        }
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            let hit = listing
                .applicant
                .as_ref()
                .map(|a| a.name.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        if let Some((start, end)) = filter.created_between {
            if app.created_at < start || app.created_at > end {
                return false;
            }
        }
        true
    }

    fn compare(field: SortField, a: &ApplicationListing, b: &ApplicationListing) -> Ordering {
        let (x, y) = (&a.application, &b.application);
        let primary = match field {
            SortField::CreatedAt => x.created_at.cmp(&y.created_at),
            SortField::UpdatedAt => x.updated_at.cmp(&y.updated_at),
            SortField::ApplicationStatus => x
                .application_status
                .label()
                .cmp(y.application_status.label()),
            SortField::PaymentStatus => x.payment.status.label().cmp(y.payment.status.label()),
            SortField::PaymentAmount => x.payment.amount.cmp(&y.payment.amount),
            SortField::InterviewStatus => x.interview.status.label().cmp(y.interview.status.label()),
            SortField::InterviewDateTime => x.interview.date_time.cmp(&y.interview.date_time),
            SortField::ApplicantName => a
                .applicant
                .as_ref()
                .map(|p| p.name.as_str())
                .cmp(&b.applicant.as_ref().map(|p| p.name.as_str())),
        };
        primary.then_with(|| x.id.cmp(&y.id))
    }

    async fn listings(&self, filter: &ApplicationFilter) -> Vec<ApplicationListing> {
        let inner = self.inner.read().await;
        inner
            .applications
            .values()
            .map(|app| ApplicationListing {
                application: app.clone(),
                applicant: inner.applicants.get(&app.applicant_id).cloned(),
            })
            .filter(|listing| Self::matches(filter, listing))
            .collect()
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn insert(&self, application: Application) -> Result<Application> {
        let mut inner = self.inner.write().await;
        if inner.applications.contains_key(&application.id) {
            return Err(Error::Conflict(format!(
                "Application {} already exists",
                application.id
            )));
        }
        inner
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.inner.read().await.applications.get(&id).cloned())
    }

    async fn save(&self, application: &Application) -> Result<Application> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .applications
            .get_mut(&application.id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        if stored.version != application.version {
            return Err(Error::Conflict(format!(
                "Application {} was modified concurrently",
                application.id
            )));
        }

        stored.application_status = application.application_status;
        stored.payment = application.payment.clone();
        stored.timeline = application.timeline.clone();
        stored.documents = application.documents.clone();
        stored.interview = application.interview.clone();
        stored.updated_at = application.updated_at;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn find(
        &self,
        filter: &ApplicationFilter,
        sort: SortSpec,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<(Vec<ApplicationListing>, i64)> {
        let mut listings = self.listings(filter).await;
        let total = listings.len() as i64;

        listings.sort_by(|a, b| {
            let ord = Self::compare(sort.field, a, b);
            match sort.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let skip = skip.max(0) as usize;
        let page: Vec<ApplicationListing> = match limit {
            Some(limit) => listings
                .into_iter()
                .skip(skip)
                .take(limit.max(0) as usize)
                .collect(),
            None => listings.into_iter().skip(skip).collect(),
        };
        Ok((page, total))
    }

    async fn find_applicant(&self, id: Uuid) -> Result<Option<ApplicantSummary>> {
        Ok(self.inner.read().await.applicants.get(&id).cloned())
    }

    async fn school_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.inner.read().await.schools.contains(&id))
    }

    async fn enqueue_notification(&self, job: NotificationJob) -> Result<QueuedNotification> {
        let queued = QueuedNotification::new(job, Utc::now());
        self.inner.write().await.jobs.push(queued.clone());
        Ok(queued)
    }

    async fn claim_notification(&self) -> Result<Option<QueuedNotification>> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let claimed = inner.jobs.iter_mut().find(|q| q.is_due(now)).map(|q| {
            q.status = JobStatus::Running;
            q.clone()
        });
        Ok(claimed)
    }

    async fn finish_notification(
        &self,
        job_id: Uuid,
        record: NotificationRecord,
        resolution: &JobResolution,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;
        let queued = inner
            .jobs
            .iter_mut()
            .find(|q| q.id == job_id)
            .ok_or_else(|| Error::NotFound("Notification job not found".into()))?;
        let application = inner
            .applications
            .get_mut(&queued.job.application_id)
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        application.notifications.push(record);
        queued.resolve(resolution);
        Ok(())
    }

    async fn release_stalled_notifications(&self) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut released = 0;
        for queued in inner.jobs.iter_mut().filter(|q| q.status == JobStatus::Running) {
            queued.status = JobStatus::Pending;
            released += 1;
        }
        Ok(released)
    }

    async fn find_notification_job(&self, id: Uuid) -> Result<Option<QueuedNotification>> {
        Ok(self
            .inner
            .read()
            .await
            .jobs
            .iter()
            .find(|q| q.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::fixtures;
    use crate::models::notification::{DeliveryStatus, EmailTemplate};

    fn job_for(app: &Application) -> NotificationJob {
        NotificationJob {
            application_id: app.id,
            applicant_id: app.applicant_id,
            template: EmailTemplate::Approved,
            params: vec![],
        }
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryApplicationStore::new();
        let app = store.insert(fixtures::application()).await.unwrap();

        let first = store.save(&app).await.unwrap();
        assert_eq!(first.version, 1);

        let err = store.save(&app).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn save_keeps_notifications_recorded_in_between() {
        let store = MemoryApplicationStore::new();
        let app = store.insert(fixtures::application()).await.unwrap();

        let queued = store.enqueue_notification(job_for(&app)).await.unwrap();
        store
            .finish_notification(
                queued.id,
                NotificationRecord::email("hi", DeliveryStatus::Sent, Utc::now()),
                &JobResolution::Sent,
            )
            .await
            .unwrap();
        let saved = store.save(&app).await.unwrap();

        assert_eq!(saved.notifications.len(), 1);
        assert_eq!(saved.version, 1);
    }

    #[tokio::test]
    async fn a_claimed_job_is_not_handed_out_twice() {
        let store = MemoryApplicationStore::new();
        let app = store.insert(fixtures::application()).await.unwrap();
        let queued = store.enqueue_notification(job_for(&app)).await.unwrap();

        let claimed = store.claim_notification().await.unwrap().unwrap();
        assert_eq!(claimed.id, queued.id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert!(store.claim_notification().await.unwrap().is_none());

        assert_eq!(store.release_stalled_notifications().await.unwrap(), 1);
        let again = store.claim_notification().await.unwrap().unwrap();
        assert_eq!(again.id, queued.id);
    }

    #[tokio::test]
    async fn finishing_an_unknown_job_is_not_found() {
        let store = MemoryApplicationStore::new();
        let err = store
            .finish_notification(
                Uuid::new_v4(),
                NotificationRecord::email("x", DeliveryStatus::Failed, Utc::now()),
                &JobResolution::GiveUp("x".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn schools_must_be_registered() {
        let known = Uuid::new_v4();
        let store = MemoryApplicationStore::with_schools([known]);
        assert!(store.school_exists(known).await.unwrap());

        let school = Uuid::new_v4();
        assert!(!store.school_exists(school).await.unwrap());
        store.insert_school(school).await;
        assert!(store.school_exists(school).await.unwrap());
    }
}
