use std::sync::Arc;

use uuid::Uuid;

use crate::database::ApplicationStore;
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::application::Application;
use crate::models::timeline::{TimelineEntry, TimelineStatus};
use crate::utils::time::now;

#[derive(Clone)]
pub struct TimelineService {
    store: Arc<dyn ApplicationStore>,
}

impl TimelineService {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    /// Pushes one entry with a server-assigned timestamp. Not idempotent: two calls give
    /// two entries.
    pub async fn append(
        &self,
        actor: &Actor,
        application_id: Uuid,
        status: TimelineStatus,
        comment: Option<String>,
    ) -> Result<Application> {
        let mut application = self.load(application_id).await?;
        actor.ensure_can_review(application.school_id)?;

        let at = now();
        application
            .timeline
            .append(status, comment, Some(actor.id), at);
        application.updated_at = at;

        let saved = self.store.save(&application).await?;
        tracing::debug!(
            application_id = %saved.id,
            status = status.label(),
            entries = saved.timeline.len(),
            "timeline entry appended"
        );
        Ok(saved)
    }

    /// Entries in insertion order.
    pub async fn entries(&self, actor: &Actor, application_id: Uuid) -> Result<Vec<TimelineEntry>> {
        let application = self.load(application_id).await?;
        actor.ensure_can_view(application.applicant_id, application.school_id)?;
        Ok(application.timeline.entries().to_vec())
    }

    async fn load(&self, id: Uuid) -> Result<Application> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryApplicationStore;
    use crate::models::actor::Role;
    use crate::models::application::fixtures;

    #[tokio::test]
    async fn repeated_appends_are_all_kept_in_order() {
        let store = Arc::new(MemoryApplicationStore::new());
        let app = store.insert(fixtures::application()).await.unwrap();
        let svc = TimelineService::new(store.clone());
        let admin = Actor::new(Uuid::new_v4(), Role::SchoolAdmin, Some(app.school_id));

        svc.append(&admin, app.id, TimelineStatus::Pending, Some("first".into()))
            .await
            .unwrap();
        svc.append(&admin, app.id, TimelineStatus::Pending, Some("first".into()))
            .await
            .unwrap();
        svc.append(&admin, app.id, TimelineStatus::Approved, None)
            .await
            .unwrap();

        let entries = svc.entries(&admin, app.id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].comment, entries[1].comment);
        assert!(entries[0].timestamp <= entries[1].timestamp);
        assert_eq!(entries[2].status, TimelineStatus::Approved);
        assert_eq!(entries[2].updated_by, Some(admin.id));
    }

    #[tokio::test]
    async fn applicant_reads_own_timeline_but_cannot_write() {
        let store = Arc::new(MemoryApplicationStore::new());
        let app = store.insert(fixtures::application()).await.unwrap();
        let svc = TimelineService::new(store);
        let owner = Actor::new(app.applicant_id, Role::Applicant, None);

        assert!(svc.entries(&owner, app.id).await.unwrap().is_empty());
        let err = svc
            .append(&owner, app.id, TimelineStatus::Approved, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
