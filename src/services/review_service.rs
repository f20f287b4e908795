use std::sync::Arc;

use uuid::Uuid;

use crate::database::{ApplicationListing, ApplicationStore};
use crate::dto::review_dto::{Pagination, ReviewPage, ReviewQuery};
use crate::error::{Error, Result};
use crate::models::actor::Actor;

/// Staff-facing queue over one school's applications.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ApplicationStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: &Actor, school_id: &str, query: ReviewQuery) -> Result<ReviewPage> {
        let school_id = parse_school_id(school_id)?;
        actor.ensure_can_review(school_id)?;

        let filter = query.filter(school_id)?;
        let sort = query.sort()?;
        let (page, limit) = query.page_window();

        let (applications, total) = self
            .store
            .find(&filter, sort, Pagination::skip(page, limit), Some(limit))
            .await?;

        tracing::debug!(%school_id, total, page, limit, "review queue listed");
        Ok(ReviewPage {
            applications,
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// Every match for the filter in queue order, ignoring pagination.
    pub async fn export_listings(
        &self,
        actor: &Actor,
        school_id: &str,
        query: ReviewQuery,
    ) -> Result<Vec<ApplicationListing>> {
        let school_id = parse_school_id(school_id)?;
        actor.ensure_can_review(school_id)?;

        let filter = query.filter(school_id)?;
        let sort = query.sort()?;
        let (listings, _) = self.store.find(&filter, sort, 0, None).await?;
        Ok(listings)
    }
}

fn parse_school_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| Error::InvalidArgument(format!("Invalid school id: {}", raw)))
}
