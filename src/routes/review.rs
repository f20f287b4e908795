use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::review_dto::{ReviewPage, ReviewQuery},
    error::Result,
    models::actor::Actor,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/schools/{school_id}/applications",
    params(
        ("school_id" = String, Path, description = "School ID"),
        ("status" = Option<String>, Query, description = "Pending, Approved or Rejected"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on applicant name"),
        ("startDate" = Option<String>, Query, description = "Created on or after; requires endDate"),
        ("endDate" = Option<String>, Query, description = "Created on or before; requires startDate"),
        ("page" = Option<i64>, Query, description = "1-based page number"),
        ("limit" = Option<i64>, Query, description = "Items per page"),
        ("sortBy" = Option<String>, Query, description = "Sort field"),
        ("sortOrder" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Page of applications with pagination metadata", body = Json<ReviewPage>),
        (status = 400, description = "Malformed school id or query"),
        (status = 403, description = "Caller cannot review this school")
    )
)]
#[axum::debug_handler]
pub async fn list_school_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(school_id): Path<String>,
    Query(query): Query<ReviewQuery>,
) -> Result<impl IntoResponse> {
    let page = state.review_service.list(&actor, &school_id, query).await?;
    Ok(Json(page))
}
