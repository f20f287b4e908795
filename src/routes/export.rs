use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};

use crate::{
    dto::review_dto::ReviewQuery, error::Result, models::actor::Actor,
    services::export_service::ExportService, AppState,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Same filters as the review queue, without pagination.
#[utoipa::path(
    get,
    path = "/api/schools/{school_id}/applications/export",
    params(
        ("school_id" = String, Path, description = "School ID"),
        ("status" = Option<String>, Query, description = "Pending, Approved or Rejected"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on applicant name"),
        ("startDate" = Option<String>, Query, description = "Created on or after; requires endDate"),
        ("endDate" = Option<String>, Query, description = "Created on or before; requires startDate"),
        ("sortBy" = Option<String>, Query, description = "Sort field"),
        ("sortOrder" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "XLSX workbook attachment"),
        (status = 400, description = "Malformed school id or query")
    )
)]
#[axum::debug_handler]
pub async fn export_school_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(school_id): Path<String>,
    Query(query): Query<ReviewQuery>,
) -> Result<impl IntoResponse> {
    let listings = state
        .review_service
        .export_listings(&actor, &school_id, query)
        .await?;
    let buffer = ExportService::generate_applications_xlsx(&listings)?;

    let filename = format!(
        "applications_{}.xlsx",
        chrono::Utc::now().format("%Y%m%d")
    );
    let disposition = format!("attachment; filename=\"{}\"", filename);
    tracing::info!(school_id = %school_id.trim(), rows = listings.len(), "applications exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    ))
}
