use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::application_dto::{
        BatchStatusPayload, BatchTransitionRequest, CompletePayment, CompletePaymentPayload,
        ScheduleInterviewPayload, SubmitApplication, SubmitApplicationPayload, UpdateStatusPayload,
    },
    dto::batch_dto::BatchReport,
    error::Result,
    models::actor::Actor,
    models::application::Application,
    models::timeline::TimelineEntry,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = SubmitApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Json<Application>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not an applicant")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SubmitApplicationPayload>,
) -> Result<impl IntoResponse> {
    let input = SubmitApplication::try_from(payload)?;
    let application = state.application_service.submit(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application", body = Json<Application>),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.get(&actor, id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/timeline",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Timeline entries in insertion order", body = Json<Vec<TimelineEntry>>),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_timeline(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let entries = state.timeline_service.entries(&actor, id).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = Json<Application>),
        (status = 400, description = "Invalid status"),
        (status = 402, description = "Payment not completed"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application modified concurrently")
    )
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let req = payload.into_request(id)?;
    let application = state.application_service.transition(&actor, req).await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/applications/batch-status",
    request_body = BatchStatusPayload,
    responses(
        (status = 200, description = "Every item settled; per-item outcomes in results", body = Json<BatchReport>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn batch_update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<BatchStatusPayload>,
) -> Result<impl IntoResponse> {
    let req = BatchTransitionRequest::try_from(payload)?;
    let report = state.batch_service.transition_many(&actor, req).await;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/interview",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = ScheduleInterviewPayload,
    responses(
        (status = 200, description = "Interview scheduled", body = Json<Application>),
        (status = 400, description = "Invalid date/time or missing location"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    let req = payload.into_request(id)?;
    let application = state.interview_service.schedule(&actor, req).await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = CompletePaymentPayload,
    responses(
        (status = 200, description = "Payment marked completed", body = Json<Application>),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn complete_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompletePaymentPayload>,
) -> Result<impl IntoResponse> {
    let input = CompletePayment::try_from(payload)?;
    let application = state
        .application_service
        .complete_payment(&actor, id, input)
        .await?;
    Ok(Json(application))
}
