use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::actor::Actor,
    models::application::Application,
    services::document_service::Upload,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications/{id}/documents",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 201, description = "Document attached", body = Json<Application>),
        (status = 400, description = "Missing or disallowed file"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut name = None;
    let mut kind = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await?),
            "type" => kind = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or("document.bin").to_string();
                let data = field.bytes().await?;
                upload = Some(Upload { file_name, data });
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| Error::InvalidArgument("File is required".into()))?;
    let application = state
        .document_service
        .attach(&actor, id, name, kind, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}
