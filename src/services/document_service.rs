use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use crate::database::ApplicationStore;
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::application::Application;
use crate::models::document::Document;
use crate::utils::time::now;

const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "doc", "docx", "jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    pub mime_type: String,
    pub original_name: String,
}

/// Takes an uploaded file and hands back a durable URL for it.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: Upload) -> Result<StoredMedia>;
}

/// Writes files under a local directory that is served statically.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

fn mime_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Extension allow-list plus a magic-byte check for the formats that have one.
fn check_upload(ext: &str, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidArgument("Uploaded file is empty".into()));
    }
    if !ALLOWED_EXTENSIONS.contains(&ext) {
        return Err(Error::InvalidArgument(format!(
            "File type .{} is not allowed. Allowed: {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let valid = match ext {
        "pdf" => data.starts_with(b"%PDF"),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8]),
        "png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "docx" => data.starts_with(b"PK"),
        "webp" => data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP",
        _ => true,
    };
    if !valid {
        return Err(Error::InvalidArgument(format!("Invalid .{} file content", ext)));
    }
    Ok(())
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, file: Upload) -> Result<StoredMedia> {
        let ext = extension_of(&file.file_name);
        check_upload(&ext, &file.data)?;

        let dir = self.root.join("documents");
        fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(dir.join(&stored_name), &file.data).await.map_err(|e| {
            tracing::error!(error = %e, "failed to write uploaded document");
            Error::Io(e)
        })?;

        Ok(StoredMedia {
            url: format!("{}/documents/{}", self.public_url, stored_name),
            mime_type: mime_for(&ext).to_string(),
            original_name: file.file_name,
        })
    }
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn ApplicationStore>,
    media: Arc<dyn MediaStore>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn ApplicationStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    /// Uploads the file and appends it to the application's documents. `name` defaults
    /// to the original file name and `kind` to the detected MIME type.
    pub async fn attach(
        &self,
        actor: &Actor,
        application_id: Uuid,
        name: Option<String>,
        kind: Option<String>,
        upload: Upload,
    ) -> Result<Application> {
        let mut application = self
            .store
            .find_by_id(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        actor.ensure_can_view(application.applicant_id, application.school_id)?;

        let stored = self.media.upload(upload).await?;
        let at = now();
        application.documents.push(Document {
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(stored.original_name),
            kind: kind
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(stored.mime_type),
            url: stored.url,
            uploaded_at: at,
        });
        application.updated_at = at;

        let saved = self.store.save(&application).await?;
        tracing::info!(
            application_id = %saved.id,
            documents = saved.documents.len(),
            "document attached"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryApplicationStore;
    use crate::models::actor::Role;
    use crate::models::application::fixtures;

    #[test]
    fn upload_checks() {
        assert!(check_upload("pdf", b"%PDF-1.7").is_ok());
        assert!(check_upload("pdf", b"MZ\x90\x00").is_err());
        assert!(check_upload("exe", b"MZ").is_err());
        assert!(check_upload("png", &[]).is_err());
        assert_eq!(extension_of("Report.PDF"), "pdf");
    }

    #[tokio::test]
    async fn owner_can_attach_a_document() {
        let dir = std::env::temp_dir().join(format!("admissions-docs-{}", Uuid::new_v4()));
        let store = Arc::new(MemoryApplicationStore::new());
        let app = store.insert(fixtures::application()).await.unwrap();
        let svc = DocumentService::new(
            store.clone(),
            Arc::new(LocalMediaStore::new(dir.clone(), "/uploads/")),
        );
        let owner = Actor::new(app.applicant_id, Role::Applicant, None);

        let saved = svc
            .attach(
                &owner,
                app.id,
                Some("Birth certificate".into()),
                None,
                Upload {
                    file_name: "cert.pdf".into(),
                    data: Bytes::from_static(b"%PDF-1.4 test"),
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.documents.len(), 1);
        let doc = &saved.documents[0];
        assert_eq!(doc.name, "Birth certificate");
        assert_eq!(doc.kind, "application/pdf");
        assert!(doc.url.starts_with("/uploads/documents/"));
        assert!(saved.timeline.is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }
}
